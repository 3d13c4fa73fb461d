//! Startup Configuration
//!
//! Read once at startup from the environment; there is no hot-reload
//! contract. The realtime transport endpoint is optional and its absence is
//! the normal, fully supported mode.

use std::env;

/// Which ledger network to talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Network {
    /// Production network
    Mainnet,
    /// Public test network
    #[default]
    Testnet,
    /// Development network
    Devnet,
    /// Local node
    Localnet,
}

impl Network {
    /// Parse from the env-var spelling. Unknown values fall back to testnet.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Network::Mainnet,
            "devnet" => Network::Devnet,
            "localnet" | "local" => Network::Localnet,
            _ => Network::Testnet,
        }
    }

    /// Default fullnode RPC endpoint for this network.
    pub fn default_rpc_url(self) -> String {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443".to_string(),
            Network::Testnet => "https://fullnode.testnet.sui.io:443".to_string(),
            Network::Devnet => "https://fullnode.devnet.sui.io:443".to_string(),
            Network::Localnet => "http://127.0.0.1:9000".to_string(),
        }
    }
}

/// Configuration surface consumed by the client core.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Target network
    pub network: Network,
    /// RPC endpoint (explicit override or the network default)
    pub rpc_url: String,
    /// Published game package id
    pub package_id: String,
    /// Module within the package emitting the domain events
    pub module: String,
    /// Optional realtime transport endpoint. `None` degrades gracefully to
    /// ledger-event-only mode.
    pub realtime_endpoint: Option<String>,
}

impl ChainConfig {
    /// Default published package id used when the environment does not
    /// override it.
    pub const DEFAULT_PACKAGE_ID: &'static str =
        "0x45ed0c095882c178f0744afd2eaa6298d9c065c8e73266ebf0df993cabe16a63";

    /// Default module name within the package.
    pub const DEFAULT_MODULE: &'static str = "game";

    /// Build from `ARENA_*` environment variables, with defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let network = env::var("ARENA_NETWORK")
            .map(|v| Network::parse(&v))
            .unwrap_or_default();
        let rpc_url = env::var("ARENA_RPC_URL").unwrap_or_else(|_| network.default_rpc_url());
        let package_id =
            env::var("ARENA_PACKAGE_ID").unwrap_or_else(|_| Self::DEFAULT_PACKAGE_ID.to_string());
        let module = env::var("ARENA_MODULE").unwrap_or_else(|_| Self::DEFAULT_MODULE.to_string());
        let realtime_endpoint = env::var("ARENA_REALTIME_URL").ok().filter(|v| !v.is_empty());

        Self {
            network,
            rpc_url,
            package_id,
            module,
            realtime_endpoint,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        let network = Network::default();
        Self {
            network,
            rpc_url: network.default_rpc_url(),
            package_id: Self::DEFAULT_PACKAGE_ID.to_string(),
            module: Self::DEFAULT_MODULE.to_string(),
            realtime_endpoint: None,
        }
    }
}
