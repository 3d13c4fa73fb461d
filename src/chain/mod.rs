//! Ledger Integration
//!
//! Everything that talks to the chain: configuration, the JSON-RPC read and
//! write primitives, domain-event decoding, the polling event stream, event
//! application into the store, and the query/submission service.
//!
//! The event stream is the system's only guaranteed-delivery channel. It is
//! at-least-once: duplicates across polls are possible and are absorbed by
//! the store's idempotent application, never suppressed here.

pub mod config;
pub mod events;
pub mod rpc;
pub mod service;
pub mod stream;
pub mod sync;

pub use config::{ChainConfig, Network};
pub use events::{ArenaEvent, EventKind, EventPayload};
pub use rpc::{ChainError, JsonRpcLedger, LedgerReader, LedgerWriter, MoveCall, NullWriter, TxStatus};
pub use service::ArenaService;
pub use stream::{LedgerEventStream, Subscription};
pub use sync::ChainSync;
