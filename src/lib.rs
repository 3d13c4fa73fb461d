//! # Chain Arena Client Core
//!
//! Headless client core for a multiplayer arena game whose authoritative
//! state lives on a public ledger. The crate reconciles three independent
//! sources of truth into one render-ready world state:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    CHAIN ARENA CLIENT                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/           - Math primitives                            │
//! │  └── vec3.rs     - 3D vector used by prediction physics       │
//! │                                                               │
//! │  game/           - Local simulation (prediction)              │
//! │  ├── physics.rs  - Kinematic integration + pair collisions    │
//! │  ├── input.rs    - Keyboard/pointer intent sampling           │
//! │  ├── combat.rs   - Attack range / damage / knockback rules    │
//! │  ├── bots.rs     - Fill-in AI opponents                       │
//! │  └── controller.rs - Per-frame orchestration                  │
//! │                                                               │
//! │  state/          - Reconciliation store (single render truth) │
//! │                                                               │
//! │  chain/          - Ledger event client (guaranteed channel)   │
//! │  ├── rpc.rs      - Read/write primitives (JSON-RPC)           │
//! │  ├── events.rs   - Closed domain-event enumeration            │
//! │  ├── stream.rs   - Cursor-based poll + fan-out                │
//! │  ├── sync.rs     - Event application + intent lifecycle       │
//! │  └── service.rs  - Queries and intent submission              │
//! │                                                               │
//! │  net/            - Best-effort realtime transport (optional)  │
//! │  ├── transport.rs- WebSocket link with bounded reconnect      │
//! │  └── sync.rs     - Transport application + position ticks     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Source-of-truth precedence
//!
//! Local prediction owns the local entity's kinematics. Ledger events are
//! authoritative for every field they carry (health, score, kill/death
//! counters, alive flag, membership, leaderboard) and are applied
//! idempotently. The realtime transport may only move remote entities, and
//! any ledger write to the same entity supersedes it. The transport can be
//! absent entirely; the system stays correct on ledger events alone.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod chain;
pub mod core;
pub mod game;
pub mod net;
pub mod perf;
pub mod state;

// Re-export commonly used types
pub use crate::core::vec3::Vec3;
pub use chain::events::{ArenaEvent, EventKind, EventPayload};
pub use chain::stream::LedgerEventStream;
pub use game::controller::GameController;
pub use net::transport::RealtimeTransport;
pub use state::{EntityState, GameStore, SyncStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target simulation frame rate (Hz)
pub const FRAME_RATE: u32 = 60;
