//! Best-Effort Realtime Transport
//!
//! Optional low-latency WebSocket channel carrying ephemeral state between
//! clients: position ticks, attack/respawn notifications, chat. Everything
//! here is opportunistic; the reconciliation store stays correct with this
//! module permanently disconnected, and no failure in it is ever fatal.

pub mod messages;
pub mod sync;
pub mod transport;

pub use messages::{MessageKind, NetMessage};
pub use sync::NetSync;
pub use transport::{LinkState, RealtimeTransport};
