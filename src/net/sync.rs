//! Transport Application
//!
//! Applies incoming transport frames to the store under the precedence
//! rules: only remote positions are written from this channel, and a ledger
//! write that is at least as recent always wins. Attack/join/leave frames
//! merely adjust sync tags so the UI can show "something is in flight";
//! the authoritative change arrives through the ledger event client.
//!
//! Outbound emission lives in the game loop controller, which throttles
//! position ticks to ~10 Hz as part of its frame order.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::chain::sync::RESPAWN_POINT;
use crate::core::vec3::Vec3;
use crate::net::messages::{MessageKind, NetMessage};
use crate::net::transport::{MessageSubscription, RealtimeTransport};
use crate::state::{ChatEntry, EntityState, GameStore, SyncStatus};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Wires a [`RealtimeTransport`] to the store for one session.
pub struct NetSync {
    subs: Vec<MessageSubscription>,
}

impl NetSync {
    /// Register handlers for every inbound frame kind the store cares
    /// about.
    pub fn attach(transport: Arc<RealtimeTransport>, store: Arc<GameStore>) -> Self {
        let mut subs = Vec::new();

        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::PlayerMove, move |msg| {
                apply_move_message(&store, msg, now_ms());
            }));
        }
        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::PlayerAttack, move |msg| {
                apply_attack_message(&store, msg);
            }));
        }
        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::PlayerRespawn, move |msg| {
                apply_respawn_message(&store, msg, now_ms());
            }));
        }
        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::PlayerJoin, move |msg| {
                apply_join_message(&store, msg);
            }));
        }
        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::PlayerLeave, move |msg| {
                // Membership is ledger-authoritative; only flag the entity.
                store.set_remote_sync(&msg.player_id, SyncStatus::OutOfSync);
            }));
        }
        {
            subs.push(transport.on(MessageKind::LeaderboardUpdate, move |msg| {
                // The leaderboard is ledger-authoritative; transport copies
                // are ignored.
                debug!(sender = %msg.player_id, "ignoring transport leaderboard frame");
            }));
        }
        {
            let store = Arc::clone(&store);
            subs.push(transport.on(MessageKind::ChatMessage, move |msg| {
                apply_chat_message(&store, msg);
            }));
        }

        Self { subs }
    }

    /// Unsubscribe every handler.
    pub fn shutdown(self) {
        for sub in self.subs {
            sub.unsubscribe();
        }
    }
}

fn apply_move_message(store: &GameStore, msg: &NetMessage, at_ms: i64) {
    let Some(payload) = msg.move_payload() else {
        debug!("dropping malformed move frame");
        return;
    };
    let position = Vec3::new(payload.x, payload.y, payload.z);
    if !store.apply_remote_position(&payload.player_id, position, at_ms) {
        debug!(
            player_id = %payload.player_id,
            "transport position superseded or entity unknown"
        );
    }
}

fn apply_attack_message(store: &GameStore, msg: &NetMessage) {
    let Some(payload) = msg.attack_payload() else {
        return;
    };
    // Health is ledger-authoritative; just show the target as in flux until
    // the confirmed attack event lands.
    store.set_remote_sync(&payload.target_id, SyncStatus::Syncing);
}

fn apply_respawn_message(store: &GameStore, msg: &NetMessage, at_ms: i64) {
    let Some(payload) = msg.respawn_payload() else {
        return;
    };
    // Position is the transport's to move; health and the alive flag wait
    // for the ledger.
    store.apply_remote_position(&payload.player_id, RESPAWN_POINT, at_ms);
    store.set_remote_sync(&payload.player_id, SyncStatus::Syncing);
}

fn apply_join_message(store: &GameStore, msg: &NetMessage) {
    let id = msg.player_id.clone();
    if store.local().is_some_and(|l| l.id == id) || store.remote(&id).is_some() {
        return;
    }
    let name = msg
        .data
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let address = msg
        .data
        .get("address")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    // Placeholder until the ledger confirms the membership change.
    let mut entity = EntityState::new(id, address, name, Vec3::ZERO);
    entity.sync = SyncStatus::Syncing;
    store.upsert_remote(entity);
}

fn apply_chat_message(store: &GameStore, msg: &NetMessage) {
    let Some(payload) = msg.chat_payload() else {
        return;
    };
    store.push_chat(ChatEntry {
        sender: msg.player_id.clone(),
        text: payload.message,
        timestamp_ms: msg.timestamp,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_remote(id: &str) -> GameStore {
        let store = GameStore::new();
        store.upsert_remote(EntityState::new(id, format!("0x{id}"), "R", Vec3::ZERO));
        store
    }

    #[test]
    fn test_move_frame_updates_remote_position() {
        let store = store_with_remote("r1");
        let msg = NetMessage::move_tick("r1", "g1", 5, 3.0, 0.4, -1.0);

        apply_move_message(&store, &msg, 1_000);

        assert_eq!(store.remote("r1").unwrap().position, Vec3::new(3.0, 0.4, -1.0));
    }

    #[test]
    fn test_move_frame_loses_to_recent_ledger_write() {
        let store = store_with_remote("r1");
        store.note_ledger_write("r1", 1_000);

        let msg = NetMessage::move_tick("r1", "g1", 5, 3.0, 0.4, -1.0);
        apply_move_message(&store, &msg, 1_000);

        assert_eq!(store.remote("r1").unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_attack_frame_never_touches_health() {
        let store = store_with_remote("r1");
        let msg = NetMessage::attack("me", "r1", "g1", 5, 50);

        apply_attack_message(&store, &msg);

        let target = store.remote("r1").unwrap();
        assert_eq!(target.health, EntityState::MAX_HEALTH);
        assert_eq!(target.sync, SyncStatus::Syncing);
    }

    #[test]
    fn test_respawn_frame_moves_but_does_not_revive() {
        let store = GameStore::new();
        let mut dead = EntityState::new("r1", "0xr1", "R", Vec3::new(1.0, 0.4, 1.0));
        dead.health = 0;
        dead.alive = false;
        store.upsert_remote(dead);

        let msg = NetMessage::respawn("r1", "g1", 5);
        apply_respawn_message(&store, &msg, 1_000);

        let entity = store.remote("r1").unwrap();
        assert_eq!(entity.position, RESPAWN_POINT);
        // The ledger event revives; the transport only previews movement.
        assert!(!entity.alive);
    }

    #[test]
    fn test_join_frame_creates_placeholder_once() {
        let store = GameStore::new();
        let mut msg = NetMessage::move_tick("r9", "g1", 5, 0.0, 0.0, 0.0);
        msg.kind = MessageKind::PlayerJoin;
        msg.data = serde_json::json!({ "username": "Newcomer", "address": "0xnew" });

        apply_join_message(&store, &msg);
        apply_join_message(&store, &msg);

        let remotes = store.remotes();
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].name, "Newcomer");
        assert_eq!(remotes[0].sync, SyncStatus::Syncing);
    }

    #[test]
    fn test_chat_frame_appends() {
        let store = GameStore::new();
        let msg = NetMessage::chat("r1", "g1", 42, "gg");

        apply_chat_message(&store, &msg);

        let chat = store.chat();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].sender, "r1");
        assert_eq!(chat[0].text, "gg");
        assert_eq!(chat[0].timestamp_ms, 42);
    }
}
