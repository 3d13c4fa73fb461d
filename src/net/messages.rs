//! Wire Messages
//!
//! JSON text frames exchanged over the realtime transport. The kind tag is a
//! closed set; payloads are typed on construction and on read, with loose
//! JSON only on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Closed set of transport message kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// A player joined the session
    PlayerJoin,
    /// A player left the session
    PlayerLeave,
    /// Position tick
    PlayerMove,
    /// Attack notification
    PlayerAttack,
    /// Respawn notification
    PlayerRespawn,
    /// Stats changed
    PlayerStatsUpdate,
    /// Generic session update
    GameUpdate,
    /// Chat line
    ChatMessage,
    /// Leaderboard broadcast
    LeaderboardUpdate,
    /// Initial sync request sent on connect
    SyncRequest,
    /// Server reply to a sync request
    SyncResponse,
}

/// One transport frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetMessage {
    /// Message kind
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Sending entity id
    pub player_id: String,
    /// Session id
    pub game_id: String,
    /// Send instant (unix ms)
    pub timestamp: i64,
    /// Kind-specific payload
    #[serde(default)]
    pub data: Value,
}

/// Position tick payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    /// Moving entity id
    pub player_id: String,
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Z
    pub z: f32,
}

/// Attack notification payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPayload {
    /// Attacking entity id
    pub attacker_id: String,
    /// Target entity id
    pub target_id: String,
    /// Damage claimed
    pub damage: u32,
}

/// Respawn notification payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespawnPayload {
    /// Respawning entity id
    pub player_id: String,
}

/// Chat payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Message text
    pub message: String,
}

impl NetMessage {
    fn new(kind: MessageKind, player_id: &str, game_id: &str, timestamp: i64, data: Value) -> Self {
        Self {
            kind,
            player_id: player_id.to_string(),
            game_id: game_id.to_string(),
            timestamp,
            data,
        }
    }

    /// Build a position tick.
    pub fn move_tick(player_id: &str, game_id: &str, timestamp: i64, x: f32, y: f32, z: f32) -> Self {
        Self::new(
            MessageKind::PlayerMove,
            player_id,
            game_id,
            timestamp,
            json!({ "playerId": player_id, "x": x, "y": y, "z": z }),
        )
    }

    /// Build an attack notification.
    pub fn attack(
        attacker_id: &str,
        target_id: &str,
        game_id: &str,
        timestamp: i64,
        damage: u32,
    ) -> Self {
        Self::new(
            MessageKind::PlayerAttack,
            attacker_id,
            game_id,
            timestamp,
            json!({ "attackerId": attacker_id, "targetId": target_id, "damage": damage }),
        )
    }

    /// Build a respawn notification.
    pub fn respawn(player_id: &str, game_id: &str, timestamp: i64) -> Self {
        Self::new(
            MessageKind::PlayerRespawn,
            player_id,
            game_id,
            timestamp,
            json!({ "playerId": player_id }),
        )
    }

    /// Build a chat line.
    pub fn chat(player_id: &str, game_id: &str, timestamp: i64, message: &str) -> Self {
        Self::new(
            MessageKind::ChatMessage,
            player_id,
            game_id,
            timestamp,
            json!({ "message": message }),
        )
    }

    /// Build the initial sync request sent right after connecting.
    pub fn sync_request(player_id: &str, game_id: &str, timestamp: i64) -> Self {
        Self::new(
            MessageKind::SyncRequest,
            player_id,
            game_id,
            timestamp,
            json!({ "action": "join" }),
        )
    }

    /// Typed view of a position tick payload.
    pub fn move_payload(&self) -> Option<MovePayload> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Typed view of an attack payload.
    pub fn attack_payload(&self) -> Option<AttackPayload> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Typed view of a respawn payload.
    pub fn respawn_payload(&self) -> Option<RespawnPayload> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Typed view of a chat payload.
    pub fn chat_payload(&self) -> Option<ChatPayload> {
        serde_json::from_value(self.data.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = NetMessage::move_tick("p1", "g1", 1_700, 1.0, 0.4, 2.0);
        let text = serde_json::to_string(&msg).unwrap();

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "player-move");
        assert_eq!(value["playerId"], "p1");
        assert_eq!(value["gameId"], "g1");
        assert_eq!(value["data"]["x"], 1.0);

        let back: NetMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind, MessageKind::PlayerMove);
        assert_eq!(back.move_payload().unwrap().player_id, "p1");
    }

    #[test]
    fn test_attack_payload_round_trip() {
        let msg = NetMessage::attack("a1", "t1", "g1", 1_700, 25);
        let payload = msg.attack_payload().unwrap();
        assert_eq!(payload.target_id, "t1");
        assert_eq!(payload.damage, 25);
    }

    #[test]
    fn test_payload_mismatch_is_none() {
        let msg = NetMessage::chat("p1", "g1", 1_700, "hello");
        assert!(msg.move_payload().is_none());
        assert_eq!(msg.chat_payload().unwrap().message, "hello");
    }
}
