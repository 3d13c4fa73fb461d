//! Domain Events
//!
//! Closed enumeration of the events the game module emits, with a decode
//! step that fails closed: anything that does not match the expected schema
//! is dropped (and logged) rather than propagated as loose JSON.

use serde_json::Value;
use tracing::warn;

use crate::chain::rpc::RawEvent;
use crate::state::LeaderboardEntry;

/// Event kind, derived from the suffix of the on-chain event type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A session was created
    SessionCreated,
    /// A participant joined a session
    PlayerJoined,
    /// A participant recorded a movement
    PlayerMoved,
    /// A participant attacked another
    PlayerAttacked,
    /// A participant respawned
    PlayerRespawned,
    /// A participant died
    PlayerDied,
    /// The session leaderboard changed
    LeaderboardUpdated,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 7] = [
        EventKind::SessionCreated,
        EventKind::PlayerJoined,
        EventKind::PlayerMoved,
        EventKind::PlayerAttacked,
        EventKind::PlayerRespawned,
        EventKind::PlayerDied,
        EventKind::LeaderboardUpdated,
    ];

    /// Map an on-chain event type name (the segment after the last `::`) to
    /// a kind. Unknown names are not an error; they are simply not ours.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "GameCreated" => Some(EventKind::SessionCreated),
            "PlayerJoined" => Some(EventKind::PlayerJoined),
            "PlayerMoved" => Some(EventKind::PlayerMoved),
            "PlayerAttacked" => Some(EventKind::PlayerAttacked),
            "PlayerRespawned" => Some(EventKind::PlayerRespawned),
            "PlayerDied" => Some(EventKind::PlayerDied),
            "LeaderboardUpdated" => Some(EventKind::LeaderboardUpdated),
            _ => None,
        }
    }

    /// Stable name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionCreated => "session-created",
            EventKind::PlayerJoined => "player-joined",
            EventKind::PlayerMoved => "player-moved",
            EventKind::PlayerAttacked => "player-attacked",
            EventKind::PlayerRespawned => "player-respawned",
            EventKind::PlayerDied => "player-died",
            EventKind::LeaderboardUpdated => "leaderboard-updated",
        }
    }
}

/// Typed payload per event kind.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    /// A session came into existence
    SessionCreated {
        /// Session object id
        session_id: String,
        /// Display name
        name: String,
        /// Creating account
        creator: String,
        /// Participant ceiling
        max_players: u32,
    },
    /// A participant joined
    PlayerJoined {
        /// Session object id
        session_id: String,
        /// Player object id
        player_id: String,
        /// Owning account
        address: String,
        /// Display name
        name: String,
        /// Spawn X
        x: f32,
        /// Spawn Y
        y: f32,
        /// Spawn Z
        z: f32,
    },
    /// A participant moved
    PlayerMoved {
        /// Session object id
        session_id: String,
        /// Player object id
        player_id: String,
        /// New X
        x: f32,
        /// New Y
        y: f32,
        /// New Z
        z: f32,
    },
    /// A participant attacked another
    PlayerAttacked {
        /// Session object id
        session_id: String,
        /// Attacking player object id
        attacker_id: String,
        /// Target player object id
        target_id: String,
        /// Damage dealt
        damage: u32,
    },
    /// A participant respawned
    PlayerRespawned {
        /// Session object id
        session_id: String,
        /// Player object id
        player_id: String,
    },
    /// A participant died
    PlayerDied {
        /// Session object id
        session_id: String,
        /// Player object id
        player_id: String,
        /// Killing player object id, when credited
        killer_id: Option<String>,
    },
    /// The leaderboard changed
    LeaderboardUpdated {
        /// Session object id
        session_id: String,
        /// Full replacement board, highest score first
        entries: Vec<LeaderboardEntry>,
    },
}

impl EventPayload {
    /// The session this payload belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            EventPayload::SessionCreated { session_id, .. }
            | EventPayload::PlayerJoined { session_id, .. }
            | EventPayload::PlayerMoved { session_id, .. }
            | EventPayload::PlayerAttacked { session_id, .. }
            | EventPayload::PlayerRespawned { session_id, .. }
            | EventPayload::PlayerDied { session_id, .. }
            | EventPayload::LeaderboardUpdated { session_id, .. } => session_id,
        }
    }
}

/// One decoded domain event.
#[derive(Clone, Debug, PartialEq)]
pub struct ArenaEvent {
    /// Unique id: `{digest}_{sequence}`
    pub event_id: String,
    /// Emitting transaction digest
    pub digest: String,
    /// Event kind
    pub kind: EventKind,
    /// Typed payload
    pub payload: EventPayload,
    /// Emission timestamp (unix ms; 0 when the ledger omitted it)
    pub timestamp_ms: i64,
}

/// Decode a raw ledger event. Returns `None` (after logging) on any schema
/// mismatch so one bad event never disturbs the polling loop or the cursor.
pub fn decode(raw: &RawEvent) -> Option<ArenaEvent> {
    let type_name = raw.event_type.rsplit("::").next().unwrap_or_default();
    let kind = EventKind::from_type_name(type_name)?;

    let payload = match decode_payload(kind, &raw.parsed_json) {
        Some(payload) => payload,
        None => {
            warn!(
                event_type = %raw.event_type,
                digest = %raw.id.tx_digest,
                "dropping event with unrecognized payload shape"
            );
            return None;
        }
    };

    Some(ArenaEvent {
        event_id: format!("{}_{}", raw.id.tx_digest, raw.id.event_seq),
        digest: raw.id.tx_digest.clone(),
        kind,
        payload,
        timestamp_ms: raw
            .timestamp_ms
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0),
    })
}

fn decode_payload(kind: EventKind, json: &Value) -> Option<EventPayload> {
    match kind {
        EventKind::SessionCreated => Some(EventPayload::SessionCreated {
            session_id: field_str(json, "game_id")?,
            name: field_text(json, "name").unwrap_or_default(),
            creator: field_str(json, "creator")?,
            max_players: field_u64(json, "max_players")? as u32,
        }),
        EventKind::PlayerJoined => Some(EventPayload::PlayerJoined {
            session_id: field_str(json, "game_id")?,
            player_id: field_str(json, "player_id")?,
            address: field_str(json, "player_address")?,
            name: field_text(json, "username").unwrap_or_default(),
            x: field_f32(json, "x").unwrap_or(0.0),
            y: field_f32(json, "y").unwrap_or(0.0),
            z: field_f32(json, "z").unwrap_or(0.0),
        }),
        EventKind::PlayerMoved => Some(EventPayload::PlayerMoved {
            session_id: field_str(json, "game_id")?,
            player_id: field_str(json, "player_id")?,
            x: field_f32(json, "x")?,
            y: field_f32(json, "y")?,
            z: field_f32(json, "z")?,
        }),
        EventKind::PlayerAttacked => Some(EventPayload::PlayerAttacked {
            session_id: field_str(json, "game_id")?,
            attacker_id: field_str(json, "attacker_id")?,
            target_id: field_str(json, "target_id")?,
            damage: field_u64(json, "damage")? as u32,
        }),
        EventKind::PlayerRespawned => Some(EventPayload::PlayerRespawned {
            session_id: field_str(json, "game_id")?,
            player_id: field_str(json, "player_id")?,
        }),
        EventKind::PlayerDied => Some(EventPayload::PlayerDied {
            session_id: field_str(json, "game_id")?,
            player_id: field_str(json, "player_id")?,
            killer_id: field_str(json, "killer_id"),
        }),
        EventKind::LeaderboardUpdated => {
            let entries = json
                .get("entries")?
                .as_array()?
                .iter()
                .filter_map(|entry| {
                    Some(LeaderboardEntry {
                        address: field_str(entry, "address")?,
                        score: field_u64(entry, "score")?,
                    })
                })
                .collect();
            Some(EventPayload::LeaderboardUpdated {
                session_id: field_str(json, "game_id")?,
                entries,
            })
        }
    }
}

pub(crate) fn field_str(json: &Value, key: &str) -> Option<String> {
    json.get(key)?.as_str().map(str::to_string)
}

/// Numbers wider than 53 bits arrive as strings; accept either spelling.
pub(crate) fn field_u64(json: &Value, key: &str) -> Option<u64> {
    let value = json.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

pub(crate) fn field_f32(json: &Value, key: &str) -> Option<f32> {
    let value = json.get(key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .map(|v| v as f32)
}

pub(crate) fn field_bool(json: &Value, key: &str) -> Option<bool> {
    json.get(key)?.as_bool()
}

/// Decode a text field that may arrive either as a plain string or as a
/// byte array (Move `vector<u8>`).
pub(crate) fn field_text(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(bytes) => {
            let bytes: Vec<u8> = bytes
                .iter()
                .filter_map(|b| b.as_u64().map(|b| b as u8))
                .collect();
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => None,
    }
}
