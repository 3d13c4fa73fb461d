//! Reconciliation Store
//!
//! The single mutable container read by rendering and written by the three
//! upstream sources: local prediction, the ledger event client, and the
//! best-effort realtime transport. All writes go through methods on
//! [`GameStore`] so precedence and idempotency live in one place:
//!
//! - local prediction touches only the local entity's kinematic fields;
//! - ledger events are authoritative for every field they carry and are
//!   deduplicated by event id, so re-delivery is a no-op;
//! - transport writes may only move remote entities, and are discarded when
//!   a ledger write to the same entity is at least as recent.
//!
//! Readers take [`GameStore::snapshot`]; writes are atomic with respect to
//! readers via the inner lock, so no torn state is observable.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3;

/// Ledger object id of an entity (hex string).
pub type EntityId = String;

/// How many distinct ledger event ids the duplicate filter remembers.
const SEEN_EVENT_CAPACITY: usize = 1024;

/// How many chat lines are retained.
const CHAT_CAPACITY: usize = 100;

/// Per-entity synchronization state shown next to the entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Ledger-confirmed state
    Synced,
    /// A write affecting this entity is awaiting confirmation
    Syncing,
    /// Confirmation was missed or timed out
    OutOfSync,
}

/// Overall ledger link health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    /// Events are flowing
    Connected,
    /// Catching up after a gap
    Syncing,
    /// No confirmed events recently
    #[default]
    Disconnected,
}

/// One participant in the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Ledger object id
    pub id: EntityId,
    /// Owning account address
    pub address: String,
    /// Display name
    pub name: String,
    /// World position
    pub position: Vec3,
    /// Health, 0..=100
    pub health: u32,
    /// Cumulative score
    pub score: u64,
    /// Kill count
    pub kills: u32,
    /// Death count
    pub deaths: u32,
    /// Whether the entity is alive
    pub alive: bool,
    /// Synchronization tag
    pub sync: SyncStatus,
}

impl EntityState {
    /// Health ceiling.
    pub const MAX_HEALTH: u32 = 100;

    /// Create a full-health entity at `position`.
    pub fn new(
        id: impl Into<EntityId>,
        address: impl Into<String>,
        name: impl Into<String>,
        position: Vec3,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            name: name.into(),
            position,
            health: Self::MAX_HEALTH,
            score: 0,
            kills: 0,
            deaths: 0,
            alive: true,
            sync: SyncStatus::Synced,
        }
    }

    /// Subtract damage, clamping at zero. Health reaching zero flips the
    /// alive flag.
    pub fn apply_damage(&mut self, damage: u32) {
        self.health = self.health.saturating_sub(damage);
        if self.health == 0 {
            self.alive = false;
        }
    }

    /// Add health, clamped to [`Self::MAX_HEALTH`].
    pub fn heal(&mut self, amount: u32) {
        self.health = (self.health + amount).min(Self::MAX_HEALTH);
    }

    /// Reset to full health at a spawn point.
    pub fn respawn_at(&mut self, position: Vec3) {
        self.health = Self::MAX_HEALTH;
        self.alive = true;
        self.position = position;
    }
}

/// The arena session as recorded on the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Ledger object id
    pub id: String,
    /// Display name
    pub name: String,
    /// Creating account
    pub creator: String,
    /// Whether the session accepts play
    pub active: bool,
    /// Current participant count
    pub player_count: u32,
    /// Participant ceiling
    pub max_players: u32,
    /// Creation timestamp (ms)
    pub created_at_ms: i64,
}

/// Kind tag of a submitted-but-unconfirmed ledger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    /// Join the session
    Join,
    /// Record a movement
    Move,
    /// Record an attack
    Attack,
    /// Respawn after death
    Respawn,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Join => "join",
            IntentKind::Move => "move",
            IntentKind::Attack => "attack",
            IntentKind::Respawn => "respawn",
        };
        f.write_str(s)
    }
}

/// A submitted ledger write awaiting confirmation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingIntent {
    /// Transaction digest returned by submission
    pub digest: String,
    /// What was submitted
    pub kind: IntentKind,
    /// Submission instant (unix ms)
    pub issued_at_ms: i64,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Account address
    pub address: String,
    /// Score
    pub score: u64,
}

/// One chat line relayed over the realtime transport.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatEntry {
    /// Sending entity id
    pub sender: EntityId,
    /// Message text
    pub text: String,
    /// Send timestamp (unix ms)
    pub timestamp_ms: i64,
}

/// Read-only copy of the world handed to rendering consumers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSnapshot {
    /// Current session, if joined
    pub session: Option<SessionState>,
    /// The locally controlled entity
    pub local: Option<EntityState>,
    /// All remote entities, ordered by id
    pub remotes: Vec<EntityState>,
    /// Current leaderboard
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Outstanding pending intents
    pub pending: Vec<PendingIntent>,
    /// Ledger link health
    pub link: LinkStatus,
    /// Instant of the last confirmed ledger write (unix ms)
    pub last_sync_ms: i64,
}

/// Bounded set of already-applied ledger event ids.
#[derive(Default)]
struct SeenEvents {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenEvents {
    /// Returns true when the id was not seen before.
    fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string());
        self.order.push_back(id.to_string());
        while self.order.len() > SEEN_EVENT_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

#[derive(Default)]
struct StoreInner {
    session: Option<SessionState>,
    local: Option<EntityState>,
    remotes: BTreeMap<EntityId, EntityState>,
    leaderboard: Vec<LeaderboardEntry>,
    pending: Vec<PendingIntent>,
    link: LinkStatus,
    last_sync_ms: i64,
    seen: SeenEvents,
    ledger_touch: HashMap<EntityId, i64>,
    errors: Vec<String>,
    chat: VecDeque<ChatEntry>,
}

impl StoreInner {
    /// Mutable access to whichever entity carries `id`, local or remote.
    fn entity_mut(&mut self, id: &str) -> Option<&mut EntityState> {
        if self.local.as_ref().is_some_and(|l| l.id == id) {
            return self.local.as_mut();
        }
        self.remotes.get_mut(id)
    }
}

/// The reconciliation store. Cheap to share (`Arc<GameStore>`); every method
/// takes `&self`.
#[derive(Default)]
pub struct GameStore {
    inner: RwLock<StoreInner>,
}

impl GameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Install the active session.
    pub fn set_session(&self, session: SessionState) {
        self.write().session = Some(session);
    }

    /// Current session, if any.
    pub fn session(&self) -> Option<SessionState> {
        self.read().session.clone()
    }

    /// Record a confirmed join. The participant count never exceeds the
    /// session's ceiling.
    pub fn session_player_joined(&self) {
        let mut inner = self.write();
        if let Some(session) = inner.session.as_mut() {
            session.player_count = (session.player_count + 1).min(session.max_players);
        }
    }

    /// Record a confirmed leave.
    pub fn session_player_left(&self) {
        let mut inner = self.write();
        if let Some(session) = inner.session.as_mut() {
            session.player_count = session.player_count.saturating_sub(1);
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Install the locally controlled entity. Any remote entity with the
    /// same id is dropped so ids stay unique.
    pub fn set_local(&self, entity: EntityState) {
        let mut inner = self.write();
        inner.remotes.remove(&entity.id);
        inner.local = Some(entity);
    }

    /// The locally controlled entity, if any.
    pub fn local(&self) -> Option<EntityState> {
        self.read().local.clone()
    }

    /// Insert or replace a remote entity. Writing the local entity's id
    /// through this path is refused; ids are unique across the store.
    pub fn upsert_remote(&self, entity: EntityState) {
        let mut inner = self.write();
        if inner.local.as_ref().is_some_and(|l| l.id == entity.id) {
            return;
        }
        inner.remotes.insert(entity.id.clone(), entity);
    }

    /// Remove a remote entity. Unknown ids are a no-op.
    pub fn remove_remote(&self, id: &str) {
        self.write().remotes.remove(id);
    }

    /// Look up a remote entity.
    pub fn remote(&self, id: &str) -> Option<EntityState> {
        self.read().remotes.get(id).cloned()
    }

    /// All remote entities in id order.
    pub fn remotes(&self) -> Vec<EntityState> {
        self.read().remotes.values().cloned().collect()
    }

    /// Update a remote entity's sync tag.
    pub fn set_remote_sync(&self, id: &str, sync: SyncStatus) {
        if let Some(entity) = self.write().remotes.get_mut(id) {
            entity.sync = sync;
        }
    }

    /// Update the local entity's sync tag.
    pub fn set_local_sync(&self, sync: SyncStatus) {
        if let Some(local) = self.write().local.as_mut() {
            local.sync = sync;
        }
    }

    // =========================================================================
    // Write path: local prediction
    // =========================================================================

    /// Push the predicted local position. Only the local entity's kinematic
    /// fields are touched.
    pub fn push_prediction(&self, position: Vec3) {
        if let Some(local) = self.write().local.as_mut() {
            local.position = position;
        }
    }

    /// Apply locally computed damage to the local entity.
    pub fn damage_local(&self, damage: u32) -> Option<(u32, bool)> {
        let mut inner = self.write();
        let local = inner.local.as_mut()?;
        local.apply_damage(damage);
        Some((local.health, local.alive))
    }

    /// Heal the local entity, clamped to full health.
    pub fn heal_local(&self, amount: u32) -> Option<u32> {
        let mut inner = self.write();
        let local = inner.local.as_mut()?;
        local.heal(amount);
        Some(local.health)
    }

    /// Apply locally computed damage to a remote entity.
    pub fn damage_remote(&self, id: &str, damage: u32) -> Option<(u32, bool)> {
        let mut inner = self.write();
        let entity = inner.remotes.get_mut(id)?;
        entity.apply_damage(damage);
        Some((entity.health, entity.alive))
    }

    // =========================================================================
    // Write path: ledger events
    // =========================================================================

    /// Ledger-confirmed position for a remote entity. The local entity is
    /// never moved this way (prediction owns its kinematics).
    pub fn move_remote(&self, id: &str, position: Vec3) -> bool {
        let mut inner = self.write();
        match inner.remotes.get_mut(id) {
            Some(entity) => {
                entity.position = position;
                entity.sync = SyncStatus::Synced;
                true
            }
            None => false,
        }
    }

    /// Ledger-confirmed death: zero health, clear alive, count the death.
    pub fn mark_dead(&self, id: &str) -> bool {
        let mut inner = self.write();
        match inner.entity_mut(id) {
            Some(entity) => {
                entity.health = 0;
                entity.alive = false;
                entity.deaths += 1;
                entity.sync = SyncStatus::Synced;
                true
            }
            None => false,
        }
    }

    /// Ledger-confirmed kill credit.
    pub fn credit_kill(&self, id: &str) -> bool {
        let mut inner = self.write();
        match inner.entity_mut(id) {
            Some(entity) => {
                entity.kills += 1;
                true
            }
            None => false,
        }
    }

    /// Ledger-confirmed respawn at a spawn point.
    pub fn respawn_entity(&self, id: &str, position: Vec3) -> bool {
        let mut inner = self.write();
        match inner.entity_mut(id) {
            Some(entity) => {
                entity.respawn_at(position);
                entity.sync = SyncStatus::Synced;
                true
            }
            None => false,
        }
    }

    /// Ledger-confirmed damage applied to whichever entity carries `id`.
    pub fn damage_entity(&self, id: &str, damage: u32) -> bool {
        let mut inner = self.write();
        match inner.entity_mut(id) {
            Some(entity) => {
                entity.apply_damage(damage);
                entity.sync = SyncStatus::Synced;
                true
            }
            None => false,
        }
    }

    /// Copy ledger-confirmed scores onto matching entities (by address).
    pub fn apply_scores(&self, entries: &[LeaderboardEntry]) {
        let mut inner = self.write();
        for entry in entries {
            if let Some(local) = inner.local.as_mut() {
                if local.address == entry.address {
                    local.score = entry.score;
                }
            }
            for entity in inner.remotes.values_mut() {
                if entity.address == entry.address {
                    entity.score = entry.score;
                }
            }
        }
    }

    /// Record a ledger event id. Returns true the first time an id is seen;
    /// callers must skip application entirely on false so re-delivery leaves
    /// the store unchanged.
    pub fn register_event(&self, event_id: &str) -> bool {
        self.write().seen.insert(event_id)
    }

    /// Note that a ledger write touched an entity at `at_ms`. Transport
    /// writes not newer than this instant are discarded.
    pub fn note_ledger_write(&self, id: &str, at_ms: i64) {
        let mut inner = self.write();
        let touch = inner.ledger_touch.entry(id.to_string()).or_insert(at_ms);
        *touch = (*touch).max(at_ms);
        inner.last_sync_ms = inner.last_sync_ms.max(at_ms);
        inner.link = LinkStatus::Connected;
    }

    /// Instant of the last ledger write to an entity, if any.
    pub fn ledger_write_at(&self, id: &str) -> Option<i64> {
        self.read().ledger_touch.get(id).copied()
    }

    // =========================================================================
    // Write path: realtime transport
    // =========================================================================

    /// Apply a transport position tick to a remote entity. Returns false
    /// when the entity is unknown, or when a ledger write to the same entity
    /// is at least as recent (the ledger wins ties).
    pub fn apply_remote_position(&self, id: &str, position: Vec3, at_ms: i64) -> bool {
        let mut inner = self.write();
        if inner.ledger_touch.get(id).is_some_and(|t| at_ms <= *t) {
            return false;
        }
        match inner.remotes.get_mut(id) {
            Some(entity) => {
                entity.position = position;
                entity.sync = SyncStatus::Synced;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Leaderboard
    // =========================================================================

    /// Replace the leaderboard.
    pub fn set_leaderboard(&self, entries: Vec<LeaderboardEntry>) {
        self.write().leaderboard = entries;
    }

    /// Current leaderboard.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.read().leaderboard.clone()
    }

    // =========================================================================
    // Pending intents
    // =========================================================================

    /// Track a submitted write. A digest already present is not duplicated.
    pub fn add_pending(&self, digest: impl Into<String>, kind: IntentKind, issued_at_ms: i64) {
        let digest = digest.into();
        let mut inner = self.write();
        if inner.pending.iter().any(|p| p.digest == digest) {
            return;
        }
        inner.pending.push(PendingIntent {
            digest,
            kind,
            issued_at_ms,
        });
    }

    /// Remove a pending intent. Removing an absent digest is a no-op;
    /// returns whether anything was removed.
    pub fn remove_pending(&self, digest: &str) -> bool {
        let mut inner = self.write();
        let before = inner.pending.len();
        inner.pending.retain(|p| p.digest != digest);
        inner.pending.len() != before
    }

    /// Outstanding pending intents.
    pub fn pending(&self) -> Vec<PendingIntent> {
        self.read().pending.clone()
    }

    /// Remove and return intents older than `max_age_ms`.
    pub fn expire_pending(&self, now_ms: i64, max_age_ms: i64) -> Vec<PendingIntent> {
        let mut inner = self.write();
        let (expired, kept): (Vec<_>, Vec<_>) = inner
            .pending
            .drain(..)
            .partition(|p| now_ms - p.issued_at_ms > max_age_ms);
        inner.pending = kept;
        expired
    }

    // =========================================================================
    // Link status, errors, chat
    // =========================================================================

    /// Update ledger link health.
    pub fn set_link(&self, link: LinkStatus, now_ms: i64) {
        let mut inner = self.write();
        inner.link = link;
        if link == LinkStatus::Connected {
            inner.last_sync_ms = inner.last_sync_ms.max(now_ms);
        }
    }

    /// Current link health and last confirmed-sync instant.
    pub fn link(&self) -> (LinkStatus, i64) {
        let inner = self.read();
        (inner.link, inner.last_sync_ms)
    }

    /// Surface a user-visible error (ledger write failures and precondition
    /// violations only).
    pub fn push_error(&self, message: impl Into<String>) {
        self.write().errors.push(message.into());
    }

    /// Drain surfaced errors.
    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.write().errors)
    }

    /// Append a chat line, keeping the most recent lines only.
    pub fn push_chat(&self, entry: ChatEntry) {
        let mut inner = self.write();
        inner.chat.push_back(entry);
        while inner.chat.len() > CHAT_CAPACITY {
            inner.chat.pop_front();
        }
    }

    /// Retained chat lines, oldest first.
    pub fn chat(&self) -> Vec<ChatEntry> {
        self.read().chat.iter().cloned().collect()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Atomic copy of everything rendering needs.
    pub fn snapshot(&self) -> WorldSnapshot {
        let inner = self.read();
        WorldSnapshot {
            session: inner.session.clone(),
            local: inner.local.clone(),
            remotes: inner.remotes.values().cloned().collect(),
            leaderboard: inner.leaderboard.clone(),
            pending: inner.pending.clone(),
            link: inner.link,
            last_sync_ms: inner.last_sync_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> EntityState {
        EntityState::new(id, format!("0x{id}"), id.to_uppercase(), Vec3::ZERO)
    }

    #[test]
    fn test_damage_clamps_and_flips_alive() {
        let mut e = entity("p1");
        e.health = 40;

        e.apply_damage(50);

        assert_eq!(e.health, 0);
        assert!(!e.alive);
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut e = entity("p1");
        e.health = 90;
        e.heal(30);
        assert_eq!(e.health, EntityState::MAX_HEALTH);
    }

    #[test]
    fn test_ids_stay_unique() {
        let store = GameStore::new();
        store.set_local(entity("me"));

        // Upserting the local id as a remote is refused.
        store.upsert_remote(entity("me"));
        assert!(store.remote("me").is_none());

        // Upserting the same remote twice replaces, not duplicates.
        store.upsert_remote(entity("r1"));
        let mut moved = entity("r1");
        moved.position = Vec3::new(1.0, 0.0, 1.0);
        store.upsert_remote(moved);
        assert_eq!(store.remotes().len(), 1);
        assert_eq!(store.remote("r1").unwrap().position.x, 1.0);

        // Promoting an id to local drops the remote twin.
        store.set_local(entity("r1"));
        assert!(store.remote("r1").is_none());
    }

    #[test]
    fn test_prediction_touches_only_local_position() {
        let store = GameStore::new();
        let mut local = entity("me");
        local.health = 55;
        store.set_local(local);

        store.push_prediction(Vec3::new(3.0, 0.4, -2.0));

        let local = store.local().unwrap();
        assert_eq!(local.position, Vec3::new(3.0, 0.4, -2.0));
        assert_eq!(local.health, 55);
    }

    #[test]
    fn test_event_registration_is_idempotent() {
        let store = GameStore::new();
        assert!(store.register_event("digest_0"));
        assert!(!store.register_event("digest_0"));
        assert!(store.register_event("digest_1"));
    }

    #[test]
    fn test_seen_events_capacity_is_bounded() {
        let store = GameStore::new();
        for i in 0..(SEEN_EVENT_CAPACITY + 10) {
            assert!(store.register_event(&format!("ev_{i}")));
        }
        // The oldest ids have been evicted and would be accepted again.
        assert!(store.register_event("ev_0"));
        // Recent ids are still rejected.
        let recent = format!("ev_{}", SEEN_EVENT_CAPACITY + 9);
        assert!(!store.register_event(&recent));
    }

    #[test]
    fn test_transport_position_superseded_by_ledger() {
        let store = GameStore::new();
        store.upsert_remote(entity("r1"));

        // Ledger wrote at t=100; a transport tick from the same instant or
        // earlier is discarded.
        store.note_ledger_write("r1", 100);
        assert!(!store.apply_remote_position("r1", Vec3::new(9.0, 0.4, 9.0), 100));
        assert!(!store.apply_remote_position("r1", Vec3::new(9.0, 0.4, 9.0), 99));
        assert_eq!(store.remote("r1").unwrap().position, Vec3::ZERO);

        // A strictly newer tick applies.
        assert!(store.apply_remote_position("r1", Vec3::new(9.0, 0.4, 9.0), 101));
        assert_eq!(store.remote("r1").unwrap().position.x, 9.0);
    }

    #[test]
    fn test_transport_position_unknown_entity() {
        let store = GameStore::new();
        assert!(!store.apply_remote_position("ghost", Vec3::ZERO, 1));
    }

    #[test]
    fn test_pending_add_remove_is_safe() {
        let store = GameStore::new();
        store.add_pending("digest_a", IntentKind::Join, 1_000);
        store.add_pending("digest_a", IntentKind::Join, 1_000);
        assert_eq!(store.pending().len(), 1);

        assert!(store.remove_pending("digest_a"));
        // Removing again is a silent no-op.
        assert!(!store.remove_pending("digest_a"));
        assert!(store.pending().is_empty());
    }

    #[test]
    fn test_pending_expiry() {
        let store = GameStore::new();
        store.add_pending("old", IntentKind::Attack, 0);
        store.add_pending("fresh", IntentKind::Move, 50_000);

        let expired = store.expire_pending(61_000, 60_000);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].digest, "old");
        assert_eq!(store.pending().len(), 1);
        assert_eq!(store.pending()[0].digest, "fresh");
    }

    #[test]
    fn test_session_count_never_exceeds_max() {
        let store = GameStore::new();
        store.set_session(SessionState {
            id: "s1".into(),
            name: "Arena".into(),
            creator: "0xabc".into(),
            active: true,
            player_count: 31,
            max_players: 32,
            created_at_ms: 0,
        });

        store.session_player_joined();
        store.session_player_joined();

        assert_eq!(store.session().unwrap().player_count, 32);

        store.session_player_left();
        assert_eq!(store.session().unwrap().player_count, 31);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let store = GameStore::new();
        store.set_local(entity("me"));
        let snap = store.snapshot();

        store.push_prediction(Vec3::new(5.0, 0.4, 5.0));

        // The earlier snapshot does not observe later writes.
        assert_eq!(snap.local.unwrap().position, Vec3::ZERO);
        assert_eq!(store.snapshot().local.unwrap().position.x, 5.0);
    }

    #[test]
    fn test_chat_ring_is_bounded() {
        let store = GameStore::new();
        for i in 0..(CHAT_CAPACITY + 5) {
            store.push_chat(ChatEntry {
                sender: "r1".into(),
                text: format!("line {i}"),
                timestamp_ms: i as i64,
            });
        }
        let chat = store.chat();
        assert_eq!(chat.len(), CHAT_CAPACITY);
        assert_eq!(chat[0].text, "line 5");
    }
}
