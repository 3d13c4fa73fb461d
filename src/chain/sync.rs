//! Ledger Event Application
//!
//! Wires the event stream into the reconciliation store and runs the
//! pending-intent lifecycle. Application is idempotent: the store's
//! duplicate filter is consulted before any write, so at-least-once delivery
//! from the stream collapses to exactly-once effects.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chain::events::{ArenaEvent, EventKind, EventPayload};
use crate::chain::rpc::{LedgerReader, TxStatus};
use crate::chain::stream::{LedgerEventStream, Subscription};
use crate::core::vec3::Vec3;
use crate::state::{EntityState, GameStore, PendingIntent, SessionState, SyncStatus};

/// Cadence of the transaction-status fallback poll.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Hard ceiling on how long an intent may stay pending.
pub const PENDING_INTENT_TIMEOUT_MS: i64 = 60_000;

/// Where respawned entities reappear.
pub const RESPAWN_POINT: Vec3 = Vec3::new(50.0, 0.0, 50.0);

/// Connects ledger events to the store for one session. Holds the
/// subscriptions and background tasks it created; [`ChainSync::shutdown`]
/// releases all of them.
pub struct ChainSync {
    subs: Vec<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChainSync {
    /// Subscribe to every event kind on `stream`, applying events scoped to
    /// `session_id` into `store`.
    pub fn attach<R: LedgerReader + 'static>(
        stream: &LedgerEventStream<R>,
        store: Arc<GameStore>,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let subs = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let store = Arc::clone(&store);
                let session_id = session_id.clone();
                stream.subscribe(kind, move |event| {
                    if event.payload.session_id() != session_id {
                        return;
                    }
                    Self::apply(&store, event);
                })
            })
            .collect();

        info!(session_id = %session_id, "chain sync attached");
        Self {
            subs,
            tasks: Vec::new(),
        }
    }

    /// Apply one event now.
    pub fn apply(store: &GameStore, event: &ArenaEvent) {
        Self::apply_at(store, event, Utc::now().timestamp_millis());
    }

    /// Apply one event as of `now_ms`. Re-applying an already-seen event id
    /// leaves the store unchanged.
    pub fn apply_at(store: &GameStore, event: &ArenaEvent, now_ms: i64) {
        if !store.register_event(&event.event_id) {
            debug!(event_id = %event.event_id, "duplicate event ignored");
            return;
        }

        // A confirmed event referencing a tracked intent is its confirmation.
        if store.remove_pending(&event.digest) {
            debug!(digest = %event.digest, "pending intent confirmed by event");
        }

        match &event.payload {
            EventPayload::SessionCreated {
                session_id,
                name,
                creator,
                max_players,
            } => {
                if store.session().is_none() {
                    store.set_session(SessionState {
                        id: session_id.clone(),
                        name: name.clone(),
                        creator: creator.clone(),
                        active: true,
                        player_count: 0,
                        max_players: *max_players,
                        created_at_ms: event.timestamp_ms,
                    });
                }
            }

            EventPayload::PlayerJoined {
                player_id,
                address,
                name,
                x,
                y,
                z,
                ..
            } => {
                let is_local = store
                    .local()
                    .is_some_and(|l| l.id == *player_id || l.address == *address);
                if is_local {
                    store.set_local_sync(SyncStatus::Synced);
                } else if store.remote(player_id).is_some() {
                    // Transport placeholder now confirmed.
                    store.set_remote_sync(player_id, SyncStatus::Synced);
                } else {
                    store.upsert_remote(EntityState::new(
                        player_id.clone(),
                        address.clone(),
                        name.clone(),
                        Vec3::new(*x, *y, *z),
                    ));
                }
                store.session_player_joined();
                store.note_ledger_write(player_id, now_ms);
            }

            EventPayload::PlayerMoved {
                player_id, x, y, z, ..
            } => {
                let is_local = store.local().is_some_and(|l| l.id == *player_id);
                if !is_local {
                    store.move_remote(player_id, Vec3::new(*x, *y, *z));
                }
                store.note_ledger_write(player_id, now_ms);
            }

            EventPayload::PlayerAttacked {
                target_id, damage, ..
            } => {
                store.damage_entity(target_id, *damage);
                store.note_ledger_write(target_id, now_ms);
            }

            EventPayload::PlayerDied {
                player_id,
                killer_id,
                ..
            } => {
                store.mark_dead(player_id);
                if let Some(killer) = killer_id {
                    store.credit_kill(killer);
                    store.note_ledger_write(killer, now_ms);
                }
                store.note_ledger_write(player_id, now_ms);
            }

            EventPayload::PlayerRespawned { player_id, .. } => {
                store.respawn_entity(player_id, RESPAWN_POINT);
                store.note_ledger_write(player_id, now_ms);
            }

            EventPayload::LeaderboardUpdated { entries, .. } => {
                store.apply_scores(entries);
                store.set_leaderboard(entries.clone());
            }
        }

        store.set_link(crate::state::LinkStatus::Connected, now_ms);
    }

    /// Resolve one confirmation observed via the fallback poll. A failure
    /// removes the intent and surfaces the error without touching any
    /// entity state.
    pub fn resolve_confirmation(store: &GameStore, intent: &PendingIntent, status: TxStatus) {
        match status {
            TxStatus::Success => {
                store.remove_pending(&intent.digest);
            }
            TxStatus::Failure => {
                store.remove_pending(&intent.digest);
                store.push_error(format!(
                    "{} transaction {} failed on the ledger",
                    intent.kind, intent.digest
                ));
            }
            TxStatus::Pending => {}
        }
    }

    /// Start the 2 s fallback poll that resolves intents whose confirmation
    /// event was missed, plus the hard-timeout sweep.
    pub fn start_confirmation_poll<R: LedgerReader + 'static>(
        &mut self,
        reader: Arc<R>,
        store: Arc<GameStore>,
    ) {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CONFIRMATION_POLL_INTERVAL);
            loop {
                interval.tick().await;

                for intent in store.pending() {
                    match reader.transaction_status(&intent.digest).await {
                        Ok(TxStatus::Success) => {
                            Self::resolve_confirmation(&store, &intent, TxStatus::Success);
                        }
                        Ok(TxStatus::Failure) => {
                            Self::resolve_confirmation(&store, &intent, TxStatus::Failure);
                        }
                        // Still pending, or a transient query failure:
                        // retried next tick.
                        Ok(TxStatus::Pending) | Err(_) => {}
                    }
                }

                let now_ms = Utc::now().timestamp_millis();
                for expired in store.expire_pending(now_ms, PENDING_INTENT_TIMEOUT_MS) {
                    store.push_error(format!(
                        "{} transaction {} timed out waiting for confirmation",
                        expired.kind, expired.digest
                    ));
                    store.set_local_sync(SyncStatus::OutOfSync);
                }
            }
        });
        self.tasks.push(handle);
    }

    /// Unsubscribe every handler and stop every task this sync spawned.
    pub fn shutdown(self) {
        for sub in self.subs {
            sub.unsubscribe();
        }
        for task in self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::IntentKind;

    fn event(id: &str, payload: EventPayload) -> ArenaEvent {
        ArenaEvent {
            event_id: format!("{id}_0"),
            digest: id.to_string(),
            kind: match payload {
                EventPayload::SessionCreated { .. } => EventKind::SessionCreated,
                EventPayload::PlayerJoined { .. } => EventKind::PlayerJoined,
                EventPayload::PlayerMoved { .. } => EventKind::PlayerMoved,
                EventPayload::PlayerAttacked { .. } => EventKind::PlayerAttacked,
                EventPayload::PlayerRespawned { .. } => EventKind::PlayerRespawned,
                EventPayload::PlayerDied { .. } => EventKind::PlayerDied,
                EventPayload::LeaderboardUpdated { .. } => EventKind::LeaderboardUpdated,
            },
            payload,
            timestamp_ms: 1_700_000_000_000,
        }
    }

    fn attacked(digest: &str, target: &str, damage: u32) -> ArenaEvent {
        event(
            digest,
            EventPayload::PlayerAttacked {
                session_id: "s1".into(),
                attacker_id: "atk".into(),
                target_id: target.into(),
                damage,
            },
        )
    }

    fn store_with_remote(id: &str, health: u32) -> GameStore {
        let store = GameStore::new();
        let mut e = EntityState::new(id, format!("0x{id}"), id.to_uppercase(), Vec3::ZERO);
        e.health = health;
        store.upsert_remote(e);
        store
    }

    #[test]
    fn test_double_apply_is_a_no_op() {
        let store = store_with_remote("r1", 100);
        let ev = attacked("d1", "r1", 25);

        ChainSync::apply_at(&store, &ev, 1_000);
        let after_first = store.snapshot();

        ChainSync::apply_at(&store, &ev, 2_000);
        assert_eq!(store.snapshot(), after_first);
        assert_eq!(store.remote("r1").unwrap().health, 75);
    }

    #[test]
    fn test_attack_clamps_health_and_flips_alive() {
        let store = store_with_remote("r1", 40);

        ChainSync::apply_at(&store, &attacked("d1", "r1", 50), 1_000);

        let target = store.remote("r1").unwrap();
        assert_eq!(target.health, 0);
        assert!(!target.alive);
    }

    #[test]
    fn test_join_adds_remote_and_bumps_count() {
        let store = GameStore::new();
        store.set_session(SessionState {
            id: "s1".into(),
            name: "Arena".into(),
            creator: "0xabc".into(),
            active: true,
            player_count: 1,
            max_players: 32,
            created_at_ms: 0,
        });

        let ev = event(
            "d1",
            EventPayload::PlayerJoined {
                session_id: "s1".into(),
                player_id: "r1".into(),
                address: "0xr1".into(),
                name: "R1".into(),
                x: 10.0,
                y: 0.4,
                z: -3.0,
            },
        );
        ChainSync::apply_at(&store, &ev, 1_000);

        let remote = store.remote("r1").unwrap();
        assert_eq!(remote.position, Vec3::new(10.0, 0.4, -3.0));
        assert_eq!(remote.health, EntityState::MAX_HEALTH);
        assert_eq!(store.session().unwrap().player_count, 2);
    }

    #[test]
    fn test_local_join_marks_synced_not_duplicated() {
        let store = GameStore::new();
        let mut local = EntityState::new("me", "0xme", "Me", Vec3::ZERO);
        local.sync = SyncStatus::Syncing;
        store.set_local(local);

        let ev = event(
            "d1",
            EventPayload::PlayerJoined {
                session_id: "s1".into(),
                player_id: "me".into(),
                address: "0xme".into(),
                name: "Me".into(),
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
        );
        ChainSync::apply_at(&store, &ev, 1_000);

        assert_eq!(store.local().unwrap().sync, SyncStatus::Synced);
        assert!(store.remote("me").is_none());
    }

    #[test]
    fn test_moved_updates_remote_but_never_local() {
        let store = GameStore::new();
        store.set_local(EntityState::new("me", "0xme", "Me", Vec3::ZERO));
        store.upsert_remote(EntityState::new("r1", "0xr1", "R1", Vec3::ZERO));

        let ev = event(
            "d1",
            EventPayload::PlayerMoved {
                session_id: "s1".into(),
                player_id: "r1".into(),
                x: 5.0,
                y: 0.4,
                z: 5.0,
            },
        );
        ChainSync::apply_at(&store, &ev, 1_000);
        assert_eq!(store.remote("r1").unwrap().position.x, 5.0);

        // The local entity's kinematics belong to prediction.
        let ev = event(
            "d2",
            EventPayload::PlayerMoved {
                session_id: "s1".into(),
                player_id: "me".into(),
                x: 99.0,
                y: 0.4,
                z: 99.0,
            },
        );
        ChainSync::apply_at(&store, &ev, 2_000);
        assert_eq!(store.local().unwrap().position, Vec3::ZERO);
        // But the write instant is still recorded for precedence.
        assert_eq!(store.ledger_write_at("me"), Some(2_000));
    }

    #[test]
    fn test_death_and_respawn_cycle() {
        let store = store_with_remote("r1", 10);
        store.set_local(EntityState::new("me", "0xme", "Me", Vec3::ZERO));

        let ev = event(
            "d1",
            EventPayload::PlayerDied {
                session_id: "s1".into(),
                player_id: "r1".into(),
                killer_id: Some("me".into()),
            },
        );
        ChainSync::apply_at(&store, &ev, 1_000);

        let dead = store.remote("r1").unwrap();
        assert!(!dead.alive);
        assert_eq!(dead.deaths, 1);
        assert_eq!(store.local().unwrap().kills, 1);

        let ev = event(
            "d2",
            EventPayload::PlayerRespawned {
                session_id: "s1".into(),
                player_id: "r1".into(),
            },
        );
        ChainSync::apply_at(&store, &ev, 2_000);

        let back = store.remote("r1").unwrap();
        assert!(back.alive);
        assert_eq!(back.health, EntityState::MAX_HEALTH);
        assert_eq!(back.position, RESPAWN_POINT);
    }

    #[test]
    fn test_leaderboard_replaces_and_scores_entities() {
        let store = GameStore::new();
        store.set_local(EntityState::new("me", "0xme", "Me", Vec3::ZERO));

        let ev = event(
            "d1",
            EventPayload::LeaderboardUpdated {
                session_id: "s1".into(),
                entries: vec![crate::state::LeaderboardEntry {
                    address: "0xme".into(),
                    score: 420,
                }],
            },
        );
        ChainSync::apply_at(&store, &ev, 1_000);

        assert_eq!(store.leaderboard().len(), 1);
        assert_eq!(store.local().unwrap().score, 420);
    }

    #[test]
    fn test_event_confirms_matching_pending_intent() {
        let store = store_with_remote("r1", 100);
        store.add_pending("d1", IntentKind::Attack, 500);

        ChainSync::apply_at(&store, &attacked("d1", "r1", 10), 1_000);

        assert!(store.pending().is_empty());
    }

    #[test]
    fn test_failed_confirmation_removes_intent_without_state_change() {
        let store = store_with_remote("r1", 100);
        store.add_pending("d9", IntentKind::Attack, 500);
        let before = store.remote("r1").unwrap();

        let intent = store.pending()[0].clone();
        ChainSync::resolve_confirmation(&store, &intent, TxStatus::Failure);

        assert!(store.pending().is_empty());
        assert_eq!(store.remote("r1").unwrap(), before);
        let errors = store.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("d9"));
    }

    #[test]
    fn test_pending_status_keeps_intent() {
        let store = GameStore::new();
        store.add_pending("d1", IntentKind::Join, 500);

        let intent = store.pending()[0].clone();
        ChainSync::resolve_confirmation(&store, &intent, TxStatus::Pending);

        assert_eq!(store.pending().len(), 1);
    }
}
