//! Arena Service
//!
//! Queries and intent submission against the game package. Reads go through
//! the [`LedgerReader`]; writes go through the optional [`LedgerWriter`]
//! capability owned by the wallet layer. Submitting without a connected
//! account is a synchronous precondition error, never retried here.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::chain::config::ChainConfig;
use crate::chain::events::{field_bool, field_f32, field_str, field_text, field_u64};
use crate::chain::rpc::{
    ChainError, EventFilter, LedgerReader, LedgerWriter, MoveCall, TxStatus,
};
use crate::core::vec3::Vec3;
use crate::state::{
    EntityState, GameStore, IntentKind, LeaderboardEntry, SessionState, SyncStatus,
};

/// Well-known clock object passed to time-stamped entry functions.
pub const CLOCK_OBJECT_ID: &str = "0x6";

const FN_JOIN: &str = "join_game";
const FN_MOVE: &str = "move_player";
const FN_ATTACK: &str = "attack_player";
const FN_RESPAWN: &str = "respawn_player";

/// High-level ledger operations for one configured game package.
pub struct ArenaService<R, W> {
    reader: Arc<R>,
    writer: Option<Arc<W>>,
    account: Option<String>,
    package: String,
    module: String,
    store: Arc<GameStore>,
}

impl<R: LedgerReader, W: LedgerWriter> ArenaService<R, W> {
    /// Create a read-only service (no wallet attached).
    pub fn new(config: &ChainConfig, reader: Arc<R>, store: Arc<GameStore>) -> Self {
        Self {
            reader,
            writer: None,
            account: None,
            package: config.package_id.clone(),
            module: config.module.clone(),
            store,
        }
    }

    /// Attach the wallet capability and its account address.
    pub fn with_wallet(mut self, writer: Arc<W>, account: impl Into<String>) -> Self {
        self.writer = Some(writer);
        self.account = Some(account.into());
        self
    }

    /// Connected account address, if any.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Event/query filter for the configured package + module.
    pub fn filter(&self) -> EventFilter {
        EventFilter {
            package: self.package.clone(),
            module: self.module.clone(),
        }
    }

    fn call(&self, function: &str, args: Vec<Value>) -> MoveCall {
        MoveCall {
            package: self.package.clone(),
            module: self.module.clone(),
            function: function.to_string(),
            args,
        }
    }

    async fn submit_intent(&self, kind: IntentKind, call: MoveCall) -> Result<String, ChainError> {
        if self.account.is_none() {
            return Err(ChainError::NoAccount);
        }
        let writer = self.writer.as_ref().ok_or(ChainError::NoAccount)?;

        match writer.submit(&call).await {
            Ok(digest) => {
                info!(target = %call.target(), digest = %digest, "intent submitted");
                self.store
                    .add_pending(digest.as_str(), kind, Utc::now().timestamp_millis());
                self.store.set_local_sync(SyncStatus::Syncing);
                Ok(digest)
            }
            Err(err) => {
                self.store
                    .push_error(format!("{kind} submission failed: {err}"));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Intent submission
    // =========================================================================

    /// Join a session under `username`.
    pub async fn join_session(
        &self,
        session_id: &str,
        username: &str,
    ) -> Result<String, ChainError> {
        let call = self.call(
            FN_JOIN,
            vec![json!(session_id), json!(username), json!(CLOCK_OBJECT_ID)],
        );
        self.submit_intent(IntentKind::Join, call).await
    }

    /// Record the local entity's position on the ledger.
    pub async fn submit_move(
        &self,
        session_id: &str,
        player_id: &str,
        position: Vec3,
    ) -> Result<String, ChainError> {
        let call = self.call(
            FN_MOVE,
            vec![
                json!(session_id),
                json!(player_id),
                json!(position.x),
                json!(position.y),
                json!(position.z),
            ],
        );
        self.submit_intent(IntentKind::Move, call).await
    }

    /// Record an attack on the ledger.
    pub async fn submit_attack(
        &self,
        session_id: &str,
        attacker_id: &str,
        target_id: &str,
        damage: u32,
    ) -> Result<String, ChainError> {
        let call = self.call(
            FN_ATTACK,
            vec![
                json!(session_id),
                json!(attacker_id),
                json!(target_id),
                json!(damage),
            ],
        );
        self.submit_intent(IntentKind::Attack, call).await
    }

    /// Request a respawn on the ledger.
    pub async fn submit_respawn(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<String, ChainError> {
        let call = self.call(FN_RESPAWN, vec![json!(session_id), json!(player_id)]);
        self.submit_intent(IntentKind::Respawn, call).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch and decode a session object.
    pub async fn session_status(&self, session_id: &str) -> Result<SessionState, ChainError> {
        let fields = self.reader.get_object(session_id).await?;
        decode_session(session_id, &fields)
            .ok_or_else(|| ChainError::Malformed(format!("session object {session_id}")))
    }

    /// Fetch and decode a player object.
    pub async fn player(&self, player_id: &str) -> Result<EntityState, ChainError> {
        let fields = self.reader.get_object(player_id).await?;
        decode_player(player_id, &fields)
            .ok_or_else(|| ChainError::Malformed(format!("player object {player_id}")))
    }

    /// All players that joined a session, resolved through their join
    /// events. Players whose objects cannot be fetched are skipped.
    pub async fn players(&self, session_id: &str) -> Result<Vec<EntityState>, ChainError> {
        let page = self
            .reader
            .query_events(&self.filter(), None, 100, false)
            .await?;

        let mut players = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for raw in &page.data {
            let Some(event) = crate::chain::events::decode(raw) else {
                continue;
            };
            let crate::chain::events::EventPayload::PlayerJoined {
                session_id: event_session,
                player_id,
                ..
            } = &event.payload
            else {
                continue;
            };
            if event_session.as_str() != session_id || !seen.insert(player_id.clone()) {
                continue;
            }
            match self.player(player_id).await {
                Ok(player) => players.push(player),
                Err(err) => {
                    warn!(player_id = %player_id, error = %err, "skipping unreadable player object");
                }
            }
        }
        Ok(players)
    }

    /// Leaderboard computed from player objects, highest score first.
    pub async fn leaderboard(&self, session_id: &str) -> Result<Vec<LeaderboardEntry>, ChainError> {
        let mut players = self.players(session_id).await?;
        players.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(players
            .into_iter()
            .map(|p| LeaderboardEntry {
                address: p.address,
                score: p.score,
            })
            .collect())
    }

    /// Recently created sessions. Sessions whose objects cannot be decoded
    /// are skipped.
    pub async fn list_sessions(&self) -> Result<Vec<SessionState>, ChainError> {
        let ids = self
            .reader
            .query_created_sessions(&self.filter(), 50)
            .await?;
        let mut sessions = Vec::new();
        for id in ids {
            match self.session_status(&id).await {
                Ok(session) => sessions.push(session),
                Err(err) => warn!(session_id = %id, error = %err, "skipping unreadable session"),
            }
        }
        Ok(sessions)
    }

    /// Execution status of a submitted transaction.
    pub async fn transaction_status(&self, digest: &str) -> Result<TxStatus, ChainError> {
        self.reader.transaction_status(digest).await
    }
}

fn decode_session(id: &str, fields: &Value) -> Option<SessionState> {
    Some(SessionState {
        id: id.to_string(),
        name: field_text(fields, "name").unwrap_or_else(|| "Unnamed Session".to_string()),
        creator: field_str(fields, "creator")?,
        active: field_bool(fields, "is_active")?,
        player_count: field_u64(fields, "player_count")? as u32,
        max_players: field_u64(fields, "max_players")? as u32,
        created_at_ms: field_u64(fields, "created_at")? as i64,
    })
}

fn decode_player(id: &str, fields: &Value) -> Option<EntityState> {
    let mut player = EntityState::new(
        id,
        field_str(fields, "player_address")?,
        field_text(fields, "username").unwrap_or_default(),
        Vec3::new(
            field_f32(fields, "x")?,
            field_f32(fields, "y")?,
            field_f32(fields, "z")?,
        ),
    );
    player.health = field_u64(fields, "health")? as u32;
    player.score = field_u64(fields, "score")?;
    player.kills = field_u64(fields, "kills")? as u32;
    player.deaths = field_u64(fields, "deaths")? as u32;
    player.alive = field_bool(fields, "is_alive")?;
    Some(player)
}
