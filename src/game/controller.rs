//! Game Loop Controller
//!
//! Per-frame orchestration in a fixed order: cull distant entities, sample
//! input, apply it as forces, step physics, evaluate combat and bots, push
//! the predicted local state into the store, and finally emit outbound
//! traffic (position ticks throttled to ~10 Hz, discrete actions
//! immediately).
//!
//! Ledger intents are not submitted from here: the controller is
//! synchronous, so discrete actions land in an outbox the embedding host
//! drains into the [`crate::chain::ArenaService`].

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::core::vec3::Vec3;
use crate::game::bots::{BotController, BOT_KNOCKBACK};
use crate::game::combat::{
    self, Cooldown, ATTACK_COOLDOWN, ATTACK_DAMAGE, ATTACK_KNOCKBACK, ATTACK_RANGE, HEAL_AMOUNT,
    HEAL_COOLDOWN,
};
use crate::game::input::InputSampler;
use crate::game::physics::{KinematicBody, PhysicsWorld};
use crate::net::messages::NetMessage;
use crate::net::transport::RealtimeTransport;
use crate::state::{EntityId, EntityState, GameStore};

/// Horizontal force applied per held movement axis.
pub const MOVE_FORCE: f32 = 15.0;

/// Upward impulse applied on jump (grounded only).
pub const JUMP_IMPULSE: f32 = 8.0;

/// Entities beyond this distance from the local player leave active
/// physics simulation; they stay tracked in the store and are reinstated
/// once back in range.
pub const SIMULATION_RADIUS: f32 = 50.0;

/// Seconds between outbound position ticks (~10 Hz).
pub const POSITION_EMIT_INTERVAL: f32 = 0.1;

/// A discrete action awaiting ledger submission.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundIntent {
    /// The local player hit a target
    Attack {
        /// Target entity id
        target_id: EntityId,
        /// Damage dealt
        damage: u32,
    },
    /// The local player wants to respawn
    Respawn,
}

/// Drives the local simulation for one session.
pub struct GameController {
    physics: PhysicsWorld,
    input: InputSampler,
    bots: BotController,
    store: Arc<GameStore>,
    transport: Option<Arc<RealtimeTransport>>,
    session_id: String,
    local_id: String,
    attack_cooldown: Cooldown,
    heal_cooldown: Cooldown,
    emit_timer: f32,
    outbox: Vec<OutboundIntent>,
}

impl GameController {
    /// Build a controller over the store's current session and local
    /// entity, seeding physics bodies for everything already known.
    pub fn new(
        store: Arc<GameStore>,
        transport: Option<Arc<RealtimeTransport>>,
        bot_seed: u64,
    ) -> Self {
        let session_id = store.session().map(|s| s.id).unwrap_or_default();
        let local_id = store.local().map(|l| l.id).unwrap_or_default();

        let mut physics = PhysicsWorld::new();
        if let Some(local) = store.local() {
            physics.insert(local.id.clone(), KinematicBody::player_at(local.position));
        }
        for remote in store.remotes() {
            physics.insert(remote.id.clone(), KinematicBody::player_at(remote.position));
        }

        Self {
            physics,
            input: InputSampler::new(),
            bots: BotController::new(bot_seed),
            store,
            transport,
            session_id,
            local_id,
            attack_cooldown: Cooldown::new(),
            heal_cooldown: Cooldown::new(),
            emit_timer: 0.0,
            outbox: Vec::new(),
        }
    }

    /// Input sink for the embedding host's key/pointer events.
    pub fn input_mut(&mut self) -> &mut InputSampler {
        &mut self.input
    }

    /// Read access to the physics world (primarily for tests and debug
    /// overlays).
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Drain discrete actions awaiting ledger submission.
    pub fn take_outbox(&mut self) -> Vec<OutboundIntent> {
        std::mem::take(&mut self.outbox)
    }

    /// Spawn fill-in bots when the session has no remote participants.
    /// Returns how many were created.
    pub fn spawn_fill_bots(&mut self) -> usize {
        if !self.store.remotes().is_empty() {
            return 0;
        }
        let Some(local) = self.store.local() else {
            return 0;
        };
        let ids = self
            .bots
            .spawn_fill_bots(&self.store, &mut self.physics, local.position);
        debug!(count = ids.len(), "spawned fill-in bots");
        ids.len()
    }

    /// Queue a respawn request (transport immediately, ledger via outbox).
    pub fn request_respawn(&mut self) {
        if let Some(transport) = &self.transport {
            transport.send(&NetMessage::respawn(
                &self.local_id,
                &self.session_id,
                Utc::now().timestamp_millis(),
            ));
        }
        self.outbox.push(OutboundIntent::Respawn);
    }

    /// Advance the simulation by one frame.
    pub fn update(&mut self, dt: f32) {
        let Some(local) = self.store.local() else {
            return;
        };

        // 1. Distance-based culling keeps the pairwise collision sweep
        //    affordable.
        self.cull_and_reinstate(&local);

        // 2. Sample this frame's intent.
        let frame = self.input.sample();

        // 3. Apply intent as forces/impulses on the local body.
        if local.alive {
            if frame.move_x != 0.0 {
                self.physics
                    .apply_force(&self.local_id, Vec3::new(frame.move_x * MOVE_FORCE, 0.0, 0.0));
            }
            if frame.move_z != 0.0 {
                self.physics
                    .apply_force(&self.local_id, Vec3::new(0.0, 0.0, frame.move_z * MOVE_FORCE));
            }
            let grounded = self
                .physics
                .get(&self.local_id)
                .is_some_and(|b| b.grounded);
            if frame.jump && grounded {
                self.physics
                    .apply_impulse(&self.local_id, Vec3::new(0.0, JUMP_IMPULSE, 0.0));
            }
        }

        // 4. Integrate.
        self.physics.step(dt);
        self.attack_cooldown.tick(dt);
        self.heal_cooldown.tick(dt);

        let local_position = self
            .physics
            .get(&self.local_id)
            .map_or(local.position, |b| b.position);

        // 5. Local combat rules.
        if local.alive && frame.attack && self.attack_cooldown.ready() {
            self.perform_attack(local_position);
            self.attack_cooldown.trigger(ATTACK_COOLDOWN);
        }
        if local.alive && frame.special && self.heal_cooldown.ready() {
            self.store.heal_local(HEAL_AMOUNT);
            self.heal_cooldown.trigger(HEAL_COOLDOWN);
        }

        // 6. Bots run the same per-frame update.
        let bot_attacks = self
            .bots
            .update(dt, &self.store, &mut self.physics, local_position);
        for attack in bot_attacks {
            self.store.damage_local(attack.damage);
            if let Some(impulse) = combat::knockback(attack.origin, local_position, BOT_KNOCKBACK)
            {
                self.physics.apply_impulse(&self.local_id, impulse);
            }
        }

        // 7. Publish the predicted local state.
        if let Some(body) = self.physics.get(&self.local_id) {
            self.store.push_prediction(body.position);
        }

        // 8. Throttled position emission; discrete actions already went out
        //    inside perform_attack/request_respawn.
        self.emit_timer += dt;
        if self.emit_timer >= POSITION_EMIT_INTERVAL {
            self.emit_timer = 0.0;
            if let Some(transport) = &self.transport {
                transport.send(&NetMessage::move_tick(
                    &self.local_id,
                    &self.session_id,
                    Utc::now().timestamp_millis(),
                    local_position.x,
                    local_position.y,
                    local_position.z,
                ));
            }
        }
    }

    fn perform_attack(&mut self, origin: Vec3) {
        let remotes = self.store.remotes();
        let targets = combat::targets_in_range(origin, &remotes, ATTACK_RANGE);
        if targets.is_empty() {
            return;
        }

        for (target_id, target_position) in targets {
            let result = self.store.damage_remote(&target_id, ATTACK_DAMAGE);
            if let Some(impulse) = combat::knockback(origin, target_position, ATTACK_KNOCKBACK) {
                self.physics.apply_impulse(&target_id, impulse);
            }
            if let Some((_, alive)) = result {
                if !alive {
                    self.bots.note_death(&target_id);
                }
            }

            if let Some(transport) = &self.transport {
                transport.send(&NetMessage::attack(
                    &self.local_id,
                    &target_id,
                    &self.session_id,
                    Utc::now().timestamp_millis(),
                    ATTACK_DAMAGE,
                ));
            }
            self.outbox.push(OutboundIntent::Attack {
                target_id,
                damage: ATTACK_DAMAGE,
            });
        }
    }

    fn cull_and_reinstate(&mut self, local: &EntityState) {
        let origin = self
            .physics
            .get(&self.local_id)
            .map_or(local.position, |b| b.position);

        let remotes = self.store.remotes();
        for remote in &remotes {
            let distance = remote.position.distance_xz(origin);
            if distance > SIMULATION_RADIUS {
                self.physics.remove(&remote.id);
            } else if !self.physics.contains(&remote.id) {
                self.physics
                    .insert(remote.id.clone(), KinematicBody::player_at(remote.position));
            }
        }

        // Bodies whose entity left the store entirely are dropped too.
        for id in self.physics.ids() {
            if id != self.local_id && !remotes.iter().any(|r| r.id == id) {
                self.physics.remove(&id);
            }
        }

        if !self.physics.contains(&self.local_id) && !self.local_id.is_empty() {
            self.physics
                .insert(self.local_id.clone(), KinematicBody::player_at(local.position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::KeyCode;
    use crate::state::SessionState;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (Arc<GameStore>, GameController) {
        let store = Arc::new(GameStore::new());
        store.set_session(SessionState {
            id: "s1".into(),
            name: "Arena".into(),
            creator: "0xabc".into(),
            active: true,
            player_count: 1,
            max_players: 32,
            created_at_ms: 0,
        });
        store.set_local(EntityState::new("me", "0xme", "Me", Vec3::new(0.0, 0.4, 0.0)));
        let controller = GameController::new(Arc::clone(&store), None, 7);
        (store, controller)
    }

    fn add_remote(store: &GameStore, controller: &mut GameController, id: &str, position: Vec3) {
        store.upsert_remote(EntityState::new(id, format!("0x{id}"), id, position));
        // Next frame's culling pass will insert the body; force it now so
        // single-frame tests see it.
        controller.update(DT);
    }

    #[test]
    fn test_prediction_reaches_store() {
        let (store, mut controller) = setup();
        controller.input_mut().key_down(KeyCode::D);

        for _ in 0..30 {
            controller.update(DT);
        }

        let local = store.local().unwrap();
        assert!(local.position.x > 0.0, "held D must move the player right");
        // Ground contact is maintained by the integrator.
        assert!((local.position.y - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_jump_requires_ground_contact() {
        let (store, mut controller) = setup();

        // Settle on the ground first.
        controller.update(DT);
        controller.input_mut().key_down(KeyCode::Space);
        controller.update(DT);

        let airborne_y = store.local().unwrap().position.y;
        // Holding space must not re-trigger while airborne.
        for _ in 0..3 {
            controller.update(DT);
        }
        let body = controller.physics().get("me").unwrap();
        assert!(!body.grounded || body.velocity.y == 0.0);
        assert!(airborne_y >= 0.4);
        assert!(body.velocity.y < JUMP_IMPULSE);
    }

    #[test]
    fn test_attack_damages_targets_in_range_once_per_cooldown() {
        let (store, mut controller) = setup();
        add_remote(&store, &mut controller, "near", Vec3::new(3.0, 0.4, 0.0));
        add_remote(&store, &mut controller, "far", Vec3::new(40.0, 0.4, 0.0));

        controller.input_mut().pointer_down();
        controller.update(DT);

        assert_eq!(store.remote("near").unwrap().health, 75);
        assert_eq!(store.remote("far").unwrap().health, 100);
        assert_eq!(
            controller.take_outbox(),
            vec![OutboundIntent::Attack {
                target_id: "near".into(),
                damage: ATTACK_DAMAGE
            }]
        );

        // Pointer still held, but the cooldown gates the next swing.
        controller.update(DT);
        assert_eq!(store.remote("near").unwrap().health, 75);
        assert!(controller.take_outbox().is_empty());
    }

    #[test]
    fn test_special_ability_heals_with_cooldown() {
        let (store, mut controller) = setup();
        store.damage_local(50);

        controller.input_mut().key_down(KeyCode::E);
        controller.update(DT);
        assert_eq!(store.local().unwrap().health, 80);

        // Held key is edge-triggered and the cooldown blocks a re-press.
        controller.input_mut().key_up(KeyCode::E);
        controller.input_mut().key_down(KeyCode::E);
        controller.update(DT);
        assert_eq!(store.local().unwrap().health, 80);
    }

    #[test]
    fn test_distance_culling_drops_and_reinstates() {
        let (store, mut controller) = setup();
        add_remote(&store, &mut controller, "r1", Vec3::new(10.0, 0.4, 0.0));
        assert!(controller.physics().contains("r1"));

        // Entity wanders out of simulation range (e.g. via transport tick).
        let mut far = store.remote("r1").unwrap();
        far.position = Vec3::new(200.0, 0.4, 0.0);
        store.upsert_remote(far);
        controller.update(DT);
        assert!(!controller.physics().contains("r1"));
        // Still tracked in the store.
        assert!(store.remote("r1").is_some());

        // Back in range: reinstated.
        let mut near = store.remote("r1").unwrap();
        near.position = Vec3::new(20.0, 0.4, 0.0);
        store.upsert_remote(near);
        controller.update(DT);
        assert!(controller.physics().contains("r1"));
    }

    #[test]
    fn test_fill_bots_spawn_only_into_empty_sessions() {
        let (store, mut controller) = setup();
        let spawned = controller.spawn_fill_bots();
        assert!(spawned >= 3);
        assert_eq!(store.remotes().len(), spawned);

        // A second call must not stack another squad.
        assert_eq!(controller.spawn_fill_bots(), 0);
    }

    #[test]
    fn test_position_ticks_are_throttled_to_ten_hertz() {
        let store = Arc::new(GameStore::new());
        store.set_local(EntityState::new("me", "0xme", "Me", Vec3::new(0.0, 0.4, 0.0)));
        // Unreachable endpoint: sends queue instead of hitting the network.
        let transport = Arc::new(RealtimeTransport::new(Some("ws://127.0.0.1:9".into())));
        let mut controller = GameController::new(store, Some(Arc::clone(&transport)), 7);

        // 0.5 s of 60 Hz frames -> 5 ticks, not 30.
        for _ in 0..30 {
            controller.update(DT);
        }

        let queued = transport.queued_len();
        assert!((4..=6).contains(&queued), "expected ~5 ticks, got {queued}");
    }

    #[test]
    fn test_dead_player_emits_no_combat() {
        let (store, mut controller) = setup();
        add_remote(&store, &mut controller, "r1", Vec3::new(3.0, 0.4, 0.0));
        store.damage_local(200);

        controller.input_mut().pointer_down();
        controller.update(DT);

        assert_eq!(store.remote("r1").unwrap().health, 100);
        assert!(controller.take_outbox().is_empty());
    }
}
