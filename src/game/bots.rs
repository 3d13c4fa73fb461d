//! Fill-In Bots
//!
//! AI opponents used to populate a session when no remote humans are
//! present. Bots follow the same per-frame update as everything else:
//! pursue the nearest hostile (the local player), attack inside range with
//! a fixed 2% chance per frame, and respawn on a ring around the player
//! after a fixed delay once defeated. Bot entities live in the store like
//! any other remote; only this controller knows which ids it owns.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::core::vec3::Vec3;
use crate::game::physics::{KinematicBody, PhysicsWorld};
use crate::state::{EntityId, EntityState, GameStore};

/// Bot ground speed while pursuing.
pub const PURSUIT_SPEED: f32 = 3.0;

/// Bots stop closing in once nearer than this.
pub const STANDOFF_DISTANCE: f32 = 5.0;

/// Bot attack reach.
pub const BOT_ATTACK_RANGE: f32 = 10.0;

/// Bot attack damage.
pub const BOT_ATTACK_DAMAGE: u32 = 20;

/// Probability per frame that a bot in range attacks.
pub const BOT_ATTACK_CHANCE: f64 = 0.02;

/// Knockback impulse behind a bot attack.
pub const BOT_KNOCKBACK: f32 = 5.0;

/// Seconds a defeated bot stays down.
pub const BOT_RESPAWN_DELAY: f32 = 3.0;

/// Fill-in squad size bounds.
pub const MIN_FILL_BOTS: usize = 3;
/// Upper bound of the fill-in squad.
pub const MAX_FILL_BOTS: usize = 5;

const SPAWN_RING: std::ops::Range<f32> = 20.0..50.0;
const RESPAWN_RING: std::ops::Range<f32> = 30.0..50.0;

/// One attack a bot landed on the local player this frame.
#[derive(Clone, Debug)]
pub struct BotAttack {
    /// Attacking bot id
    pub bot_id: EntityId,
    /// Damage dealt
    pub damage: u32,
    /// Attacker position (for knockback direction)
    pub origin: Vec3,
}

/// Owns the fill-in bots' behavior and respawn timers.
pub struct BotController {
    rng: StdRng,
    owned: HashSet<EntityId>,
    respawns: HashMap<EntityId, f32>,
}

impl BotController {
    /// Create a controller with a seeded RNG.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            owned: HashSet::new(),
            respawns: HashMap::new(),
        }
    }

    /// Whether an entity id belongs to this controller.
    pub fn is_bot(&self, id: &str) -> bool {
        self.owned.contains(id)
    }

    /// Number of bots owned.
    pub fn count(&self) -> usize {
        self.owned.len()
    }

    /// Spawn 3-5 bots on a ring around `around`, registering them in the
    /// store and the physics world. Returns the new ids.
    pub fn spawn_fill_bots(
        &mut self,
        store: &GameStore,
        physics: &mut PhysicsWorld,
        around: Vec3,
    ) -> Vec<EntityId> {
        let count = self.rng.gen_range(MIN_FILL_BOTS..=MAX_FILL_BOTS);
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            let angle = (i as f32 / count as f32) * TAU;
            let distance = self.rng.gen_range(SPAWN_RING);
            let position = Vec3::new(
                around.x + angle.cos() * distance,
                0.4,
                around.z + angle.sin() * distance,
            );

            let id = format!("bot-{}", Uuid::new_v4());
            let entity = EntityState::new(
                id.clone(),
                format!("bot-{i}"),
                format!("Enemy {}", i + 1),
                position,
            );
            store.upsert_remote(entity);
            physics.insert(id.clone(), KinematicBody::player_at(position));

            self.owned.insert(id.clone());
            ids.push(id);
        }
        ids
    }

    /// Mark a bot as defeated so the respawn timer starts.
    pub fn note_death(&mut self, id: &str) {
        if self.owned.contains(id) {
            self.respawns.entry(id.to_string()).or_insert(BOT_RESPAWN_DELAY);
        }
    }

    /// Advance every bot by one frame. Returns the attacks landed on the
    /// local player this frame.
    pub fn update(
        &mut self,
        dt: f32,
        store: &GameStore,
        physics: &mut PhysicsWorld,
        player_position: Vec3,
    ) -> Vec<BotAttack> {
        let mut attacks = Vec::new();

        let ids: Vec<EntityId> = self.owned.iter().cloned().collect();
        for id in ids {
            let Some(bot) = store.remote(&id) else {
                continue;
            };
            if !bot.alive {
                self.note_death(&id);
                continue;
            }

            let position = physics.get(&id).map_or(bot.position, |b| b.position);
            let distance = position.distance_xz(player_position);

            if distance > STANDOFF_DISTANCE {
                let direction = (player_position - position).horizontal().normalize_or_zero();
                let step = direction * (PURSUIT_SPEED * dt);

                if let Some(body) = physics.get_mut(&id) {
                    body.position.x += step.x;
                    body.position.z += step.z;
                    let mut moved = bot.clone();
                    moved.position = body.position;
                    store.upsert_remote(moved);
                } else {
                    // Culled from physics: advance the stored position
                    // directly so the bot keeps approaching.
                    let mut moved = bot.clone();
                    moved.position += step;
                    store.upsert_remote(moved);
                }
            }

            if distance < BOT_ATTACK_RANGE && self.rng.gen::<f64>() < BOT_ATTACK_CHANCE {
                attacks.push(BotAttack {
                    bot_id: id.clone(),
                    damage: BOT_ATTACK_DAMAGE,
                    origin: position,
                });
            }
        }

        self.tick_respawns(dt, store, player_position);
        attacks
    }

    fn tick_respawns(&mut self, dt: f32, store: &GameStore, player_position: Vec3) {
        let mut due = Vec::new();
        for (id, remaining) in self.respawns.iter_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                due.push(id.clone());
            }
        }

        for id in due {
            self.respawns.remove(&id);
            let angle = self.rng.gen_range(0.0..TAU);
            let distance = self.rng.gen_range(RESPAWN_RING);
            let position = Vec3::new(
                player_position.x + angle.cos() * distance,
                0.4,
                player_position.z + angle.sin() * distance,
            );
            store.respawn_entity(&id, position);
        }
    }
}
