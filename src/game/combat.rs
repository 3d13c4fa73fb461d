//! Combat Rules
//!
//! Range checks, damage values, knockback, and cooldown bookkeeping shared
//! by the player and the bots. Damage application itself lives in the store
//! so clamping stays in one place.

use crate::core::vec3::Vec3;
use crate::state::{EntityId, EntityState};

/// Player attack reach.
pub const ATTACK_RANGE: f32 = 8.0;

/// Player attack damage.
pub const ATTACK_DAMAGE: u32 = 25;

/// Seconds between player attacks.
pub const ATTACK_COOLDOWN: f32 = 0.5;

/// Knockback impulse behind a player attack.
pub const ATTACK_KNOCKBACK: f32 = 8.0;

/// Health restored by the special ability.
pub const HEAL_AMOUNT: u32 = 30;

/// Seconds between special-ability uses.
pub const HEAL_COOLDOWN: f32 = 5.0;

/// Living entities within `range` of `origin`, as (id, position) pairs.
pub fn targets_in_range(
    origin: Vec3,
    candidates: &[EntityState],
    range: f32,
) -> Vec<(EntityId, Vec3)> {
    candidates
        .iter()
        .filter(|e| e.alive && e.position.distance(origin) <= range)
        .map(|e| (e.id.clone(), e.position))
        .collect()
}

/// Horizontal knockback impulse pushing `to` away from `from`, or `None`
/// when the two coincide (no direction exists).
pub fn knockback(from: Vec3, to: Vec3, force: f32) -> Option<Vec3> {
    let delta = (to - from).horizontal();
    let distance = delta.length();
    if distance == 0.0 {
        return None;
    }
    Some(delta * (force / distance))
}

/// Simple countdown used for attack and ability gating.
#[derive(Debug, Default)]
pub struct Cooldown {
    remaining: f32,
}

impl Cooldown {
    /// Create a cooldown that is immediately ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the gated action may fire.
    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Start the countdown.
    pub fn trigger(&mut self, duration: f32) {
        self.remaining = duration;
    }

    /// Advance by one frame.
    pub fn tick(&mut self, dt: f32) {
        if self.remaining > 0.0 {
            self.remaining -= dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_at(id: &str, position: Vec3, alive: bool) -> EntityState {
        let mut e = EntityState::new(id, "0x0", id, position);
        e.alive = alive;
        e
    }

    #[test]
    fn test_targets_excludes_far_and_dead() {
        let candidates = vec![
            entity_at("near", Vec3::new(3.0, 0.4, 0.0), true),
            entity_at("far", Vec3::new(30.0, 0.4, 0.0), true),
            entity_at("dead", Vec3::new(1.0, 0.4, 0.0), false),
        ];

        let targets = targets_in_range(Vec3::ZERO, &candidates, ATTACK_RANGE);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, "near");
    }

    #[test]
    fn test_knockback_is_horizontal_and_scaled() {
        let kb = knockback(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0), 8.0).unwrap();
        assert_eq!(kb.y, 0.0);
        assert!((kb.length() - 8.0).abs() < 1e-5);
        assert!(kb.z > 0.0);
    }

    #[test]
    fn test_knockback_zero_distance_guard() {
        let at = Vec3::new(1.0, 0.4, 1.0);
        assert!(knockback(at, at, 8.0).is_none());
        // Vertically stacked entities have no horizontal direction either.
        assert!(knockback(at, Vec3::new(1.0, 5.0, 1.0), 8.0).is_none());
    }

    #[test]
    fn test_cooldown_cycle() {
        let mut cd = Cooldown::new();
        assert!(cd.ready());

        cd.trigger(0.5);
        assert!(!cd.ready());

        cd.tick(0.3);
        assert!(!cd.ready());
        cd.tick(0.3);
        assert!(cd.ready());
    }
}
