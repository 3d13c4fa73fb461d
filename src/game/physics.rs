//! Prediction Physics
//!
//! Kinematic integration for the local prediction layer: gravity, ground
//! contact, friction, and pairwise elastic collision resolution. This step
//! never fails; degenerate inputs (zero distance pairs) are skipped.
//!
//! Uses BTreeMap so bodies are visited in a stable order.

use std::collections::BTreeMap;

use crate::core::vec3::Vec3;

/// Downward gravity acceleration (units/s^2).
pub const GRAVITY: f32 = -9.81;

/// Multiplicative horizontal damping while grounded.
pub const GROUND_FRICTION: f32 = 0.95;

/// Multiplicative horizontal damping while airborne.
pub const AIR_FRICTION: f32 = 0.99;

/// Ground plane height.
pub const GROUND_LEVEL: f32 = 0.0;

/// Largest time delta a single step will integrate. Frame hitches beyond
/// this are clamped so displacement stays bounded.
pub const MAX_STEP_SECONDS: f32 = 1.0 / 30.0;

/// Restitution coefficient for body-vs-body impacts.
pub const RESTITUTION: f32 = 0.8;

/// Pairwise collision resolution is skipped above this body count; the
/// O(n^2) sweep is only affordable for small arenas.
pub const COLLISION_BODY_CEILING: usize = 20;

/// Default collision radius for player-sized bodies.
pub const PLAYER_RADIUS: f32 = 0.4;

/// Default mass for player-sized bodies.
pub const PLAYER_MASS: f32 = 1.0;

/// Kinematic state of one simulated body.
#[derive(Clone, Copy, Debug)]
pub struct KinematicBody {
    /// World position
    pub position: Vec3,
    /// Velocity (units/s)
    pub velocity: Vec3,
    /// Accumulated acceleration for this step; cleared after integration
    pub acceleration: Vec3,
    /// Collision radius
    pub radius: f32,
    /// Mass (must be positive)
    pub mass: f32,
    /// Whether the body rested on the ground after the last step
    pub grounded: bool,
}

impl KinematicBody {
    /// Create a player-sized body at rest at `position`.
    pub fn player_at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            radius: PLAYER_RADIUS,
            mass: PLAYER_MASS,
            grounded: false,
        }
    }
}

/// Container stepping a set of bodies forward in time.
#[derive(Default)]
pub struct PhysicsWorld {
    bodies: BTreeMap<String, KinematicBody>,
}

impl PhysicsWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a body.
    pub fn insert(&mut self, id: impl Into<String>, body: KinematicBody) {
        self.bodies.insert(id.into(), body);
    }

    /// Remove a body. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &str) {
        self.bodies.remove(id);
    }

    /// Look up a body.
    pub fn get(&self, id: &str) -> Option<&KinematicBody> {
        self.bodies.get(id)
    }

    /// Look up a body mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut KinematicBody> {
        self.bodies.get_mut(id)
    }

    /// Whether a body with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.bodies.contains_key(id)
    }

    /// Number of simulated bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world has no bodies.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Ids of all simulated bodies.
    pub fn ids(&self) -> Vec<String> {
        self.bodies.keys().cloned().collect()
    }

    /// Add a continuous force (divided by mass into acceleration).
    pub fn apply_force(&mut self, id: &str, force: Vec3) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.acceleration += force * (1.0 / body.mass);
        }
    }

    /// Add an instantaneous impulse (divided by mass into velocity).
    pub fn apply_impulse(&mut self, id: &str, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.velocity += impulse * (1.0 / body.mass);
        }
    }

    /// Advance every body by `dt` seconds (clamped to [`MAX_STEP_SECONDS`]),
    /// then resolve pairwise collisions while the body count is small.
    pub fn step(&mut self, dt: f32) {
        let dt = dt.min(MAX_STEP_SECONDS);

        for body in self.bodies.values_mut() {
            integrate(body, dt);
        }

        if self.bodies.len() <= COLLISION_BODY_CEILING {
            self.resolve_collisions();
        }
    }

    fn resolve_collisions(&mut self) {
        let ids: Vec<String> = self.bodies.keys().cloned().collect();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (Some(a), Some(b)) = (
                    self.bodies.get(&ids[i]).copied(),
                    self.bodies.get(&ids[j]).copied(),
                ) else {
                    continue;
                };

                if let Some((a, b)) = resolve_pair(a, b) {
                    self.bodies.insert(ids[i].clone(), a);
                    self.bodies.insert(ids[j].clone(), b);
                }
            }
        }
    }
}

/// Integrate one body forward by `dt`.
fn integrate(body: &mut KinematicBody, dt: f32) {
    body.acceleration.y += GRAVITY;

    body.position += body.velocity * dt;
    body.velocity += body.acceleration * dt;

    if body.position.y <= GROUND_LEVEL + body.radius {
        body.position.y = GROUND_LEVEL + body.radius;
        body.velocity.y = 0.0;
        body.grounded = true;

        body.velocity.x *= GROUND_FRICTION;
        body.velocity.z *= GROUND_FRICTION;
    } else {
        body.grounded = false;
        body.velocity.x *= AIR_FRICTION;
        body.velocity.z *= AIR_FRICTION;
    }

    // Forces are not persistent across steps.
    body.acceleration = Vec3::ZERO;
}

/// Resolve a single overlapping pair.
///
/// Returns the updated pair, or `None` when the bodies do not overlap, are
/// already separating, or are exactly coincident (distance 0 has no usable
/// contact normal).
pub fn resolve_pair(
    mut a: KinematicBody,
    mut b: KinematicBody,
) -> Option<(KinematicBody, KinematicBody)> {
    let delta = b.position - a.position;
    let distance = delta.length();
    let min_distance = a.radius + b.radius;

    if distance >= min_distance || distance == 0.0 {
        return None;
    }

    let normal = delta * (1.0 / distance);

    let relative = b.velocity - a.velocity;
    let approach = relative.dot(normal);
    if approach >= 0.0 {
        return None;
    }

    let impulse_scalar = -(1.0 + RESTITUTION) * approach / (1.0 / a.mass + 1.0 / b.mass);
    let impulse = normal * impulse_scalar;

    a.velocity -= impulse * (1.0 / a.mass);
    b.velocity += impulse * (1.0 / b.mass);

    // Push the pair apart so no residual overlap survives the step.
    let overlap = min_distance - distance;
    let separation = normal * (overlap / 2.0);
    a.position -= separation;
    b.position += separation;

    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ground_clamp_and_friction() {
        let mut world = PhysicsWorld::new();
        let mut body = KinematicBody::player_at(Vec3::new(0.0, 5.0, 0.0));
        body.velocity = Vec3::new(2.0, 0.0, 0.0);
        world.insert("p", body);

        // Fall to the ground.
        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }

        let body = world.get("p").unwrap();
        assert!(body.grounded);
        assert!((body.position.y - (GROUND_LEVEL + body.radius)).abs() < 1e-6);
        assert_eq!(body.velocity.y, 0.0);
        // Ground friction has bled the horizontal velocity off.
        assert!(body.velocity.x.abs() < 0.01);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut world = PhysicsWorld::new();
        let mut body = KinematicBody::player_at(Vec3::new(0.0, 0.4, 0.0));
        body.velocity = Vec3::new(30.0, 0.0, 0.0);
        world.insert("p", body);

        // A 2-second hitch must integrate as at most 1/30 s.
        world.step(2.0);

        let body = world.get("p").unwrap();
        assert!(body.position.x <= 30.0 * MAX_STEP_SECONDS + 1e-4);
    }

    #[test]
    fn test_head_on_collision_reverses_and_separates() {
        let mut a = KinematicBody::player_at(Vec3::new(0.0, 0.4, 0.0));
        a.velocity = Vec3::new(2.0, 0.0, 0.0);
        let mut b = KinematicBody::player_at(Vec3::new(0.6, 0.4, 0.0));
        b.velocity = Vec3::new(-2.0, 0.0, 0.0);

        let (a, b) = resolve_pair(a, b).expect("overlapping pair must resolve");

        // Velocities reverse sign on the collision axis.
        assert!(a.velocity.x < 0.0);
        assert!(b.velocity.x > 0.0);

        // No residual overlap.
        let separation = a.position.distance(b.position);
        assert!(separation >= a.radius + b.radius - 1e-5);
    }

    #[test]
    fn test_separating_pair_untouched() {
        let mut a = KinematicBody::player_at(Vec3::new(0.0, 0.4, 0.0));
        a.velocity = Vec3::new(-1.0, 0.0, 0.0);
        let mut b = KinematicBody::player_at(Vec3::new(0.5, 0.4, 0.0));
        b.velocity = Vec3::new(1.0, 0.0, 0.0);

        assert!(resolve_pair(a, b).is_none());
    }

    #[test]
    fn test_coincident_pair_skipped() {
        let a = KinematicBody::player_at(Vec3::new(1.0, 0.4, 1.0));
        let b = KinematicBody::player_at(Vec3::new(1.0, 0.4, 1.0));

        assert!(resolve_pair(a, b).is_none());
    }

    #[test]
    fn test_forces_reset_each_step() {
        let mut world = PhysicsWorld::new();
        world.insert("p", KinematicBody::player_at(Vec3::new(0.0, 0.4, 0.0)));

        world.apply_force("p", Vec3::new(15.0, 0.0, 0.0));
        world.step(1.0 / 60.0);
        let vx_after_push = world.get("p").unwrap().velocity.x;
        assert!(vx_after_push > 0.0);

        world.step(1.0 / 60.0);
        // No force this step, so velocity only decays.
        assert!(world.get("p").unwrap().velocity.x <= vx_after_push);
        assert_eq!(world.get("p").unwrap().acceleration, Vec3::ZERO);
    }

    proptest! {
        /// For any step sequence with dt <= 1/30 s, a body never ends a
        /// step below ground level + radius.
        #[test]
        fn prop_never_below_ground(
            start_y in 0.4f32..50.0,
            vy in -20.0f32..20.0,
            deltas in proptest::collection::vec(0.0001f32..(1.0 / 30.0), 1..120),
        ) {
            let mut world = PhysicsWorld::new();
            let mut body = KinematicBody::player_at(Vec3::new(0.0, start_y, 0.0));
            body.velocity.y = vy;
            world.insert("p", body);

            for dt in deltas {
                world.step(dt);
                let body = world.get("p").unwrap();
                prop_assert!(body.position.y >= GROUND_LEVEL + body.radius - 1e-5);
            }
        }
    }
}
