//! Input Sampling
//!
//! Captures keyboard/pointer state fed in by the embedding host and folds it
//! into one intent snapshot per frame. Movement and attack are
//! level-triggered; jump and the special ability fire on the rising edge
//! only, so holding the key does not retrigger them.

use std::collections::HashSet;

/// Keys the simulation cares about. Anything else never reaches the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Move forward
    W,
    /// Move left
    A,
    /// Move backward
    S,
    /// Move right
    D,
    /// Move forward (arrow)
    ArrowUp,
    /// Move backward (arrow)
    ArrowDown,
    /// Move left (arrow)
    ArrowLeft,
    /// Move right (arrow)
    ArrowRight,
    /// Jump
    Space,
    /// Special ability
    E,
}

/// One frame's worth of player intent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntentFrame {
    /// Horizontal movement on X: -1 (left), 0, or +1 (right)
    pub move_x: f32,
    /// Horizontal movement on Z: -1 (forward), 0, or +1 (backward)
    pub move_z: f32,
    /// Jump requested this frame (rising edge)
    pub jump: bool,
    /// Attack requested (pointer held; cooldown gating is the controller's job)
    pub attack: bool,
    /// Special ability requested this frame (rising edge)
    pub special: bool,
    /// Raw pointer-down level state
    pub pointer_down: bool,
}

impl IntentFrame {
    /// Whether any movement is requested.
    pub fn has_movement(&self) -> bool {
        self.move_x != 0.0 || self.move_z != 0.0
    }
}

/// Accumulates raw key/pointer transitions between frames.
#[derive(Default)]
pub struct InputSampler {
    held: HashSet<KeyCode>,
    pointer_down: bool,
    jump_was_held: bool,
    special_was_held: bool,
}

impl InputSampler {
    /// Create a sampler with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press.
    pub fn key_down(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    /// Record a key release.
    pub fn key_up(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    /// Record pointer button press.
    pub fn pointer_down(&mut self) {
        self.pointer_down = true;
    }

    /// Record pointer button release.
    pub fn pointer_up(&mut self) {
        self.pointer_down = false;
    }

    /// Whether a key is currently held.
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Fold current state into this frame's intent snapshot and advance the
    /// edge-trigger bookkeeping.
    pub fn sample(&mut self) -> IntentFrame {
        let right = self.is_pressed(KeyCode::D) || self.is_pressed(KeyCode::ArrowRight);
        let left = self.is_pressed(KeyCode::A) || self.is_pressed(KeyCode::ArrowLeft);
        let back = self.is_pressed(KeyCode::S) || self.is_pressed(KeyCode::ArrowDown);
        let forward = self.is_pressed(KeyCode::W) || self.is_pressed(KeyCode::ArrowUp);

        let move_x = (right as i8 - left as i8) as f32;
        let move_z = (back as i8 - forward as i8) as f32;

        let jump_held = self.is_pressed(KeyCode::Space);
        let special_held = self.is_pressed(KeyCode::E);

        let frame = IntentFrame {
            move_x,
            move_z,
            jump: jump_held && !self.jump_was_held,
            attack: self.pointer_down,
            special: special_held && !self.special_was_held,
            pointer_down: self.pointer_down,
        };

        self.jump_was_held = jump_held;
        self.special_was_held = special_held;

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_vector() {
        let mut sampler = InputSampler::new();
        sampler.key_down(KeyCode::D);
        sampler.key_down(KeyCode::W);

        let frame = sampler.sample();
        assert_eq!(frame.move_x, 1.0);
        assert_eq!(frame.move_z, -1.0);

        // Opposite keys cancel out.
        sampler.key_down(KeyCode::A);
        let frame = sampler.sample();
        assert_eq!(frame.move_x, 0.0);
    }

    #[test]
    fn test_arrow_keys_alias_wasd() {
        let mut sampler = InputSampler::new();
        sampler.key_down(KeyCode::ArrowLeft);
        sampler.key_down(KeyCode::ArrowDown);

        let frame = sampler.sample();
        assert_eq!(frame.move_x, -1.0);
        assert_eq!(frame.move_z, 1.0);
    }

    #[test]
    fn test_jump_is_edge_triggered() {
        let mut sampler = InputSampler::new();
        sampler.key_down(KeyCode::Space);

        assert!(sampler.sample().jump);
        // Still held: no retrigger.
        assert!(!sampler.sample().jump);

        sampler.key_up(KeyCode::Space);
        assert!(!sampler.sample().jump);

        sampler.key_down(KeyCode::Space);
        assert!(sampler.sample().jump);
    }

    #[test]
    fn test_attack_is_level_triggered() {
        let mut sampler = InputSampler::new();
        sampler.pointer_down();

        assert!(sampler.sample().attack);
        // Held pointer keeps requesting attacks; the cooldown gates them.
        assert!(sampler.sample().attack);

        sampler.pointer_up();
        assert!(!sampler.sample().attack);
    }
}
