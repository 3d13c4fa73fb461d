//! Local Simulation
//!
//! The prediction layer: physics integration, input sampling, combat rules,
//! fill-in bots, and the per-frame controller tying them together. Nothing
//! in here talks to the network; results flow into the reconciliation store
//! and outbound intents are handed to the embedding host.

pub mod bots;
pub mod combat;
pub mod controller;
pub mod input;
pub mod physics;

pub use controller::{GameController, OutboundIntent};
pub use input::{InputSampler, IntentFrame, KeyCode};
pub use physics::{KinematicBody, PhysicsWorld};
