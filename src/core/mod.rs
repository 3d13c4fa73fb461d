//! Math primitives shared by the prediction layer.

pub mod vec3;

pub use vec3::Vec3;
