//! # PORTALIS Shared
//!
//! Math, tweening curves and constants used by the ECS core and the world
//! engine alike.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on the ECS. Anything that needs an entity
//! handle belongs in `portalis_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod intersect;
pub mod math;
pub mod tween;

pub use math::{Matrix2, Vec2, Vec3, Vec4};
pub use tween::Tween;
