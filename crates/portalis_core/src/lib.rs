//! # PORTALIS Core
//!
//! The entity store and simulation kernel of the engine:
//! - Entities as 32-bit handles partitioned by source file
//! - Components in chunked arenas with stable indices
//! - Stateless controllers dispatched per phase and priority
//! - Animated, render-blended dynamic values on a fixed time step
//!
//! ## Architecture Rules
//!
//! 1. **Explicit context** - every operation takes a [`World`]
//! 2. **Stable addressing** - a component's arena slot never moves
//! 3. **Shared, not copied** - shareable components are reference-counted
//!
//! ## Example
//!
//! ```rust,ignore
//! use portalis_core::{Named, World};
//!
//! let mut world = World::new();
//! let door = world.new_entity();
//! world.attach(door, Named::new("door"));
//! world.step(16.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod dynamic;
pub mod ecs;
pub mod error;
pub mod memory;

use std::sync::Arc;

use parking_lot::RwLock;

pub use dynamic::{Animation, AnimationLifetime, Dynamic, DynamicValue, Simulation, SimulationConfig};
pub use ecs::{
    Base, Component, ComponentFlags, ComponentId, Controller, ControllerMethod, Entity, Named,
    SourceFile, World,
};
pub use error::{EcsError, EcsResult};
pub use memory::{AnyArena, ComponentArena, EntityPool};

/// A world shared between the simulation thread and readers.
pub type SharedWorld = Arc<RwLock<World>>;

/// Wraps `world` for sharing.
#[must_use]
pub fn share(world: World) -> SharedWorld {
    Arc::new(RwLock::new(world))
}
