//! # Entity Component System
//!
//! Entities are bare handles; components are plain data stored in per-type
//! arenas; controllers are stateless behaviour dispatched by the world.
//!
//! ## Design Philosophy
//!
//! - One explicit [`World`] per simulation, no global state
//! - Components are addressed by `(type, arena index)` and never move
//! - Shareable components are reference-counted, never copied
//! - Type erasure only at the registry seam ([`AnyArena`](crate::memory::AnyArena))

mod component;
mod component_table;
mod controller;
mod entity;
mod flags;
mod named;
mod registry;
mod source_file;
mod world;

pub use component::{Base, Component, ComponentId};
pub use component_table::ComponentTable;
pub use controller::{Controller, ControllerMethod};
pub use entity::{Entity, EntitySourceId, LOCAL_BITS, LOCAL_MASK, MAX_SOURCES, SOURCE_BITS};
pub use flags::ComponentFlags;
pub use named::Named;
pub use registry::{ComponentRegistry, ComponentType};
pub use source_file::SourceFile;
pub use world::World;
