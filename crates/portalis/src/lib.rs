//! # PORTALIS
//!
//! The sector engine runtime, built on the `portalis_core` entity store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           PORTALIS ENGINE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │   geometry      │────>│   topology      │────>│   spatial       │   │
//! │  │                 │     │                 │     │                 │   │
//! │  │  • Sectors      │     │  • Portals      │     │  • Quadtree     │   │
//! │  │  • Planes       │     │  • Splitting    │     │  • Ray casts    │   │
//! │  │  • Lightmaps    │     │  • PVS / PVL    │     │                 │   │
//! │  └────────┬────────┘     └─────────────────┘     └────────┬────────┘   │
//! │           │                                               │            │
//! │           │              ┌─────────────────┐              │            │
//! │           └─────────────>│   physics       │<─────────────┘            │
//! │                          │                 │                           │
//! │                          │  • Forces       │                           │
//! │                          │  • Collision    │                           │
//! │                          │  • Pathfinding  │                           │
//! │                          └─────────────────┘                           │
//! │                                                                         │
//! │   persistence: YAML world files    controllers: per-phase behaviour    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use portalis::{create_world, persistence, EngineConfig};
//!
//! let mut world = create_world(EngineConfig::default());
//! persistence::load_file(&mut world, "worlds/hall.yaml")?;
//! world.step(16.0);
//! ```

mod serde_helpers;

pub mod archetypes;
pub mod components;
pub mod config;
pub mod controllers;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod geometry;
pub mod pathfinding;
pub mod persistence;
pub mod physics;
pub mod spatial;
pub mod topology;

pub use portalis_core as core;
pub use portalis_shared as shared;

pub use config::EngineConfig;
pub use error::{ConfigError, LoadError, SaveError};
pub use events::{EngineEvent, EventBus, EventReceiver, EventSender};
pub use game_loop::{FrameStats, GameLoop, GameLoopConfig};

use portalis_core::World;

/// Creates a world with every engine component and controller registered
/// and `config` installed.
#[must_use]
pub fn create_world(config: EngineConfig) -> World {
    let mut world = World::with_config(config.simulation());
    components::register_components(&mut world);
    config::install_settings(&mut world, config);
    controllers::register_all(&mut world);
    tracing::debug!(controllers = world.controller_count(), "Created world");
    world
}
