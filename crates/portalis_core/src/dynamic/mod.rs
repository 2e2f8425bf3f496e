//! # Dynamic Values & Simulation
//!
//! Animatable values, the fixed-step simulation loop and the event queue.

mod animation;
mod events;
mod simulation;
mod value;

pub use animation::{Animation, AnimationCoordinates, AnimationLifetime, DEFAULT_DURATION_MS};
pub use events::{class as event_class, Event, EventClassId, EventConsumer, EventPayload, EventQueue};
pub use simulation::{Simulation, SimulationConfig};
pub use value::{deserialize_angle, Dynamic, DynamicType, DynamicValue};
