//! # Components
//!
//! Body-side components and the registration of every component type the
//! engine owns. Sector geometry lives in [`crate::geometry`]; the spatial
//! index and visibility queue register from here too so that one call sets a
//! world up.

mod body;
mod light;
mod material;
mod mobile;
mod script;

pub use body::{Body, Player, DEFAULT_BODY_SIZE};
pub use light::Light;
pub use material::Material;
pub use mobile::{CollisionResponse, Mobile};
pub use script::{drain_scripts, queue_scripts, Script, ScriptInvocation, ScriptQueue, ScriptStyle, ScriptTrigger};

use portalis_core::World;

use crate::config::Settings;
use crate::geometry::{InternalSegment, Sector};
use crate::spatial::Quadtree;
use crate::topology::PvsQueue;

/// Registers every engine component type with `world`. Registering twice is
/// harmless.
pub fn register_components(world: &mut World) {
    world.register_component::<Sector>();
    world.register_component::<InternalSegment>();
    world.register_component::<Body>();
    world.register_component::<Mobile>();
    world.register_component::<Light>();
    world.register_component::<Player>();
    world.register_component::<Material>();
    world.register_component::<Script>();
    world.register_component::<ScriptQueue>();
    world.register_component::<Quadtree>();
    world.register_component::<PvsQueue>();
    world.register_component::<Settings>();
}
