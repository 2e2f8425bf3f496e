//! # Spatial Queries
//!
//! The body quadtree and ray traversal through the sector graph.
//!
//! The quadtree lives in the world as a singleton component and stores
//! copies of body positions, so queries never borrow body components.

mod cast;
mod quadtree;

pub use cast::{cast, CastHit, CastOptions, CastOutcome, HitTarget, Ray, WallPart};
pub use quadtree::{QuadItem, Quadtree};

use portalis_core::{Component, Entity, World};

use crate::components::{Body, Light};
use crate::config::settings;

/// Snapshot of `entity`'s body as stored in the index.
#[must_use]
pub fn quad_item(world: &World, entity: Entity) -> Option<QuadItem> {
    let body = world.get::<Body>(entity)?;
    Some(QuadItem {
        entity,
        pos: body.pos.now,
        radius: body.radius(),
        half_height: body.half_height(),
        is_light: world.has::<Light>(entity),
    })
}

/// Rebuilds the index from every active body.
pub fn rebuild_quadtree(world: &mut World) {
    let init_dim = settings(world).quadtree_init_dim;
    let items: Vec<QuadItem> = world
        .iter::<Body>()
        .filter(|(_, b)| b.base().is_active())
        .filter_map(|(e, _)| quad_item(world, e))
        .collect();
    let Some(tree) = world.singleton::<Quadtree>() else {
        return;
    };
    *tree = Quadtree::new(init_dim);
    for item in items {
        tree.insert(item);
    }
    tracing::debug!(bodies = tree.len(), nodes = tree.node_count(), "Rebuilt quadtree");
}

/// Moves `entity` to its current position in the index, inserting it if
/// needed.
pub fn update_body(world: &mut World, entity: Entity) {
    let Some(item) = quad_item(world, entity) else {
        return;
    };
    if let Some(tree) = world.singleton::<Quadtree>() {
        tree.update(item);
    }
}

/// Drops `entity` from the index.
pub fn remove_body(world: &mut World, entity: Entity) {
    if let Some(tree) = world.singleton::<Quadtree>() {
        tree.remove(entity);
    }
}

/// The world's quadtree, if one has been built.
#[must_use]
pub fn quadtree(world: &World) -> Option<&Quadtree> {
    world.first::<Quadtree>().map(|(_, q)| q)
}
