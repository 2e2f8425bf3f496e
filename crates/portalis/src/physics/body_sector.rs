//! Sector membership of bodies.

use tracing::{debug, warn};

use portalis_core::dynamic::{event_class, EventPayload};
use portalis_core::{Entity, World};
use portalis_shared::{Vec2, Vec3};

use crate::components::{queue_scripts, Body, ScriptTrigger};
use crate::geometry::Sector;

/// Where a body belongs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// The containing sector.
    pub sector: Entity,
    /// The body centre, moved onto the sector if it was outside every
    /// sector and clamped between floor and ceiling.
    pub pos: Vec3,
    /// Whether the body had to be moved in XY.
    pub snapped: bool,
}

/// Picks the sector for a body centred at `pos`.
///
/// Among containing sectors the highest `layer` wins. A point outside every
/// sector is moved to the closest point of the closest segment.
///
/// # Returns
///
/// `None` only for a world without sectors.
#[must_use]
pub fn locate_sector(world: &World, pos: Vec3, half_height: f64) -> Option<Placement> {
    let p = pos.to_2d();
    let mut best: Option<(Entity, i32)> = None;
    for (entity, sector) in world.iter::<Sector>() {
        if !sector.is_point_inside_2d(p) {
            continue;
        }
        if best.map_or(true, |(_, layer)| sector.layer > layer) {
            best = Some((entity, sector.layer));
        }
    }

    let (entity, mut pos, snapped) = match best {
        Some((entity, _)) => (entity, pos, false),
        None => {
            let mut closest: Option<(Entity, Vec2, f64)> = None;
            for (entity, sector) in world.iter::<Sector>() {
                for seg in &sector.segments {
                    let d = seg.segment.distance_to_point_squared(p);
                    if closest.map_or(true, |(_, _, best)| d < best) {
                        closest = Some((entity, seg.segment.closest_to_point(p), d));
                    }
                }
            }
            let (entity, q, _) = closest?;
            (entity, q.to_3d(pos.z), true)
        }
    };

    let sector = world.get::<Sector>(entity)?;
    let (floor, ceil) = sector.z_at(pos.to_2d());
    if pos.z - half_height < floor {
        pos.z = floor + half_height;
    }
    if pos.z + half_height > ceil {
        pos.z = ceil - half_height;
    }
    Some(Placement {
        sector: entity,
        pos,
        snapped,
    })
}

/// Moves `body` from sector `from` to sector `to`: updates both body sets
/// and the body's `sector_entity`, queues exit and enter scripts and emits
/// the matching events. Either side may be null.
pub fn move_between_sectors(world: &mut World, body: Entity, from: Entity, to: Entity) {
    if from == to {
        return;
    }
    if let Some(sector) = world.get_mut::<Sector>(from) {
        sector.bodies.remove(&body);
        let scripts = sector.exit_scripts.clone();
        queue_scripts(world, &scripts, ScriptTrigger::Exit, body, from, Entity::NULL);
        world.emit(event_class::BODY_EXITED_SECTOR, EventPayload::Pair(body, from));
    }
    let entered = match world.get_mut::<Sector>(to) {
        Some(sector) => {
            sector.bodies.insert(body);
            let scripts = sector.enter_scripts.clone();
            queue_scripts(world, &scripts, ScriptTrigger::Enter, body, to, Entity::NULL);
            world.emit(event_class::BODY_ENTERED_SECTOR, EventPayload::Pair(body, to));
            to
        }
        None => {
            if !to.is_null() {
                warn!(%body, sector = %to, "Body tried to enter an entity without a sector");
            }
            Entity::NULL
        }
    };
    if let Some(b) = world.get_mut::<Body>(body) {
        b.sector_entity = entered;
    }
    debug!(%body, %from, to = %entered, "Body changed sector");
}

/// Makes sure `body` is in a sector, moving it there if it is outside every
/// sector.
///
/// # Returns
///
/// The body's sector, or `None` if the world has no sectors.
pub fn find_body_sector(world: &mut World, body: Entity) -> Option<Entity> {
    let (pos, half_height, current) = {
        let b = world.get::<Body>(body)?;
        (b.pos.now, b.half_height(), b.sector_entity)
    };
    let still_inside = world
        .get::<Sector>(current)
        .is_some_and(|s| s.is_point_inside_2d(pos.to_2d()));
    if still_inside {
        return Some(current);
    }

    let placement = locate_sector(world, pos, half_height)?;
    if placement.snapped {
        warn!(%body, x = pos.x, y = pos.y, sector = %placement.sector, "Body outside every sector, snapped to the nearest wall");
    }
    if let Some(b) = world.get_mut::<Body>(body) {
        b.pos.now = placement.pos;
    }
    move_between_sectors(world, body, current, placement.sector);
    Some(placement.sector)
}
