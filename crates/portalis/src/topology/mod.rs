//! # Sector Topology
//!
//! World-level passes over the sector graph:
//!
//! - [`auto_portal`]: couples coincident segments, splitting partial overlaps
//! - [`split_sector`]: cuts a sector in two or more along a line
//! - [`update_pvs`]: the per-sector visible sector and light sets
//! - nesting, adjacency indices and internal-wall membership, rebuilt by
//!   [`recalculate_topology`]
//!
//! Sectors refer to each other by entity and segment index. Indices go stale
//! whenever a segment is split or removed; [`realize_adjacency`] re-derives
//! them from the geometry.

mod auto_portal;
mod pvs;
mod splitter;

pub use auto_portal::auto_portal;
pub use pvs::{drain_queue, queue_all, update_pvs, PvsQueue};
pub use splitter::split_sector;

use tracing::{debug, warn};

use portalis_core::{Entity, World};
use portalis_shared::Vec2;

use crate::config::settings;
use crate::geometry::{InternalSegment, Sector};

/// Moves `entity`'s sector out of the world, leaving a default in its slot.
/// Pair with [`put_sector`].
pub(crate) fn take_sector(world: &mut World, entity: Entity) -> Option<Sector> {
    world.get_mut::<Sector>(entity).map(std::mem::take)
}

/// Returns a sector taken with [`take_sector`].
pub(crate) fn put_sector(world: &mut World, entity: Entity, sector: Sector) {
    if let Some(slot) = world.get_mut::<Sector>(entity) {
        *slot = sector;
    }
}

/// Every sector entity, in arena order.
#[must_use]
pub fn sector_entities(world: &World) -> Vec<Entity> {
    world.iter::<Sector>().map(|(e, _)| e).collect()
}

/// Recalculates every sector, then rebuilds adjacency indices, nesting and
/// internal-wall membership.
pub fn recalculate_topology(world: &mut World) {
    let grid = settings(world).light_grid;
    for entity in sector_entities(world) {
        if let Some(sector) = world.get_mut::<Sector>(entity) {
            sector.recalculate_with_grid(grid);
        }
    }
    for entity in world.owners::<InternalSegment>() {
        if let Some(wall) = world.get_mut::<InternalSegment>(entity) {
            wall.recalculate();
        }
    }
    realize_adjacency(world);
    update_nesting(world);
    update_internal_segments(world);
}

/// Re-derives `AdjacentSegment` for every portal.
///
/// Geometric portals pair with the coincident segment of the adjacent
/// sector. Teleporting portals keep their authored index when it is in
/// range. Portals to missing sectors are disconnected.
pub fn realize_adjacency(world: &mut World) {
    let entities = sector_entities(world);
    let mut updates: Vec<(Entity, usize, Option<usize>, bool)> = Vec::new();
    for &entity in &entities {
        let Some(sector) = world.get::<Sector>(entity) else {
            continue;
        };
        for seg in sector.segments.iter().filter(|s| s.is_portal()) {
            let Some(adj) = world.get::<Sector>(seg.adjacent_sector) else {
                warn!(sector = %entity, segment = seg.index, adjacent = %seg.adjacent_sector, "Portal to a missing sector");
                updates.push((entity, seg.index, None, true));
                continue;
            };
            let index = if seg.portal_teleports {
                seg.adjacent_segment.filter(|&i| i < adj.segments.len())
            } else {
                adj.segments
                    .iter()
                    .find(|other| other.segment.matches(&seg.segment))
                    .map(|other| other.index)
            };
            if index.is_none() {
                debug!(sector = %entity, segment = seg.index, "Portal has no paired segment");
            }
            updates.push((entity, seg.index, index, false));
        }
    }
    for (entity, index, adjacent, disconnect) in updates {
        let Some(seg) = world.get_mut::<Sector>(entity).and_then(|s| s.segments.get_mut(index)) else {
            continue;
        };
        if disconnect {
            seg.disconnect();
        } else {
            seg.adjacent_segment = adjacent;
        }
    }
}

/// Signed area of the polygon through `points`.
#[must_use]
pub fn polygon_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        sum += points[i].cross(points[(i + 1) % n]);
    }
    sum * 0.5
}

fn contains_sector(outer: &Sector, inner: &Sector) -> bool {
    if !outer.aabb_intersect_2d(inner.min.to_2d(), inner.max.to_2d(), true) {
        return false;
    }
    let on_boundary = |p: Vec2| {
        outer
            .segments
            .iter()
            .any(|s| s.segment.distance_to_point_squared(p) <= crate::geometry::ON_SEGMENT_EPSILON_SQUARED)
    };
    outer.is_point_inside_2d(inner.center.to_2d())
        && inner
            .segments
            .iter()
            .all(|s| outer.is_point_inside_2d(s.p.now) || on_boundary(s.p.now))
}

/// Rebuilds `Inner`/`Outer`. A sector's outer sector is the smallest sector
/// containing it; its inner sectors are those whose outer sector it is.
pub fn update_nesting(world: &mut World) {
    let entities = sector_entities(world);
    let mut outers: Vec<(Entity, Entity)> = Vec::new();
    for &inner_e in &entities {
        let Some(inner) = world.get::<Sector>(inner_e) else {
            continue;
        };
        let inner_area = sector_area(inner);
        let mut best: Option<(Entity, f64)> = None;
        for &outer_e in &entities {
            if outer_e == inner_e {
                continue;
            }
            let Some(outer) = world.get::<Sector>(outer_e) else {
                continue;
            };
            let area = sector_area(outer);
            if area <= inner_area || !contains_sector(outer, inner) {
                continue;
            }
            if best.map_or(true, |(_, a)| area < a) {
                best = Some((outer_e, area));
            }
        }
        outers.push((inner_e, best.map_or(Entity::NULL, |(e, _)| e)));
    }

    for &entity in &entities {
        if let Some(sector) = world.get_mut::<Sector>(entity) {
            sector.inner.clear();
            sector.outer = Entity::NULL;
        }
    }
    for (inner, outer) in outers {
        if outer.is_null() {
            continue;
        }
        if let Some(sector) = world.get_mut::<Sector>(inner) {
            sector.outer = outer;
        }
        if let Some(sector) = world.get_mut::<Sector>(outer) {
            sector.inner.push(inner);
        }
    }
}

fn sector_area(sector: &Sector) -> f64 {
    let points: Vec<Vec2> = sector.segments.iter().map(|s| s.p.now).collect();
    polygon_area(&points).abs()
}

/// Rebuilds which sectors each internal wall lies within.
pub fn update_internal_segments(world: &mut World) {
    let entities = sector_entities(world);
    for &entity in &entities {
        if let Some(sector) = world.get_mut::<Sector>(entity) {
            sector.internal_segments.clear();
        }
    }
    for wall_e in world.owners::<InternalSegment>() {
        let Some(wall) = world.get::<InternalSegment>(wall_e) else {
            continue;
        };
        let s = wall.segment;
        let probes = [s.a, s.b, s.midpoint()];
        let within: Vec<Entity> = entities
            .iter()
            .copied()
            .filter(|&e| {
                world.get::<Sector>(e).is_some_and(|sector| {
                    sector.aabb_intersect_2d(s.a.min(s.b), s.a.max(s.b), true)
                        && (probes.iter().any(|&p| sector.is_point_inside_2d(p))
                            || sector.segments.iter().any(|seg| seg.segment.intersect_2d(s.a, s.b).is_some()))
                })
            })
            .collect();
        for &e in &within {
            if let Some(sector) = world.get_mut::<Sector>(e) {
                sector.internal_segments.push(wall_e);
            }
        }
        if let Some(wall) = world.get_mut::<InternalSegment>(wall_e) {
            wall.sectors = within;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::sector_from_points;
    use crate::{create_world, EngineConfig};

    fn rect(world: &mut World, x: f64, y: f64, w: f64, h: f64) -> Entity {
        sector_from_points(
            world,
            &[
                Vec2::new(x, y),
                Vec2::new(x + w, y),
                Vec2::new(x + w, y + h),
                Vec2::new(x, y + h),
            ],
        )
    }

    #[test]
    fn test_nesting_picks_smallest_container() {
        let mut world = create_world(EngineConfig::default());
        let big = rect(&mut world, 0.0, 0.0, 100.0, 100.0);
        let mid = rect(&mut world, 10.0, 10.0, 50.0, 50.0);
        let small = rect(&mut world, 20.0, 20.0, 10.0, 10.0);
        update_nesting(&mut world);

        assert_eq!(world.get::<Sector>(small).unwrap().outer, mid);
        assert_eq!(world.get::<Sector>(mid).unwrap().outer, big);
        assert!(world.get::<Sector>(big).unwrap().outer.is_null());
        assert_eq!(world.get::<Sector>(big).unwrap().inner, vec![mid]);
        assert_eq!(world.get::<Sector>(mid).unwrap().inner, vec![small]);
    }

    #[test]
    fn test_adjacency_indices_follow_geometry() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        if let Some(s) = world.get_mut::<Sector>(a) {
            s.segments[1].adjacent_sector = b;
            s.segments[1].adjacent_segment = Some(0);
        }
        if let Some(s) = world.get_mut::<Sector>(b) {
            s.segments[3].adjacent_sector = a;
        }
        realize_adjacency(&mut world);
        assert_eq!(world.get::<Sector>(a).unwrap().segments[1].adjacent_segment, Some(3));
        assert_eq!(world.get::<Sector>(b).unwrap().segments[3].adjacent_segment, Some(1));
    }

    #[test]
    fn test_portal_to_missing_sector_disconnects() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let ghost = world.new_entity();
        if let Some(s) = world.get_mut::<Sector>(a) {
            s.segments[0].adjacent_sector = ghost;
        }
        realize_adjacency(&mut world);
        assert!(!world.get::<Sector>(a).unwrap().segments[0].is_portal());
    }

    #[test]
    fn test_internal_segment_membership() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        let wall = world.new_entity();
        world.attach(wall, InternalSegment::new(Vec2::new(2.0, 5.0), Vec2::new(8.0, 5.0), 0.0, 10.0));
        update_internal_segments(&mut world);
        assert_eq!(world.get::<Sector>(a).unwrap().internal_segments, vec![wall]);
        assert!(world.get::<Sector>(b).unwrap().internal_segments.is_empty());
        assert_eq!(world.get::<InternalSegment>(wall).unwrap().sectors, vec![a]);
    }

    #[test]
    fn test_polygon_area_sign() {
        let ccw = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(0.0, 2.0)];
        assert!((polygon_area(&ccw) - 4.0).abs() < 1e-12);
        let mut cw = ccw;
        cw.reverse();
        assert!((polygon_area(&cw) + 4.0).abs() < 1e-12);
    }
}
