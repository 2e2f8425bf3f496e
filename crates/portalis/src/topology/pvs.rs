//! Potentially visible sets.
//!
//! A sector's PVS is every sector reachable through portals that is not
//! culled by height or hidden behind a solid wall. Its PVL collects the
//! light-bearing bodies of those sectors, plus those of every sector reached
//! through portals that face the same way as the first portal crossed, with
//! no occlusion test. Rebuilding is queued and drained a few sectors per
//! step.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use portalis_core::{component_base, Base, Component, ComponentFlags, Entity, World};
use portalis_shared::intersect::intersect_segments;
use portalis_shared::{Vec2, Vec3};

use super::sector_entities;
use crate::components::Light;
use crate::geometry::Sector;

/// Sectors waiting for a visibility rebuild.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PvsQueue {
    #[serde(flatten)]
    base: Base,
    #[serde(skip)]
    pending: VecDeque<Entity>,
}

impl Component for PvsQueue {
    const NAME: &'static str = "core.PvsQueue";
    const DEFAULT_FLAGS: ComponentFlags = ComponentFlags::INTERNAL;
    component_base!();
}

impl PvsQueue {
    /// Queues `sector` unless it is already waiting.
    pub fn push(&mut self, sector: Entity) {
        if !self.pending.contains(&sector) {
            self.pending.push_back(sector);
        }
    }

    /// The next sector to rebuild.
    pub fn pop(&mut self) -> Option<Entity> {
        self.pending.pop_front()
    }

    /// Number of waiting sectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Queues every sector of `world` for a rebuild.
pub fn queue_all(world: &mut World) {
    let sectors = sector_entities(world);
    if let Some(queue) = world.singleton::<PvsQueue>() {
        for sector in sectors {
            queue.push(sector);
        }
    }
}

/// Rebuilds up to `budget` queued sectors.
///
/// # Returns
///
/// The number rebuilt.
pub fn drain_queue(world: &mut World, budget: usize) -> usize {
    let mut done = 0;
    while done < budget {
        let Some(sector) = world.singleton::<PvsQueue>().and_then(PvsQueue::pop) else {
            break;
        };
        update_pvs(world, sector);
        done += 1;
    }
    done
}

/// A solid wall: endpoints of a segment that is not a portal.
type Wall = (Vec2, Vec2);

struct Walk<'w> {
    world: &'w World,
    target_entity: Entity,
    target: &'w Sector,
    walls: Vec<Wall>,
    visited: BTreeSet<Entity>,
    pvs: Vec<Entity>,
    pvl: Vec<Entity>,
}

impl Walk<'_> {
    fn collect_lights(&mut self, sector: &Sector) {
        for &body in &sector.bodies {
            if self.world.has::<Light>(body) && !self.pvl.contains(&body) {
                self.pvl.push(body);
            }
        }
    }

    /// Whether every portal of the target sector is cut off from the
    /// adjacent segment `(a, b)` by one solid wall.
    fn blocked(&self, a: Vec2, b: Vec2) -> bool {
        let mut blocked = true;
        for portal in self.target.segments.iter().filter(|s| s.is_portal()) {
            let (ta, tb) = (portal.segment.a, portal.segment.b);
            blocked = self.walls.iter().any(|&(wa, wb)| {
                intersect_segments(ta, a, wa, wb).is_some()
                    && intersect_segments(tb, b, wa, wb).is_some()
                    && intersect_segments(ta, b, wa, wb).is_some()
                    && intersect_segments(tb, a, wa, wb).is_some()
            });
            if !blocked {
                break;
            }
        }
        blocked
    }

    fn visit(&mut self, visitor_e: Entity, visitor: &Sector, min: Vec3, max: Vec3) {
        self.collect_lights(visitor);
        for seg in visitor.segments.iter().filter(|s| s.is_portal()) {
            if self.visited.contains(&seg.adjacent_sector) {
                continue;
            }
            let Some(adj) = self.world.get::<Sector>(seg.adjacent_sector) else {
                continue;
            };
            if adj.max.z <= min.z || adj.min.z >= max.z {
                continue;
            }
            let Some(adj_seg) = seg.adjacent_segment.and_then(|i| adj.segments.get(i)) else {
                continue;
            };
            if visitor_e != self.target_entity && self.blocked(adj_seg.segment.a, adj_seg.segment.b) {
                continue;
            }
            let narrowed_min = Vec3::new(min.x, min.y, min.z.max(adj.min.z));
            let narrowed_max = Vec3::new(max.x, max.y, max.z.min(adj.max.z));
            self.visited.insert(seg.adjacent_sector);
            self.pvs.push(seg.adjacent_sector);
            self.visit(seg.adjacent_sector, adj, narrowed_min, narrowed_max);
        }
    }
}

/// Collects lights through open portals whose normal does not turn back
/// against `normal`, the normal of the first portal crossed.
fn walk_lights(
    world: &World,
    visitor: &Sector,
    normal: Option<Vec2>,
    reached: &mut BTreeSet<Entity>,
    pvl: &mut Vec<Entity>,
) {
    for &body in &visitor.bodies {
        if world.has::<Light>(body) && !pvl.contains(&body) {
            pvl.push(body);
        }
    }
    for seg in visitor.segments.iter().filter(|s| s.is_portal()) {
        if normal.is_some_and(|n| n.dot(seg.segment.normal) < 0.0) || reached.contains(&seg.adjacent_sector) {
            continue;
        }
        let Some(adj) = world.get::<Sector>(seg.adjacent_sector) else {
            continue;
        };
        let open = seg
            .adjacent_segment
            .and_then(|i| adj.segments.get(i))
            .is_some_and(|s| !s.portal_has_material);
        if !open {
            continue;
        }
        reached.insert(seg.adjacent_sector);
        walk_lights(world, adj, normal.or(Some(seg.segment.normal)), reached, pvl);
    }
}

/// Rebuilds the visible sectors and lights of `sector`.
pub fn update_pvs(world: &mut World, sector: Entity) {
    let view: &World = world;
    let Some(target) = view.get::<Sector>(sector) else {
        return;
    };
    let walls: Vec<Wall> = view
        .iter::<Sector>()
        .flat_map(|(_, s)| s.segments.iter())
        .filter(|s| !s.is_portal())
        .map(|s| (s.segment.a, s.segment.b))
        .collect();

    let mut walk = Walk {
        world: view,
        target_entity: sector,
        target,
        walls,
        visited: BTreeSet::from([sector]),
        pvs: vec![sector],
        pvl: Vec::new(),
    };
    walk.visit(sector, target, target.min, target.max);
    let (pvs, mut pvl) = (walk.pvs, walk.pvl);
    walk_lights(view, target, None, &mut BTreeSet::from([sector]), &mut pvl);
    debug!(%sector, visible = pvs.len(), lights = pvl.len(), "Rebuilt PVS");

    if let Some(target) = world.get_mut::<Sector>(sector) {
        target.pvs = pvs;
        target.pvl = pvl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::{light_body, sector_from_points};
    use crate::topology::auto_portal;
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
    fn test_row_is_mutually_visible() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        let c = rect(&mut world, 20.0, 0.0, 10.0, 10.0);
        auto_portal(&mut world);
        update_pvs(&mut world, a);
        assert_eq!(world.get::<Sector>(a).unwrap().pvs, vec![a, b, c]);
    }

    #[test]
    fn test_height_culls_sealed_neighbour() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        auto_portal(&mut world);
        if let Some(s) = world.get_mut::<Sector>(b) {
            s.bottom.z.set_all(100.0);
            s.top.z.set_all(140.0);
            s.recalculate();
        }
        update_pvs(&mut world, a);
        assert_eq!(world.get::<Sector>(a).unwrap().pvs, vec![a]);
    }

    #[test]
    fn test_lights_collected() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        auto_portal(&mut world);
        let lamp = light_body(&mut world, Vec3::new(15.0, 5.0, 30.0), Light::default());
        if let Some(s) = world.get_mut::<Sector>(b) {
            s.bodies.insert(lamp);
        }
        update_pvs(&mut world, a);
        assert_eq!(world.get::<Sector>(a).unwrap().pvl, vec![lamp]);
    }

    /// Sectors `[s, b, c, d, e]` of a corridor that runs right from `s` and
    /// then turns up at `c`. The wall left of `d` hides `e` from `s`.
    fn corridor_with_corner(world: &mut World) -> [Entity; 5] {
        let s = rect(world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(world, 10.0, 0.0, 10.0, 10.0);
        let c = rect(world, 20.0, 0.0, 10.0, 10.0);
        let d = rect(world, 20.0, 10.0, 10.0, 10.0);
        let e = rect(world, 20.0, 20.0, 10.0, 10.0);
        auto_portal(world);
        [s, b, c, d, e]
    }

    #[test]
    fn test_wall_occludes_sector_around_corner() {
        let mut world = create_world(EngineConfig::default());
        let [s, b, c, d, e] = corridor_with_corner(&mut world);
        update_pvs(&mut world, s);
        let pvs = &world.get::<Sector>(s).unwrap().pvs;
        assert_eq!(*pvs, vec![s, b, c, d]);
        assert!(!pvs.contains(&e));
    }

    #[test]
    fn test_lights_reach_past_occluded_portal() {
        let mut world = create_world(EngineConfig::default());
        let [s, _, _, _, e] = corridor_with_corner(&mut world);
        let lamp = light_body(&mut world, Vec3::new(25.0, 25.0, 30.0), Light::default());
        if let Some(sector) = world.get_mut::<Sector>(e) {
            sector.bodies.insert(lamp);
        }
        update_pvs(&mut world, s);
        let target = world.get::<Sector>(s).unwrap();
        assert!(!target.pvs.contains(&e));
        assert_eq!(target.pvl, vec![lamp]);
    }

    #[test]
    fn test_lights_stop_at_backward_portal() {
        let mut world = create_world(EngineConfig::default());
        // `s` opens right into `b`, the corridor climbs through `c1` and `c2`
        // and turns back left into `d`, against the first portal's facing.
        let s = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        rect(&mut world, 10.0, 10.0, 10.0, 10.0);
        let c2 = rect(&mut world, 10.0, 20.0, 10.0, 10.0);
        let d = rect(&mut world, 0.0, 20.0, 10.0, 10.0);
        auto_portal(&mut world);
        let near = light_body(&mut world, Vec3::new(15.0, 25.0, 30.0), Light::default());
        let far = light_body(&mut world, Vec3::new(5.0, 25.0, 30.0), Light::default());
        if let Some(sector) = world.get_mut::<Sector>(c2) {
            sector.bodies.insert(near);
        }
        if let Some(sector) = world.get_mut::<Sector>(d) {
            sector.bodies.insert(far);
        }
        update_pvs(&mut world, s);
        let pvl = &world.get::<Sector>(s).unwrap().pvl;
        assert!(pvl.contains(&near));
        assert!(!pvl.contains(&far));
    }

    #[test]
    fn test_queue_drains_within_budget() {
        let mut world = create_world(EngineConfig::default());
        for i in 0..5 {
            rect(&mut world, f64::from(i) * 10.0, 0.0, 10.0, 10.0);
        }
        queue_all(&mut world);
        assert_eq!(drain_queue(&mut world, 2), 2);
        assert_eq!(world.singleton::<PvsQueue>().unwrap().len(), 3);
        assert_eq!(drain_queue(&mut world, 10), 3);
        assert!(world.singleton::<PvsQueue>().unwrap().is_empty());
    }
}
