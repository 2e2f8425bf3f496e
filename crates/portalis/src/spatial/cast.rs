//! # Ray Traversal
//!
//! Walks a ray through the sector graph, one sector at a time.
//!
//! ## Algorithm
//!
//! 1. In the current sector, find the nearest body and internal wall.
//! 2. Find the nearest exit through the sector's own boundary, and the
//!    nearest entry through the boundary of any sector nested inside it.
//! 3. A boundary closer than every object either continues the walk (a
//!    portal, a nested sector, or the enclosing sector behind a wall) or ends
//!    it on a wall.
//!
//! Each crossed boundary raises the minimum distance, so the walk can move
//! through a shared vertex into a diagonal neighbour without re-hitting the
//! edge it just left.

use portalis_core::{Component, Entity, World};
use portalis_shared::constants::{INTERSECT_EPSILON, MAX_PORTALS};
use portalis_shared::math::DEG_TO_RAD;
use portalis_shared::{Vec2, Vec3};
use tracing::warn;

use crate::components::Body;
use crate::geometry::{InternalSegment, Sector};

/// A finite ray.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    /// Origin.
    pub start: Vec3,
    /// Far end.
    pub end: Vec3,
    /// Unit direction. Zero for a degenerate ray.
    pub delta: Vec3,
    /// Length.
    pub limit: f64,
}

impl Ray {
    /// The ray from `start` to `end`.
    #[must_use]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        let d = end - start;
        let limit = d.length();
        let delta = if limit > 0.0 { d * (1.0 / limit) } else { Vec3::ZERO };
        Self {
            start,
            end,
            delta,
            limit,
        }
    }

    /// The ray from `start` facing `angle` degrees around Z and `pitch`
    /// degrees up, `limit` units long. Pitch is clamped to ±90°.
    #[must_use]
    pub fn from_angles(start: Vec3, angle: f64, pitch: f64, limit: f64) -> Self {
        let pitch = pitch.clamp(-90.0, 90.0) * DEG_TO_RAD;
        let angle = angle * DEG_TO_RAD;
        let delta = Vec3::new(angle.cos() * pitch.cos(), angle.sin() * pitch.cos(), pitch.sin());
        Self {
            start,
            end: start + delta * limit,
            delta,
            limit,
        }
    }
}

/// Which part of a wall a ray stopped on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WallPart {
    /// Below the neighbouring floor.
    Lo,
    /// The wall proper.
    #[default]
    Mid,
    /// Above the neighbouring ceiling.
    Hi,
}

/// What a ray stopped on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HitTarget {
    /// A body.
    Body(Entity),
    /// A sector segment.
    Wall {
        /// Sector owning the segment.
        sector: Entity,
        /// Segment index.
        segment: usize,
        /// Vertical part.
        part: WallPart,
    },
    /// A free-standing wall.
    InternalSegment(Entity),
}

/// The nearest thing a ray reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastHit {
    /// What was hit.
    pub target: HitTarget,
    /// Where.
    pub point: Vec3,
    /// Squared distance from the ray origin.
    pub distance_squared: f64,
    /// Sector the ray was in.
    pub sector: Entity,
}

/// Result of a traversal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CastOutcome {
    /// The nearest hit, if any.
    pub hit: Option<CastHit>,
    /// Sectors in traversal order.
    pub sectors_visited: Vec<Entity>,
}

/// Traversal filters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastOptions {
    /// Body never hit, usually the caster.
    pub source: Entity,
    /// Skip every body.
    pub ignore_bodies: bool,
    /// A segment never hit, as `(sector, index)`.
    pub ignore_segment: Option<(Entity, usize)>,
    /// Portal crossings before giving up.
    pub max_portals: usize,
}

impl Default for CastOptions {
    fn default() -> Self {
        Self {
            source: Entity::NULL,
            ignore_bodies: false,
            ignore_segment: None,
            max_portals: MAX_PORTALS,
        }
    }
}

struct Boundary {
    dist_sq: f64,
    point: Vec3,
    segment: Option<(Entity, usize)>,
    part: WallPart,
    next: Entity,
}

/// Casts `ray` starting inside `start_sector`.
///
/// A ray with a zero limit visits nothing. A walk that crosses more than
/// `max_portals` boundaries ends without a hit.
#[must_use]
pub fn cast(world: &World, ray: &Ray, start_sector: Entity, options: &CastOptions) -> CastOutcome {
    let mut outcome = CastOutcome::default();
    if ray.limit <= 0.0 {
        return outcome;
    }
    let limit_sq = ray.limit * ray.limit;
    let mut min_dist_sq = 0.0;
    let mut current = start_sector;
    let mut depth = 0;

    loop {
        let Some(sector) = world.get::<Sector>(current) else {
            warn!(sector = %current, "Ray entered an entity without a sector");
            return outcome;
        };
        outcome.sectors_visited.push(current);

        let mut best_dist_sq = limit_sq;
        let mut best = None;
        if !options.ignore_bodies {
            for &entity in &sector.bodies {
                if entity == options.source {
                    continue;
                }
                let Some(body) = world.get::<Body>(entity) else {
                    continue;
                };
                if !body.base().is_active() {
                    continue;
                }
                let Some((point, exit_sq)) = ray_sphere(ray, body.pos.now, body.radius()) else {
                    continue;
                };
                let dist_sq = point.distance_squared(ray.start).max(min_dist_sq);
                if dist_sq < best_dist_sq && exit_sq > min_dist_sq {
                    best_dist_sq = dist_sq;
                    best = Some(CastHit {
                        target: HitTarget::Body(entity),
                        point,
                        distance_squared: dist_sq,
                        sector: current,
                    });
                }
            }
        }
        for &entity in &sector.internal_segments {
            let Some(wall) = world.get::<InternalSegment>(entity) else {
                continue;
            };
            if !wall.is_solid() {
                continue;
            }
            let Some(point) = wall.intersect_ray(ray.start, ray.end) else {
                continue;
            };
            let dist_sq = point.distance_squared(ray.start);
            if dist_sq < best_dist_sq && dist_sq > min_dist_sq {
                best_dist_sq = dist_sq;
                best = Some(CastHit {
                    target: HitTarget::InternalSegment(entity),
                    point,
                    distance_squared: dist_sq,
                    sector: current,
                });
            }
        }

        let mut boundary = Boundary {
            dist_sq: best_dist_sq,
            point: Vec3::ZERO,
            segment: None,
            part: WallPart::Mid,
            next: Entity::NULL,
        };
        nearest_boundary(world, current, sector, ray, min_dist_sq, false, options, &mut boundary);
        for &inner in &sector.inner {
            if let Some(nested) = world.get::<Sector>(inner) {
                nearest_boundary(world, inner, nested, ray, min_dist_sq, true, options, &mut boundary);
            }
        }

        let Some((wall_sector, segment)) = boundary.segment else {
            outcome.hit = best;
            return outcome;
        };
        if boundary.next.is_null() {
            outcome.hit = Some(CastHit {
                target: HitTarget::Wall {
                    sector: wall_sector,
                    segment,
                    part: boundary.part,
                },
                point: boundary.point,
                distance_squared: boundary.dist_sq,
                sector: current,
            });
            return outcome;
        }

        min_dist_sq = boundary.dist_sq;
        current = boundary.next;
        depth += 1;
        if depth > options.max_portals {
            return outcome;
        }
    }
}

/// Updates `best` with the nearest crossing of `sector`'s boundary.
///
/// Exit mode looks for segments the ray leaves through. Entry mode looks for
/// the solid segments of a nested sector the ray enters through.
#[allow(clippy::too_many_arguments)]
fn nearest_boundary(
    world: &World,
    sector_entity: Entity,
    sector: &Sector,
    ray: &Ray,
    min_dist_sq: f64,
    check_entry: bool,
    options: &CastOptions,
    best: &mut Boundary,
) {
    for seg in &sector.segments {
        if options.ignore_segment == Some((sector_entity, seg.index)) {
            continue;
        }
        if check_entry && seg.is_portal() {
            continue;
        }
        let facing = ray.delta.to_2d().dot(seg.segment.normal) > 0.0;
        if check_entry != facing {
            continue;
        }
        let Some(point) = seg
            .segment
            .intersect_3d(f64::NEG_INFINITY, f64::INFINITY, ray.start, ray.end)
        else {
            continue;
        };
        let dist_sq = point.distance_squared(ray.start);
        if dist_sq >= best.dist_sq || dist_sq < min_dist_sq - INTERSECT_EPSILON {
            continue;
        }

        let p = point.to_2d();
        let mut next = if seg.is_portal() && !seg.portal_teleports {
            seg.adjacent_sector
        } else if check_entry {
            sector_entity
        } else if seg.is_portal() {
            Entity::NULL
        } else {
            let nudged = p + ray.delta.to_2d() * INTERSECT_EPSILON;
            enclosing_sector_at(world, sector, nudged, options.max_portals)
        };

        let mut part = WallPart::Mid;
        let (floor, ceil) = sector.z_at(p);
        if point.z < floor - INTERSECT_EPSILON {
            next = Entity::NULL;
            part = WallPart::Lo;
        } else if point.z > ceil + INTERSECT_EPSILON {
            next = Entity::NULL;
            part = WallPart::Hi;
        } else if !next.is_null() && next != sector_entity {
            if let Some(adj) = world.get::<Sector>(next) {
                let (floor, ceil) = adj.z_at(p);
                if point.z < floor - INTERSECT_EPSILON {
                    next = Entity::NULL;
                    part = WallPart::Lo;
                } else if point.z > ceil + INTERSECT_EPSILON {
                    next = Entity::NULL;
                    part = WallPart::Hi;
                }
            }
        }

        best.dist_sq = dist_sq;
        best.point = point;
        best.segment = Some((sector_entity, seg.index));
        best.part = part;
        best.next = next;
    }
}

/// The nearest sector enclosing `sector` that contains `p`, or null.
fn enclosing_sector_at(world: &World, sector: &Sector, p: Vec2, max_hops: usize) -> Entity {
    let mut outer = sector.outer;
    for _ in 0..max_hops {
        let Some(candidate) = world.get::<Sector>(outer) else {
            return Entity::NULL;
        };
        if candidate.is_point_inside_2d(p) {
            return outer;
        }
        outer = candidate.outer;
    }
    Entity::NULL
}

/// Where the ray enters the sphere, clamped to the origin when it starts
/// inside, and the squared distance to where it leaves.
fn ray_sphere(ray: &Ray, center: Vec3, radius: f64) -> Option<(Vec3, f64)> {
    let d = ray.end - ray.start;
    let f = ray.start - center;
    let a = d.dot(d);
    if a <= 0.0 {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t_enter = (-b - root) / (2.0 * a);
    let t_exit = (-b + root) / (2.0 * a);
    if t_exit < 0.0 || t_enter > 1.0 {
        return None;
    }
    let entry = ray.start + d * t_enter.max(0.0);
    let exit = ray.start + d * t_exit.min(1.0);
    Some((entry, exit.distance_squared(ray.start)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::sector_from_points;
    use crate::create_world;
    use crate::EngineConfig;

    const EPSILON: f64 = 1e-9;

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

    fn link(world: &mut World, a: Entity, a_seg: usize, b: Entity, b_seg: usize) {
        if let Some(s) = world.get_mut::<Sector>(a) {
            s.segments[a_seg].adjacent_sector = b;
            s.segments[a_seg].adjacent_segment = Some(b_seg);
        }
        if let Some(s) = world.get_mut::<Sector>(b) {
            s.segments[b_seg].adjacent_sector = a;
            s.segments[b_seg].adjacent_segment = Some(a_seg);
        }
    }

    #[test]
    fn test_zero_limit_visits_nothing() {
        let mut world = create_world(EngineConfig::default());
        let s = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let p = Vec3::new(5.0, 5.0, 5.0);
        let outcome = cast(&world, &Ray::new(p, p), s, &CastOptions::default());
        assert!(outcome.hit.is_none());
        assert!(outcome.sectors_visited.is_empty());
    }

    #[test]
    fn test_hits_wall_of_single_sector() {
        let mut world = create_world(EngineConfig::default());
        let s = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(20.0, 5.0, 5.0));
        let hit = cast(&world, &ray, s, &CastOptions::default()).hit.unwrap();
        assert!(matches!(hit.target, HitTarget::Wall { sector, segment: 1, part: WallPart::Mid } if sector == s));
        assert!((hit.point.x - 10.0).abs() < EPSILON);
        assert!((hit.distance_squared - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_ray_hits_nothing() {
        let mut world = create_world(EngineConfig::default());
        let s = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(8.0, 5.0, 5.0));
        let outcome = cast(&world, &ray, s, &CastOptions::default());
        assert!(outcome.hit.is_none());
        assert_eq!(outcome.sectors_visited, vec![s]);
    }

    #[test]
    fn test_crosses_portal_and_stops_on_raised_floor() {
        let mut world = create_world(EngineConfig::default());
        let a = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
        link(&mut world, a, 1, b, 3);

        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(30.0, 5.0, 5.0));
        let outcome = cast(&world, &ray, a, &CastOptions::default());
        assert_eq!(outcome.sectors_visited, vec![a, b]);
        assert!(matches!(outcome.hit.unwrap().target, HitTarget::Wall { sector, .. } if sector == b));

        if let Some(sector) = world.get_mut::<Sector>(b) {
            sector.bottom.z.set_all(8.0);
            sector.recalculate();
        }
        let outcome = cast(&world, &ray, a, &CastOptions::default());
        assert_eq!(outcome.sectors_visited, vec![a]);
        let hit = outcome.hit.unwrap();
        assert!(matches!(hit.target, HitTarget::Wall { sector, segment: 1, part: WallPart::Lo } if sector == a));
    }

    #[test]
    fn test_source_body_is_skipped() {
        let mut world = create_world(EngineConfig::default());
        let s = rect(&mut world, 0.0, 0.0, 20.0, 20.0);
        let caster = world.new_entity();
        world.attach(caster, Body::new(Vec3::new(5.0, 5.0, 5.0), Vec2::new(4.0, 4.0)));
        let target = world.new_entity();
        world.attach(target, Body::new(Vec3::new(15.0, 5.0, 5.0), Vec2::new(4.0, 4.0)));
        if let Some(sector) = world.get_mut::<Sector>(s) {
            sector.bodies.insert(caster);
            sector.bodies.insert(target);
        }

        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(19.0, 5.0, 5.0));
        let options = CastOptions {
            source: caster,
            ..CastOptions::default()
        };
        let hit = cast(&world, &ray, s, &options).hit.unwrap();
        assert_eq!(hit.target, HitTarget::Body(target));
        assert!((hit.point.x - 13.0).abs() < 1e-6);

        let options = CastOptions {
            ignore_bodies: true,
            ..options
        };
        let hit = cast(&world, &ray, s, &options);
        assert!(hit.hit.is_none());
    }

    #[test]
    fn test_enters_nested_sector() {
        let mut world = create_world(EngineConfig::default());
        let outer = rect(&mut world, 0.0, 0.0, 40.0, 40.0);
        let inner = rect(&mut world, 20.0, 10.0, 10.0, 10.0);
        if let Some(s) = world.get_mut::<Sector>(outer) {
            s.inner.push(inner);
        }
        if let Some(s) = world.get_mut::<Sector>(inner) {
            s.outer = outer;
        }

        let ray = Ray::new(Vec3::new(5.0, 15.0, 5.0), Vec3::new(35.0, 15.0, 5.0));
        let outcome = cast(&world, &ray, outer, &CastOptions::default());
        assert_eq!(outcome.sectors_visited, vec![outer, inner, outer]);
        assert!(outcome.hit.is_none());
    }

    #[test]
    fn test_from_angles_points_along_x() {
        let ray = Ray::from_angles(Vec3::ZERO, 0.0, 0.0, 10.0);
        assert!((ray.end.x - 10.0).abs() < EPSILON);
        assert!(ray.end.y.abs() < EPSILON);
        let up = Ray::from_angles(Vec3::ZERO, 0.0, 120.0, 1.0);
        assert!((up.delta.z - 1.0).abs() < EPSILON);
    }
}
