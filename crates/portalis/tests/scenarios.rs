//! End-to-end scenarios over a fully registered world.

use portalis::archetypes::sector_from_points;
use portalis::components::{Body, Mobile};
use portalis::geometry::Sector;
use portalis::pathfinding::Finder;
use portalis::persistence::{load_str, save_to_string};
use portalis::spatial::{cast, CastOptions, HitTarget, QuadItem, Quadtree, Ray};
use portalis::topology::auto_portal;
use portalis::{create_world, EngineConfig};
use portalis_core::dynamic::AnimationCoordinates;
use portalis_core::{Animation, AnimationLifetime, ControllerMethod, Dynamic, Entity, World};
use portalis_shared::constants::{TIME_STEP_MS, TIME_STEP_S, UNITS_PER_METER};
use portalis_shared::{Vec2, Vec3};

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

fn body_at(world: &mut World, pos: Vec3, size: Vec2) -> Entity {
    let e = world.new_entity();
    world.attach(e, Body::new(pos, size));
    e
}

// =============================================================================
// Quadtree
// =============================================================================

#[test]
fn quadtree_circle_query_respects_radii() {
    let mut tree = Quadtree::with_bounds(Vec2::ZERO, Vec2::new(128.0, 128.0));
    let bodies = [(1, 10.0, 10.0, 2.0), (2, 20.0, 20.0, 3.0), (3, 100.0, 100.0, 1.0)];
    for (local, x, y, radius) in bodies {
        tree.insert(QuadItem {
            entity: Entity::new(0, local),
            pos: Vec3::new(x, y, 0.0),
            radius,
            half_height: 1.0,
            is_light: false,
        });
    }

    let mut found = Vec::new();
    tree.range_circle(Vec2::new(12.0, 12.0), 5.0, |item| {
        found.push(item.entity);
        true
    });
    assert_eq!(found, vec![Entity::new(0, 1)]);
}

// =============================================================================
// Ray traversal
// =============================================================================

#[test]
fn ray_through_shared_corner_hits_body() {
    let mut world = create_world(EngineConfig::default());
    let top_left = rect(&mut world, 0.0, 10.0, 10.0, 10.0);
    rect(&mut world, 10.0, 10.0, 10.0, 10.0);
    rect(&mut world, 0.0, 0.0, 10.0, 10.0);
    let bottom_right = rect(&mut world, 10.0, 0.0, 10.0, 10.0);
    auto_portal(&mut world);

    let center = Vec3::new(15.0, 5.0, 5.0);
    let target = body_at(&mut world, center, Vec2::new(4.0, 4.0));
    world.act_all(ControllerMethod::RECALCULATE);
    assert_eq!(world.get::<Body>(target).unwrap().sector_entity, bottom_right);

    let ray = Ray::new(Vec3::new(5.0, 15.0, 5.0), center);
    let outcome = cast(&world, &ray, top_left, &CastOptions::default());
    let hit = outcome.hit.expect("ray should reach the body");
    assert_eq!(hit.target, HitTarget::Body(target));
    assert!(hit.point.distance(center) <= 2.0 + 1e-6);
}

// =============================================================================
// Topology
// =============================================================================

#[test]
fn auto_portal_splits_partial_overlap() {
    let mut world = create_world(EngineConfig::default());
    let a = rect(&mut world, 0.0, 0.0, 20.0, 10.0);
    let b = rect(&mut world, 5.0, -10.0, 20.0, 10.0);
    auto_portal(&mut world);

    let on_line = |s: &Sector| -> Vec<usize> {
        s.segments
            .iter()
            .enumerate()
            .filter(|(_, seg)| seg.segment.a.y.abs() < 1e-9 && seg.segment.b.y.abs() < 1e-9)
            .map(|(i, _)| i)
            .collect()
    };
    let sa = world.get::<Sector>(a).unwrap();
    let sb = world.get::<Sector>(b).unwrap();
    let a_edges = on_line(sa);
    let b_edges = on_line(sb);
    assert_eq!(a_edges.len(), 2);
    assert_eq!(b_edges.len(), 2);

    let xs = |s: &Sector, i: usize| {
        let seg = &s.segments[i].segment;
        let (lo, hi) = (seg.a.x.min(seg.b.x), seg.a.x.max(seg.b.x));
        (lo, hi)
    };
    let mut a_spans: Vec<_> = a_edges.iter().map(|&i| xs(sa, i)).collect();
    let mut b_spans: Vec<_> = b_edges.iter().map(|&i| xs(sb, i)).collect();
    a_spans.sort_by(|l, r| l.0.total_cmp(&r.0));
    b_spans.sort_by(|l, r| l.0.total_cmp(&r.0));
    assert_eq!(a_spans, vec![(0.0, 5.0), (5.0, 20.0)]);
    assert_eq!(b_spans, vec![(5.0, 20.0), (20.0, 25.0)]);

    let portal = a_edges
        .iter()
        .map(|&i| &sa.segments[i])
        .find(|seg| seg.is_portal())
        .expect("shared span is a portal");
    assert_eq!(portal.adjacent_sector, b);
    let back = &sb.segments[portal.adjacent_segment.unwrap()];
    assert_eq!(back.adjacent_sector, a);
    assert!(back.segment.matches(&portal.segment));
    assert_eq!(sa.segments[back.adjacent_segment.unwrap()], *portal);
}

// =============================================================================
// Physics
// =============================================================================

#[test]
fn body_falls_through_floor_portal() {
    let mut world = create_world(EngineConfig::default());
    let upper = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
    let lower = rect(&mut world, 100.0, 0.0, 10.0, 10.0);
    if let Some(s) = world.get_mut::<Sector>(upper) {
        s.top.z.set_all(50.0);
        s.bottom.target = lower;
    }
    if let Some(s) = world.get_mut::<Sector>(lower) {
        s.top.z.set_all(40.0);
    }
    world.act_all(ControllerMethod::RECALCULATE);

    let start = world.get::<Sector>(upper).unwrap().center;
    let e = body_at(&mut world, Vec3::new(start.x, start.y, 25.0), Vec2::new(2.0, 2.0));
    let mut mobile = Mobile::with_mass(1.0);
    mobile.vel.set_all(Vec3::new(0.0, 0.0, -5.0));
    world.attach(e, mobile);
    world.act_all(ControllerMethod::RECALCULATE);
    assert_eq!(world.get::<Body>(e).unwrap().sector_entity, upper);

    let mut steps = 0;
    while world.get::<Body>(e).unwrap().sector_entity == upper {
        world.step(TIME_STEP_MS);
        steps += 1;
        assert!(steps < 600, "body never left the upper sector");
    }

    let body = world.get::<Body>(e).unwrap();
    assert_eq!(body.sector_entity, lower);
    assert!(world.get::<Sector>(upper).unwrap().bodies.is_empty());
    assert!(world.get::<Sector>(lower).unwrap().bodies.contains(&e));

    // Placed one unit plus half its height under the ceiling, then carried
    // by at most one frame of travel.
    let expected = 40.0 - body.half_height() - 1.0;
    let speed = world.get::<Mobile>(e).unwrap().vel.now.length();
    let frame_travel = speed * TIME_STEP_S * UNITS_PER_METER;
    assert!(body.pos.now.z <= expected + 1e-9);
    assert!(body.pos.now.z >= expected - frame_travel - 1e-9);
    assert!((body.pos.now.x - 105.0).abs() < 1e-9);
}

// =============================================================================
// Pathfinding
// =============================================================================

#[test]
fn corridor_path_is_short_and_dense() {
    let mut world = create_world(EngineConfig::default());
    for i in 0..10 {
        rect(&mut world, 20.0 * f64::from(i), 0.0, 20.0, 20.0);
    }
    auto_portal(&mut world);

    let step = 10.0;
    let start = Vec3::new(5.0, 10.0, 0.0);
    let end = Vec3::new(195.0, 10.0, 0.0);
    let path = Finder::new(&world, start, end, step, 3.0)
        .shortest_path(&world)
        .expect("corridor is connected");

    assert!(path.complete);
    assert_eq!(path.points.first().copied(), Some(start));
    assert_eq!(path.points.last().copied(), Some(end));
    for pair in path.points.windows(2) {
        assert!(pair[0].distance(pair[1]) <= step * std::f64::consts::SQRT_2 + 1e-9);
    }
    assert!(path.length() <= start.distance(end) * 1.2);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn animated_plane_survives_round_trip() {
    let mut world = create_world(EngineConfig::default());
    let s = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
    if let Some(sector) = world.get_mut::<Sector>(s) {
        sector.top.z.set_all(100.0);
        sector
            .top
            .z
            .animate_with(Animation::new(100.0, 0.0, 1000.0, AnimationLifetime::Once));
    }
    let original = world.get::<Sector>(s).unwrap().top.z.animation.clone().unwrap();

    let text = save_to_string(&world).unwrap();
    world.clear();
    assert!(world.get::<Sector>(s).is_none());
    load_str(&mut world, &text, ".").unwrap();

    let top = &world.get::<Sector>(s).unwrap().top.z;
    assert_eq!(top.now.to_bits(), 100.0_f64.to_bits());
    let animation = top.animation.as_ref().expect("animation reloaded");
    assert_eq!(animation.duration.to_bits(), original.duration.to_bits());
    assert_eq!(animation.lifetime, original.lifetime);
    assert_eq!(animation.start.to_bits(), original.start.to_bits());
    assert_eq!(animation.end.to_bits(), original.end.to_bits());
}

#[test]
fn animation_drives_plane_over_steps() {
    let mut world = create_world(EngineConfig::default());
    let relative = rect(&mut world, 0.0, 0.0, 10.0, 10.0);
    let absolute = rect(&mut world, 20.0, 0.0, 10.0, 10.0);
    for (s, coordinates) in [
        (relative, AnimationCoordinates::Relative),
        (absolute, AnimationCoordinates::Absolute),
    ] {
        if let Some(sector) = world.get_mut::<Sector>(s) {
            sector.top.z.set_all(100.0);
            let mut animation = Animation::new(100.0, 0.0, 1000.0, AnimationLifetime::Once);
            animation.coordinates = coordinates;
            sector.top.z.animate_with(animation);
        }
    }

    // Halfway through, the relative tween rides on top of the spawn height.
    for _ in 0..30 {
        world.step(TIME_STEP_MS);
    }
    let z = |world: &World, s: Entity| world.get::<Sector>(s).unwrap().top.z.now;
    assert!((z(&world, relative) - 150.0).abs() < 1e-6);
    assert!((z(&world, absolute) - 50.0).abs() < 1e-6);

    for _ in 0..90 {
        world.step(TIME_STEP_MS);
    }
    // Spawn 100 plus a tween ending at 0.
    assert!((z(&world, relative) - 100.0).abs() < 1e-6);
    assert!(z(&world, absolute).abs() < 1e-6);
    assert!(!world.get::<Sector>(absolute).unwrap().top.z.is_animating());
}
