//! Mobile integration: forces, velocity and sub-stepped movement.

use portalis_core::{Component, Entity, World};
use portalis_shared::constants::{
    AIR_DENSITY, COLLISION_STEPS, METERS_PER_UNIT, SPHERE_DRAG_COEFFICIENT, TIME_STEP_S, UNITS_PER_METER,
    VELOCITY_EPSILON,
};
use portalis_shared::Vec3;

use super::collision::collide;
use crate::components::{Body, Mobile};
use crate::config::settings;
use crate::geometry::Sector;
use crate::spatial::update_body;

/// Adds gravity, air drag and floor friction to the mobile's force
/// accumulator.
pub fn apply_forces(world: &mut World, entity: Entity) {
    let Some(body) = world.get::<Body>(entity) else {
        return;
    };
    let Some(sector) = world.get::<Sector>(body.sector_entity) else {
        return;
    };
    let Some(mobile) = world.get::<Mobile>(entity) else {
        return;
    };
    if mobile.mass <= 0.0 {
        return;
    }

    let mut force = Vec3::ZERO;
    if mobile.gravity {
        force += sector.gravity * mobile.mass;
    }
    let vel = mobile.vel.now;
    let speed = vel.length();
    if mobile.air_drag && speed > 0.0 {
        let r = body.radius() * METERS_PER_UNIT;
        let area = std::f64::consts::PI * r * r;
        force -= vel * (0.5 * AIR_DENSITY * area * SPHERE_DRAG_COEFFICIENT * speed);
    }
    if body.on_ground {
        let n = sector.bottom.normal;
        let normal_force = n.dot(sector.gravity * -mobile.mass);
        force -= vel * (sector.floor_friction * normal_force);
    }

    if let Some(mobile) = world.get_mut::<Mobile>(entity) {
        mobile.force += force;
    }
}

/// Advances one mobile body by a frame: applies forces, integrates velocity
/// and moves in sub-steps no longer than the collision check distance,
/// resolving collisions after each.
pub fn step_mobile(world: &mut World, entity: Entity) {
    let (active, mass, has_sector) = {
        let (Some(body), Some(mobile)) = (world.get::<Body>(entity), world.get::<Mobile>(entity)) else {
            return;
        };
        (
            body.base().is_active() && mobile.base().is_active(),
            mobile.mass,
            world.get::<Sector>(body.sector_entity).is_some(),
        )
    };
    if !active {
        return;
    }
    if mass <= 0.0 {
        if let Some(mobile) = world.get_mut::<Mobile>(entity) {
            mobile.force = Vec3::ZERO;
        }
        return;
    }
    if !has_sector {
        collide(world, entity);
    }

    apply_forces(world, entity);
    let vel = {
        let Some(mobile) = world.get_mut::<Mobile>(entity) else {
            return;
        };
        let accel = mobile.force * (1.0 / mobile.mass);
        mobile.vel.now += accel * TIME_STEP_S;
        mobile.force = Vec3::ZERO;
        mobile.vel.now
    };

    if vel.length_squared() > VELOCITY_EPSILON {
        let check = settings(world).collision_check;
        let travel = vel.length() * TIME_STEP_S * UNITS_PER_METER;
        let steps = substeps(travel, check);
        let dt = TIME_STEP_S / steps as f64;
        for _ in 0..steps {
            let Some(vel) = world.get::<Mobile>(entity).map(|m| m.vel.now) else {
                break;
            };
            let Some(body) = world.get_mut::<Body>(entity) else {
                break;
            };
            body.pos.now += vel * (dt * UNITS_PER_METER);
            collide(world, entity);
            if !world.is_live(entity) {
                return;
            }
        }
    }
    update_body(world, entity);
}

/// Number of sub-steps for moving `travel` units with one collision check
/// every `check` units.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn substeps(travel: f64, check: f64) -> usize {
    if check <= 0.0 {
        return 1;
    }
    ((travel / check).ceil() as usize).clamp(1, COLLISION_STEPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::sector_from_points;
    use crate::{create_world, EngineConfig};
    use portalis_shared::Vec2;

    fn room(world: &mut World) -> Entity {
        sector_from_points(
            world,
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(100.0, 0.0),
                Vec2::new(100.0, 100.0),
                Vec2::new(0.0, 100.0),
            ],
        )
    }

    fn mobile_at(world: &mut World, pos: Vec3) -> Entity {
        let e = world.new_entity();
        world.attach(e, Body::new(pos, Vec2::new(2.0, 10.0)));
        world.attach(e, Mobile::with_mass(10.0));
        e
    }

    #[test]
    fn test_substeps_clamped() {
        assert_eq!(substeps(0.1, 2.0), 1);
        assert_eq!(substeps(5.0, 2.0), 3);
        assert_eq!(substeps(1000.0, 2.0), COLLISION_STEPS);
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut world = create_world(EngineConfig::default());
        room(&mut world);
        let e = mobile_at(&mut world, Vec3::new(50.0, 50.0, 30.0));
        step_mobile(&mut world, e);
        step_mobile(&mut world, e);
        let body = world.get::<Body>(e).unwrap();
        assert!(body.pos.now.z < 30.0);
        assert!(world.get::<Mobile>(e).unwrap().vel.now.z < 0.0);
        assert!(world.get::<Mobile>(e).unwrap().force == Vec3::ZERO);
    }

    #[test]
    fn test_falling_body_lands() {
        let mut world = create_world(EngineConfig::default());
        room(&mut world);
        let e = mobile_at(&mut world, Vec3::new(50.0, 50.0, 20.0));
        for _ in 0..300 {
            step_mobile(&mut world, e);
        }
        let body = world.get::<Body>(e).unwrap();
        assert!(body.on_ground);
        assert!((body.pos.now.z - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_massless_mobile_stays_put() {
        let mut world = create_world(EngineConfig::default());
        room(&mut world);
        let e = mobile_at(&mut world, Vec3::new(50.0, 50.0, 30.0));
        if let Some(m) = world.get_mut::<Mobile>(e) {
            m.mass = 0.0;
            m.force = Vec3::new(1.0, 0.0, 0.0);
        }
        step_mobile(&mut world, e);
        assert_eq!(world.get::<Body>(e).unwrap().pos.now, Vec3::new(50.0, 50.0, 30.0));
        assert_eq!(world.get::<Mobile>(e).unwrap().force, Vec3::ZERO);
    }

    #[test]
    fn test_ground_friction_slows_slide() {
        let mut world = create_world(EngineConfig::default());
        room(&mut world);
        let e = mobile_at(&mut world, Vec3::new(20.0, 50.0, 5.0));
        if let Some(m) = world.get_mut::<Mobile>(e) {
            m.vel.now = Vec3::new(2.0, 0.0, 0.0);
        }
        for _ in 0..30 {
            step_mobile(&mut world, e);
        }
        let vx = world.get::<Mobile>(e).unwrap().vel.now.x;
        assert!(vx > 0.0 && vx < 2.0);
    }
}
