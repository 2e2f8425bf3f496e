//! # Archetypes
//!
//! Constructors for the entity shapes hosts and tests build most often.
//! They attach components only; placing bodies in sectors happens on the
//! next recalculation or step.

use tracing::debug;

use portalis_core::{Entity, Named, World};
use portalis_shared::constants::{PLAYER_BOUNDING_RADIUS, PLAYER_HEIGHT, PLAYER_MASS};
use portalis_shared::{Vec2, Vec3, Vec4};

use crate::components::{Body, Light, Material, Mobile, Player};
use crate::config::settings;
use crate::geometry::Sector;

/// A sector with one segment per vertex, recalculated. The winding may be
/// either direction.
pub fn sector_from_points(world: &mut World, points: &[Vec2]) -> Entity {
    let grid = settings(world).light_grid;
    let mut sector = Sector::from_points(points);
    sector.recalculate_with_grid(grid);
    let entity = world.new_entity();
    world.attach(entity, sector);
    debug!(%entity, vertices = points.len(), "Created sector");
    entity
}

/// The player: a named, mobile body of player size and mass.
pub fn player_body(world: &mut World, pos: Vec3) -> Entity {
    let entity = world.new_entity();
    world.attach(
        entity,
        Body::new(pos, Vec2::new(PLAYER_BOUNDING_RADIUS, PLAYER_HEIGHT)),
    );
    world.attach(entity, Mobile::with_mass(PLAYER_MASS));
    world.attach(entity, Named::new("Player"));
    world.attach(entity, Player::default());
    entity
}

/// A light-carrying body with no mobile component, so it never collides.
pub fn light_body(world: &mut World, pos: Vec3, light: Light) -> Entity {
    let entity = world.new_entity();
    world.attach(entity, Body::new(pos, Vec2::new(2.0, 2.0)));
    world.attach(entity, light);
    entity
}

/// A named shareable material. Attach it to sectors with [`World::link`].
pub fn material(world: &mut World, name: &str, diffuse: Vec4) -> Entity {
    let entity = world.new_entity();
    let mut m = Material::default();
    m.diffuse = diffuse;
    world.attach(entity, m);
    world.attach(entity, Named::new(name));
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_world, EngineConfig};
    use portalis_core::Component;

    #[test]
    fn test_sector_from_points_recalculates() {
        let mut world = create_world(EngineConfig::default());
        let e = sector_from_points(
            &mut world,
            &[Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), Vec2::new(10.0, 10.0), Vec2::new(10.0, 0.0)],
        );
        let sector = world.get::<Sector>(e).unwrap();
        assert_eq!(sector.segments.len(), 4);
        assert!((sector.center.x - 5.0).abs() < 1e-9);
        for seg in &sector.segments {
            let to_center = sector.center.to_2d() - seg.segment.midpoint();
            assert!(seg.segment.normal.dot(to_center) > 0.0);
        }
    }

    #[test]
    fn test_player_body() {
        let mut world = create_world(EngineConfig::default());
        let e = player_body(&mut world, Vec3::new(1.0, 2.0, 3.0));
        let body = world.get::<Body>(e).unwrap();
        assert!((body.size.now.x - 10.0).abs() < 1e-9);
        assert!((body.size.now.y - 40.0).abs() < 1e-9);
        assert!((world.get::<Mobile>(e).unwrap().mass - 80.0).abs() < 1e-9);
        assert!(world.has::<Player>(e));
        assert_eq!(world.entity_by_name("Player"), Some(e));
    }

    #[test]
    fn test_light_body_has_no_mobile() {
        let mut world = create_world(EngineConfig::default());
        let e = light_body(&mut world, Vec3::ZERO, Light::default());
        assert!(world.has::<Light>(e));
        assert!(world.has::<Body>(e));
        assert!(!world.has::<Mobile>(e));
    }

    #[test]
    fn test_material_is_shared() {
        let mut world = create_world(EngineConfig::default());
        let m = material(&mut world, "brick", Vec4::new(1.0, 0.0, 0.0, 1.0));
        let target = world.new_entity();
        world.link(target, m);
        let shared = world.get::<Material>(target).unwrap();
        assert_eq!(shared.base().attachments, 2);
        assert_eq!(shared.diffuse, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!(world.get::<Named>(target).is_none());
    }
}
