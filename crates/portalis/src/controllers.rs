//! # Controllers
//!
//! The engine's own behaviours, in dispatch order:
//!
//! | Priority | Component | Frame | Recalculate | Precompute | Loaded |
//! |----------|-----------|-------|-------------|------------|--------|
//! | 50       | Sector    |       | rebuild     |            | queue PVS |
//! | 75       | Body      |       | find sector |            | find sector |
//! | 80       | Mobile    | step  | collide     |            |        |
//! | 100      | PvsQueue  | drain |             | drain all  |        |
//!
//! Recalculation also runs while the editor is paused so edits take effect
//! immediately.

use std::sync::Arc;

use portalis_core::{Component, ComponentId, Controller, ControllerMethod, Entity, World};

use crate::components::{Body, Mobile};
use crate::config::settings;
use crate::geometry::Sector;
use crate::physics::{collide, find_body_sector, step_mobile};
use crate::spatial::update_body;
use crate::topology::{drain_queue, PvsQueue};

/// Priority of [`SectorController`].
pub const SECTOR_PRIORITY: i32 = 50;
/// Priority of [`BodyController`].
pub const BODY_PRIORITY: i32 = 75;
/// Priority of [`MobileController`].
pub const MOBILE_PRIORITY: i32 = 80;
/// Priority of [`PvsController`].
pub const PVS_PRIORITY: i32 = 100;

fn queue_pvs(world: &mut World, sector: Entity) {
    if let Some(queue) = world.singleton::<PvsQueue>() {
        queue.push(sector);
    }
}

/// Rebuilds sector geometry and schedules visibility updates.
#[derive(Debug, Default)]
pub struct SectorController;

impl Controller for SectorController {
    fn component_id(&self, world: &World) -> Option<ComponentId> {
        world.component_id::<Sector>()
    }

    fn methods(&self) -> ControllerMethod {
        ControllerMethod::RECALCULATE | ControllerMethod::LOADED
    }

    fn editor_paused_methods(&self) -> ControllerMethod {
        ControllerMethod::RECALCULATE
    }

    fn recalculate(&self, world: &mut World, entity: Entity) {
        let grid = settings(world).light_grid;
        if let Some(sector) = world.get_mut::<Sector>(entity) {
            sector.recalculate_with_grid(grid);
        }
        queue_pvs(world, entity);
    }

    fn loaded(&self, world: &mut World, entity: Entity) {
        queue_pvs(world, entity);
    }
}

/// Keeps bodies in a sector and in the quadtree.
#[derive(Debug, Default)]
pub struct BodyController;

impl BodyController {
    fn place(world: &mut World, entity: Entity) {
        find_body_sector(world, entity);
        update_body(world, entity);
    }
}

impl Controller for BodyController {
    fn component_id(&self, world: &World) -> Option<ComponentId> {
        world.component_id::<Body>()
    }

    fn methods(&self) -> ControllerMethod {
        ControllerMethod::RECALCULATE | ControllerMethod::LOADED
    }

    fn editor_paused_methods(&self) -> ControllerMethod {
        ControllerMethod::RECALCULATE
    }

    fn recalculate(&self, world: &mut World, entity: Entity) {
        Self::place(world, entity);
    }

    fn loaded(&self, world: &mut World, entity: Entity) {
        Self::place(world, entity);
    }
}

/// Integrates and collides mobile bodies.
#[derive(Debug, Default)]
pub struct MobileController;

impl Controller for MobileController {
    fn component_id(&self, world: &World) -> Option<ComponentId> {
        world.component_id::<Mobile>()
    }

    fn methods(&self) -> ControllerMethod {
        ControllerMethod::FRAME | ControllerMethod::RECALCULATE
    }

    fn editor_paused_methods(&self) -> ControllerMethod {
        ControllerMethod::RECALCULATE
    }

    fn target(&self, world: &World, entity: Entity, component: ComponentId) -> bool {
        world
            .component_base(entity, component)
            .is_some_and(portalis_core::Base::is_active)
            && world.get::<Body>(entity).is_some_and(|b| b.base().is_active())
    }

    fn always(&self, world: &mut World, entity: Entity) {
        step_mobile(world, entity);
    }

    fn recalculate(&self, world: &mut World, entity: Entity) {
        collide(world, entity);
    }
}

/// Drains the visibility rebuild queue a few sectors per frame.
#[derive(Debug, Default)]
pub struct PvsController;

impl Controller for PvsController {
    fn component_id(&self, world: &World) -> Option<ComponentId> {
        world.component_id::<PvsQueue>()
    }

    fn methods(&self) -> ControllerMethod {
        ControllerMethod::FRAME | ControllerMethod::PRECOMPUTE
    }

    fn target(&self, _world: &World, _entity: Entity, _component: ComponentId) -> bool {
        true
    }

    fn always(&self, world: &mut World, _entity: Entity) {
        let budget = settings(world).pvs_refresh_per_frame;
        drain_queue(world, budget);
    }

    fn precompute(&self, world: &mut World, _entity: Entity) {
        drain_queue(world, usize::MAX);
    }
}

/// Registers every engine controller with `world`.
pub fn register_all(world: &mut World) {
    world.register_controller(Arc::new(SectorController), SECTOR_PRIORITY);
    world.register_controller(Arc::new(BodyController), BODY_PRIORITY);
    world.register_controller(Arc::new(MobileController), MOBILE_PRIORITY);
    world.register_controller(Arc::new(PvsController), PVS_PRIORITY);
}
