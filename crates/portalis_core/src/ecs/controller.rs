//! # Controllers
//!
//! A controller is stateless behaviour bound to one component type. The world
//! invokes it once per owning entity for each phase it subscribes to, in
//! ascending priority order. Controllers are shared behind `Arc` so that a
//! phase can hand the whole `&mut World` to each invocation.

use std::ops::BitOr;
use std::sync::Arc;

use super::component::ComponentId;
use super::entity::Entity;
use super::world::World;

/// Set of controller phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ControllerMethod(u8);

impl ControllerMethod {
    /// No phases.
    pub const NONE: Self = Self(0);
    /// Every fixed simulation step.
    pub const FRAME: Self = Self(1 << 0);
    /// Derived data must be rebuilt.
    pub const RECALCULATE: Self = Self(1 << 1);
    /// Expensive caches (visibility) must be rebuilt.
    pub const PRECOMPUTE: Self = Self(1 << 2);
    /// A world finished loading.
    pub const LOADED: Self = Self(1 << 3);

    /// Whether every phase in `other` is included.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for ControllerMethod {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Behaviour attached to a component type.
pub trait Controller: Send + Sync {
    /// Component type this controller targets.
    fn component_id(&self, world: &World) -> Option<ComponentId>;

    /// Phases this controller runs in.
    fn methods(&self) -> ControllerMethod;

    /// Phases that still run while the editor is paused.
    fn editor_paused_methods(&self) -> ControllerMethod {
        ControllerMethod::NONE
    }

    /// Whether to act on `entity`. Defaults to "the component is active".
    fn target(&self, world: &World, entity: Entity, component: ComponentId) -> bool {
        world
            .component_base(entity, component)
            .is_some_and(super::Base::is_active)
    }

    /// Runs every fixed step.
    fn always(&self, _world: &mut World, _entity: Entity) {}

    /// Rebuilds derived data.
    fn recalculate(&self, _world: &mut World, _entity: Entity) {}

    /// Rebuilds expensive caches.
    fn precompute(&self, _world: &mut World, _entity: Entity) {}

    /// Runs after a world is loaded.
    fn loaded(&self, _world: &mut World, _entity: Entity) {}
}

/// A registered controller.
#[derive(Clone)]
pub(crate) struct ControllerEntry {
    pub(crate) priority: i32,
    pub(crate) component: ComponentId,
    pub(crate) controller: Arc<dyn Controller>,
}

pub(crate) fn dispatch(controller: &dyn Controller, world: &mut World, entity: Entity, method: ControllerMethod) {
    match method {
        ControllerMethod::FRAME => controller.always(world, entity),
        ControllerMethod::RECALCULATE => controller.recalculate(world, entity),
        ControllerMethod::PRECOMPUTE => controller.precompute(world, entity),
        ControllerMethod::LOADED => controller.loaded(world, entity),
        _ => tracing::warn!(?method, "Dispatching a compound controller method"),
    }
}

impl World {
    /// Registers `controller` at `priority`. Lower priorities run first;
    /// equal priorities keep registration order.
    pub fn register_controller(&mut self, controller: Arc<dyn Controller>, priority: i32) {
        let Some(component) = controller.component_id(self) else {
            tracing::warn!(priority, "Controller targets an unregistered component");
            return;
        };
        self.controllers.push(ControllerEntry {
            priority,
            component,
            controller,
        });
        self.controllers.sort_by_key(|c| c.priority);
    }

    /// Number of registered controllers.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    fn runs(&self, entry: &ControllerEntry, entity: Entity, method: ControllerMethod) -> bool {
        if !self.simulation.editor_paused || entry.controller.editor_paused_methods().contains(method) {
            return true;
        }
        self.component_base(entity, entry.component)
            .is_some_and(|b| b.active_while_paused)
    }

    /// Runs `method` of every subscribed controller over every entity owning
    /// the controller's component.
    pub fn act_all(&mut self, method: ControllerMethod) {
        let entries: Vec<ControllerEntry> = self
            .controllers
            .iter()
            .filter(|c| c.controller.methods().contains(method))
            .cloned()
            .collect();
        for entry in entries {
            for entity in self.owners_of(entry.component) {
                if !self.has_id(entity, entry.component)
                    || !self.runs(&entry, entity, method)
                    || !entry.controller.target(self, entity, entry.component)
                {
                    continue;
                }
                dispatch(entry.controller.as_ref(), self, entity, method);
            }
        }
    }

    /// Runs `method` of every subscribed controller for a single entity.
    pub fn act_all_for_entity(&mut self, entity: Entity, method: ControllerMethod) {
        let entries: Vec<ControllerEntry> = self
            .controllers
            .iter()
            .filter(|c| c.controller.methods().contains(method))
            .cloned()
            .collect();
        for entry in entries {
            if !self.has_id(entity, entry.component)
                || !self.runs(&entry, entity, method)
                || !entry.controller.target(self, entity, entry.component)
            {
                continue;
            }
            dispatch(entry.controller.as_ref(), self, entity, method);
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::component_base;
    use crate::ecs::{Base, Component, ComponentFlags};

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Door {
        #[serde(flatten)]
        base: Base,
    }

    impl Component for Door {
        const NAME: &'static str = "test.Door";
        component_base!();
    }

    type Log = Arc<Mutex<Vec<(&'static str, ControllerMethod, Entity)>>>;

    struct Recorder {
        label: &'static str,
        methods: ControllerMethod,
        paused: ControllerMethod,
        log: Log,
    }

    impl Recorder {
        fn record(&self, method: ControllerMethod, entity: Entity) {
            self.log.lock().push((self.label, method, entity));
        }
    }

    impl Controller for Recorder {
        fn component_id(&self, world: &World) -> Option<ComponentId> {
            world.component_id::<Door>()
        }

        fn methods(&self) -> ControllerMethod {
            self.methods
        }

        fn editor_paused_methods(&self) -> ControllerMethod {
            self.paused
        }

        fn always(&self, _world: &mut World, entity: Entity) {
            self.record(ControllerMethod::FRAME, entity);
        }

        fn recalculate(&self, _world: &mut World, entity: Entity) {
            self.record(ControllerMethod::RECALCULATE, entity);
        }
    }

    fn world_with(recorders: &[(&'static str, i32, ControllerMethod)]) -> (World, Log) {
        let mut world = World::new();
        world.register_component::<Door>();
        let log = Log::default();
        for &(label, priority, paused) in recorders {
            world.register_controller(
                Arc::new(Recorder {
                    label,
                    methods: ControllerMethod::FRAME | ControllerMethod::RECALCULATE,
                    paused,
                    log: Arc::clone(&log),
                }),
                priority,
            );
        }
        (world, log)
    }

    fn labels(log: &Log) -> Vec<&'static str> {
        log.lock().iter().map(|(label, ..)| *label).collect()
    }

    #[test]
    fn test_method_set_contains() {
        let both = ControllerMethod::FRAME | ControllerMethod::LOADED;
        assert!(both.contains(ControllerMethod::FRAME));
        assert!(!both.contains(ControllerMethod::RECALCULATE));
        assert!(!both.contains(ControllerMethod::NONE));
    }

    #[test]
    fn test_unregistered_component_is_rejected() {
        let mut world = World::new();
        world.register_controller(
            Arc::new(Recorder {
                label: "orphan",
                methods: ControllerMethod::FRAME,
                paused: ControllerMethod::NONE,
                log: Log::default(),
            }),
            0,
        );
        assert_eq!(world.controller_count(), 0);
    }

    #[test]
    fn test_priority_order_is_stable() {
        let none = ControllerMethod::NONE;
        let (mut world, log) = world_with(&[("late", 90, none), ("first", 10, none), ("second", 10, none)]);
        let door = world.new_entity();
        world.attach(door, Door::default());

        world.act_all(ControllerMethod::RECALCULATE);
        assert_eq!(labels(&log), vec!["first", "second", "late"]);
    }

    #[test]
    fn test_inactive_component_is_skipped() {
        let (mut world, log) = world_with(&[("only", 0, ControllerMethod::NONE)]);
        let open = world.new_entity();
        let shut = world.new_entity();
        world.attach(open, Door::default());
        if let Some(door) = world.attach(shut, Door::default()) {
            door.base_mut().flags.remove(ComponentFlags::ACTIVE);
        }

        world.act_all(ControllerMethod::FRAME);
        assert_eq!(*log.lock(), vec![("only", ControllerMethod::FRAME, open)]);
    }

    #[test]
    fn test_act_all_for_entity_touches_one_entity() {
        let none = ControllerMethod::NONE;
        let (mut world, log) = world_with(&[("b", 20, none), ("a", 10, none)]);
        let first = world.new_entity();
        let second = world.new_entity();
        let bare = world.new_entity();
        world.attach(first, Door::default());
        world.attach(second, Door::default());

        world.act_all_for_entity(second, ControllerMethod::RECALCULATE);
        world.act_all_for_entity(bare, ControllerMethod::RECALCULATE);
        assert_eq!(
            *log.lock(),
            vec![
                ("a", ControllerMethod::RECALCULATE, second),
                ("b", ControllerMethod::RECALCULATE, second),
            ]
        );
    }

    #[test]
    fn test_editor_pause_gates_methods() {
        let (mut world, log) = world_with(&[
            ("editor", 0, ControllerMethod::RECALCULATE),
            ("game", 1, ControllerMethod::NONE),
        ]);
        let door = world.new_entity();
        world.attach(door, Door::default());
        world.simulation.editor_paused = true;

        world.act_all(ControllerMethod::FRAME);
        assert!(log.lock().is_empty());

        world.act_all(ControllerMethod::RECALCULATE);
        assert_eq!(labels(&log), vec!["editor"]);
    }

    #[test]
    fn test_active_while_paused_overrides_pause() {
        let (mut world, log) = world_with(&[("game", 0, ControllerMethod::NONE)]);
        let idle = world.new_entity();
        let busy = world.new_entity();
        world.attach(idle, Door::default());
        if let Some(door) = world.attach(busy, Door::default()) {
            door.base_mut().active_while_paused = true;
        }
        world.simulation.editor_paused = true;

        world.act_all(ControllerMethod::FRAME);
        world.act_all_for_entity(idle, ControllerMethod::FRAME);
        assert_eq!(*log.lock(), vec![("game", ControllerMethod::FRAME, busy)]);
    }
}
