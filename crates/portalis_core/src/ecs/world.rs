//! # ECS World
//!
//! The explicit context every engine operation runs against. A world owns:
//!
//! - the component registry and one arena per registered type
//! - a component table per live entity
//! - the entity allocator
//! - controllers, simulation state and the event queue
//!
//! Several worlds may coexist; nothing here is global.

use std::collections::HashMap;

use serde_yaml::Value;
use tracing::{debug, warn};

use super::component::{Base, Component, ComponentId};
use super::component_table::ComponentTable;
use super::controller::ControllerEntry;
use super::entity::{Entity, EntitySourceId};
use super::flags::ComponentFlags;
use super::named::Named;
use super::registry::ComponentRegistry;
use super::source_file::SourceFile;
use crate::dynamic::{Dynamic, EventQueue, Simulation, SimulationConfig};
use crate::error::{EcsError, EcsResult};
use crate::memory::{AnyArena, ComponentArena, EntityPool};

/// The ECS world.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// let e = world.new_entity();
/// world.attach_new::<Named>(e).unwrap().name = "door".into();
/// assert_eq!(world.entity_by_name("door"), Some(e));
/// ```
pub struct World {
    pub(crate) registry: ComponentRegistry,
    /// Arena of component `cid` lives at `cid - 1`.
    pub(crate) arenas: Vec<Box<dyn AnyArena>>,
    pub(crate) rows: HashMap<Entity, ComponentTable>,
    pub(crate) pool: EntityPool,
    pub(crate) controllers: Vec<ControllerEntry>,
    /// Fixed-step bookkeeping.
    pub simulation: Simulation,
    /// Pending events and their consumers.
    pub events: EventQueue,
    /// Timing configuration.
    pub config: SimulationConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.pool.live_count())
            .field("component_types", &self.registry.len())
            .field("controllers", &self.controllers.len())
            .field("simulation", &self.simulation)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates a world with default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Creates a world with the given timing configuration.
    #[must_use]
    pub fn with_config(config: SimulationConfig) -> Self {
        let mut world = Self {
            registry: ComponentRegistry::new(),
            arenas: Vec::new(),
            rows: HashMap::new(),
            pool: EntityPool::new(),
            controllers: Vec::new(),
            simulation: Simulation::default(),
            events: EventQueue::new(config.event_capacity),
            config,
        };
        world.register_component::<Named>();
        world.register_component::<SourceFile>();
        world
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Registers a component type and creates its arena.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        let (id, added) = self.registry.register::<T>();
        if added {
            if let Some(ty) = self.registry.get(id) {
                self.arenas.push(ty.new_arena());
            }
            debug!(component = T::NAME, id, "Registered component type");
        }
        id
    }

    /// ID of `T`, if registered.
    #[inline]
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.registry.id_of::<T>()
    }

    /// The component registry.
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Type-erased arena of `cid`.
    #[must_use]
    pub fn arena_dyn(&self, cid: ComponentId) -> Option<&dyn AnyArena> {
        let i = (cid as usize).checked_sub(1)?;
        self.arenas.get(i).map(|a| &**a)
    }

    fn arena_dyn_mut(&mut self, cid: ComponentId) -> Option<&mut (dyn AnyArena + 'static)> {
        let i = (cid as usize).checked_sub(1)?;
        self.arenas.get_mut(i).map(|a| &mut **a)
    }

    /// Arena of `T`.
    #[must_use]
    pub fn arena<T: Component>(&self) -> Option<&ComponentArena<T>> {
        self.arena_dyn(self.component_id::<T>()?)?
            .as_any()
            .downcast_ref()
    }

    /// Arena of `T`, mutably.
    pub fn arena_mut<T: Component>(&mut self) -> Option<&mut ComponentArena<T>> {
        let cid = self.component_id::<T>()?;
        self.arena_dyn_mut(cid)?.as_any_mut().downcast_mut()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Allocates an entity in source 0.
    ///
    /// Returns [`Entity::NULL`] (and logs) if the source is exhausted.
    pub fn new_entity(&mut self) -> Entity {
        self.new_entity_in_source(0).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to allocate entity");
            Entity::NULL
        })
    }

    /// Allocates the lowest free entity of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SourceExhausted`] when every index is taken.
    pub fn new_entity_in_source(&mut self, source: EntitySourceId) -> EcsResult<Entity> {
        let entity = self
            .pool
            .allocate(source)
            .ok_or(EcsError::SourceExhausted(source))?;
        self.rows.insert(entity, ComponentTable::new());
        Ok(entity)
    }

    /// Marks a specific handle live. Returns `false` if it already was.
    pub fn claim_entity(&mut self, entity: Entity) -> bool {
        if !self.pool.claim(entity) {
            return false;
        }
        self.rows.insert(entity, ComponentTable::new());
        true
    }

    /// Whether `entity` is live.
    #[inline]
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        !entity.is_null() && self.pool.is_live(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Every live entity ordered by handle.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.pool.live()
    }

    /// Live entities of `source` ordered by handle.
    #[must_use]
    pub fn entities_in_source(&self, source: EntitySourceId) -> Vec<Entity> {
        self.pool.live_in_source(source)
    }

    /// `(component id, arena index)` pairs of `entity`, ordered by ID.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<(ComponentId, usize)> {
        self.rows.get(&entity).map(ComponentTable::entries).unwrap_or_default()
    }

    /// The component table of `entity`.
    #[must_use]
    pub fn component_table(&self, entity: Entity) -> Option<&ComponentTable> {
        self.rows.get(&entity)
    }

    /// Deletes `entity`, detaching all of its components.
    pub fn delete(&mut self, entity: Entity) {
        if !self.is_live(entity) {
            return;
        }
        for (cid, _) in self.components_of(entity) {
            self.detach(cid, entity);
        }
        self.rows.remove(&entity);
        self.pool.free(entity);
    }

    /// Removes every entity and component, keeping registered types and
    /// controllers.
    pub fn clear(&mut self) {
        for arena in &mut self.arenas {
            arena.clear();
        }
        self.rows.clear();
        self.pool.clear();
        self.events.drain();
        let paused = self.simulation.editor_paused;
        self.simulation = Simulation {
            editor_paused: paused,
            ..Simulation::default()
        };
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Arena index of `entity`'s component `cid`.
    #[inline]
    #[must_use]
    pub fn component_index(&self, entity: Entity, cid: ComponentId) -> Option<usize> {
        self.rows.get(&entity)?.get(cid)
    }

    /// Whether `entity` has component `cid`.
    #[inline]
    #[must_use]
    pub fn has_id(&self, entity: Entity, cid: ComponentId) -> bool {
        self.component_index(entity, cid).is_some()
    }

    /// Whether `entity` has a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.component_id::<T>().is_some_and(|cid| self.has_id(entity, cid))
    }

    /// Bookkeeping of `entity`'s component `cid`.
    #[must_use]
    pub fn component_base(&self, entity: Entity, cid: ComponentId) -> Option<&Base> {
        let index = self.component_index(entity, cid)?;
        self.arena_dyn(cid)?.base(index)
    }

    /// Mutable bookkeeping of `entity`'s component `cid`.
    pub fn component_base_mut(&mut self, entity: Entity, cid: ComponentId) -> Option<&mut Base> {
        let index = self.component_index(entity, cid)?;
        self.arena_dyn_mut(cid)?.base_mut(index)
    }

    /// `entity`'s `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let cid = self.component_id::<T>()?;
        let index = self.component_index(entity, cid)?;
        self.arena::<T>()?.get(index)
    }

    /// `entity`'s `T`, mutably.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let cid = self.component_id::<T>()?;
        let index = self.component_index(entity, cid)?;
        self.arena_mut::<T>()?.get_mut(index)
    }

    fn bind(&mut self, cid: ComponentId, entity: Entity, index: usize) {
        if let Some(row) = self.rows.get_mut(&entity) {
            row.set(cid, index);
        }
        let Some(arena) = self.arena_dyn_mut(cid) else {
            return;
        };
        if let Some(base) = arena.base_mut(index) {
            base.entities.insert(entity);
            base.attachments += 1;
            if base.entity.is_null() {
                base.entity = entity;
            }
        }
        arena.notify_attach(index, entity);
    }

    fn check_attach(&self, cid: ComponentId, entity: Entity) -> bool {
        if entity.is_null() {
            warn!(cid, "Attaching a component to the null entity");
            return false;
        }
        if self.arena_dyn(cid).is_none() {
            warn!(cid, "Attaching an unregistered component type");
            return false;
        }
        if !self.is_live(entity) {
            warn!(%entity, cid, "Attaching a component to a dead entity");
            return false;
        }
        true
    }

    fn is_shared(&self, cid: ComponentId, index: usize) -> bool {
        self.arena_dyn(cid)
            .and_then(|a| a.base(index))
            .is_some_and(|b| b.attachments > 1)
    }

    /// Attaches a default-constructed component `cid` to `entity`.
    ///
    /// An existing component of that type has its payload replaced, unless it
    /// is shared with other entities, in which case nothing changes.
    ///
    /// # Returns
    ///
    /// The arena index, or `None` if the attach was rejected.
    pub fn attach_default(&mut self, cid: ComponentId, entity: Entity) -> Option<usize> {
        if !self.check_attach(cid, entity) {
            return None;
        }
        if let Some(existing) = self.component_index(entity, cid) {
            if !self.is_shared(cid, existing) {
                self.arena_dyn_mut(cid)?.replace_default(existing);
            }
            return Some(existing);
        }
        let index = self.arena_dyn_mut(cid)?.add_default();
        self.bind(cid, entity, index);
        Some(index)
    }

    /// Attaches a default-constructed `T` to `entity` and returns it.
    pub fn attach_new<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let cid = self.component_id::<T>()?;
        let index = self.attach_default(cid, entity)?;
        self.arena_mut::<T>()?.get_mut(index)
    }

    /// Attaches `value` to `entity`, replacing the payload of an unshared
    /// existing `T`.
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        let cid = self.component_id::<T>()?;
        if !self.check_attach(cid, entity) {
            return None;
        }
        let index = match self.component_index(entity, cid) {
            Some(existing) => {
                if !self.is_shared(cid, existing) {
                    self.arena_mut::<T>()?.replace(existing, value);
                }
                existing
            }
            None => {
                let index = self.arena_mut::<T>()?.add(value);
                self.bind(cid, entity, index);
                index
            }
        };
        self.arena_mut::<T>()?.get_mut(index)
    }

    /// Attaches the existing component at `index` of arena `cid` to `entity`.
    ///
    /// Non-shareable components that are already attached elsewhere are
    /// rejected. A different component of the same type on `entity` is
    /// detached first.
    pub fn attach_existing(&mut self, cid: ComponentId, entity: Entity, index: usize) -> bool {
        if !self.check_attach(cid, entity) {
            return false;
        }
        let Some(arena) = self.arena_dyn(cid) else {
            return false;
        };
        let Some(base) = arena.base(index) else {
            warn!(cid, index, "Attaching an empty arena slot");
            return false;
        };
        if !arena.shareable() && base.attachments > 0 && !base.entities.contains(&entity) {
            warn!(component = arena.type_name(), %entity, "Component is not shareable");
            return false;
        }
        match self.component_index(entity, cid) {
            Some(current) if current == index => return true,
            Some(_) => self.detach(cid, entity),
            None => {}
        }
        self.bind(cid, entity, index);
        true
    }

    /// Detaches component `cid` from `entity`. The component is removed once
    /// its last attachment goes.
    pub fn detach(&mut self, cid: ComponentId, entity: Entity) {
        let Some(index) = self.rows.get_mut(&entity).and_then(|r| r.remove(cid)) else {
            warn!(%entity, cid, "Detaching a component that is not attached");
            return;
        };
        let Some(arena) = self.arena_dyn_mut(cid) else {
            return;
        };
        arena.notify_detach(index, entity);
        let remaining = match arena.base_mut(index) {
            Some(base) => {
                base.entities.remove(&entity);
                base.attachments = base.attachments.saturating_sub(1);
                if base.entity == entity {
                    base.entity = base.entities.iter().next().copied().unwrap_or(Entity::NULL);
                }
                base.attachments
            }
            None => 0,
        };
        if remaining == 0 {
            arena.remove(index);
        }
    }

    /// Detaches `entity`'s `T`.
    pub fn detach_component<T: Component>(&mut self, entity: Entity) {
        if let Some(cid) = self.component_id::<T>() {
            self.detach(cid, entity);
        }
    }

    /// Attaches every shareable component of `source` to `target`.
    pub fn link(&mut self, target: Entity, source: Entity) {
        for (cid, index) in self.components_of(source) {
            if self.arena_dyn(cid).is_some_and(|a| a.shareable()) {
                self.attach_existing(cid, target, index);
            }
        }
    }

    /// Copies the component at `index` of arena `cid` into a fresh,
    /// unattached slot.
    pub fn clone_component(&mut self, cid: ComponentId, index: usize) -> Option<usize> {
        self.arena_dyn_mut(cid)?.clone_slot(index)
    }

    /// Frees an unattached slot made by [`World::clone_component`] or
    /// [`World::decode_component`]. Attached slots are left alone.
    ///
    /// # Returns
    ///
    /// Whether the slot was freed.
    pub fn discard_component(&mut self, cid: ComponentId, index: usize) -> bool {
        let Some(arena) = self.arena_dyn_mut(cid) else {
            return false;
        };
        match arena.base(index) {
            Some(base) if base.attachments == 0 => {
                arena.remove(index);
                true
            }
            Some(_) => {
                warn!(component = arena.type_name(), index, "Discarding an attached component");
                false
            }
            None => false,
        }
    }

    /// Encodes `entity`'s component `cid`.
    ///
    /// # Errors
    ///
    /// Fails if the component is missing or cannot be encoded.
    pub fn encode_component(&self, cid: ComponentId, index: usize) -> EcsResult<Value> {
        self.arena_dyn(cid)
            .ok_or(EcsError::UnknownComponentId(cid))?
            .encode(index)
    }

    /// Decodes a component of type `cid` into a fresh, unattached slot.
    ///
    /// # Errors
    ///
    /// Fails if the type is unknown or the value does not decode.
    pub fn decode_component(&mut self, cid: ComponentId, value: Value) -> EcsResult<usize> {
        self.arena_dyn_mut(cid)
            .ok_or(EcsError::UnknownComponentId(cid))?
            .decode(value)
    }

    /// Visits the entity handles stored in a component.
    pub fn for_each_entity_ref(&mut self, cid: ComponentId, index: usize, f: &mut dyn FnMut(&mut Entity)) {
        if let Some(arena) = self.arena_dyn_mut(cid) {
            arena.for_each_entity_ref(index, f);
        }
    }

    /// Visits every dynamic value in the world.
    pub fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        for arena in &mut self.arenas {
            arena.for_each_dynamic(f);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every entity owning a component of type `cid`, in arena order.
    #[must_use]
    pub fn owners_of(&self, cid: ComponentId) -> Vec<Entity> {
        let Some(arena) = self.arena_dyn(cid) else {
            return Vec::new();
        };
        arena
            .indices()
            .into_iter()
            .filter_map(|i| arena.base(i))
            .flat_map(|b| b.entities.iter().copied())
            .collect()
    }

    /// Every entity owning a `T`.
    #[must_use]
    pub fn owners<T: Component>(&self) -> Vec<Entity> {
        self.component_id::<T>()
            .map(|cid| self.owners_of(cid))
            .unwrap_or_default()
    }

    /// Iterates every `T` with its primary owner.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.arena::<T>()
            .into_iter()
            .flat_map(|a| a.iter())
            .map(|(_, c)| (c.base().entity, c))
    }

    /// The first `T` in arena order with its primary owner.
    #[must_use]
    pub fn first<T: Component>(&self) -> Option<(Entity, &T)> {
        self.iter::<T>().next()
    }

    /// The first `T`, creating an entity carrying one if none exists.
    pub fn singleton<T: Component>(&mut self) -> Option<&mut T> {
        let existing = self
            .arena::<T>()?
            .iter()
            .next()
            .map(|(i, _)| i);
        let index = match existing {
            Some(i) => i,
            None => {
                let cid = self.component_id::<T>()?;
                let entity = self.new_entity();
                self.attach_default(cid, entity)?
            }
        };
        self.arena_mut::<T>()?.get_mut(index)
    }

    /// Looks an entity up by its [`Named`] component.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<Entity> {
        self.iter::<Named>()
            .find(|(_, n)| n.name == name)
            .map(|(e, _)| e)
    }

    /// Whether every component on `entity` is flagged `NoSave`.
    #[must_use]
    pub fn entity_all_no_save(&self, entity: Entity) -> bool {
        self.components_of(entity).iter().all(|&(cid, index)| {
            self.arena_dyn(cid)
                .and_then(|a| a.base(index))
                .is_some_and(|b| b.flags.contains(ComponentFlags::NO_SAVE))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::component_base;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Health {
        #[serde(flatten)]
        base: Base,
        #[serde(rename = "Points", default)]
        points: f64,
    }

    impl Component for Health {
        const NAME: &'static str = "test.Health";
        component_base!();
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Paint {
        #[serde(flatten)]
        base: Base,
        #[serde(rename = "Color", default)]
        color: u32,
    }

    impl Component for Paint {
        const NAME: &'static str = "test.Paint";
        const SHAREABLE: bool = true;
        component_base!();
    }

    fn world() -> World {
        let mut world = World::new();
        world.register_component::<Health>();
        world.register_component::<Paint>();
        world
    }

    #[test]
    fn test_entities_start_at_one() {
        let mut world = world();
        assert_eq!(world.new_entity(), Entity::new(0, 1));
        assert_eq!(world.new_entity(), Entity::new(0, 2));
    }

    #[test]
    fn test_attach_and_get() {
        let mut world = world();
        let e = world.new_entity();
        world.attach(e, Health { points: 10.0, ..Health::default() });
        assert_eq!(world.get::<Health>(e).unwrap().points, 10.0);
        assert_eq!(world.get::<Health>(e).unwrap().base.entity, e);
        assert!(world.get::<Paint>(e).is_none());
    }

    #[test]
    fn test_attach_default_replaces_payload() {
        let mut world = world();
        let e = world.new_entity();
        world.attach(e, Health { points: 10.0, ..Health::default() });
        let cid = world.component_id::<Health>().unwrap();
        world.attach_default(cid, e);
        let h = world.get::<Health>(e).unwrap();
        assert_eq!(h.points, 0.0);
        assert_eq!(h.base.attachments, 1);
    }

    #[test]
    fn test_attach_then_detach_leaves_table_empty() {
        let mut world = world();
        let e = world.new_entity();
        let cid = world.component_id::<Health>().unwrap();
        world.attach_default(cid, e);
        world.detach(cid, e);
        assert!(world.component_table(e).unwrap().is_empty());
        assert!(world.arena::<Health>().unwrap().is_empty());
    }

    #[test]
    fn test_shared_component_refcount() {
        let mut world = world();
        let a = world.new_entity();
        let b = world.new_entity();
        let cid = world.component_id::<Paint>().unwrap();
        let index = world.attach_default(cid, a).unwrap();
        assert!(world.attach_existing(cid, b, index));
        assert_eq!(world.get::<Paint>(a).unwrap().base.attachments, 2);

        world.get_mut::<Paint>(b).unwrap().color = 7;
        assert_eq!(world.get::<Paint>(a).unwrap().color, 7, "shared, not copied");

        world.delete(a);
        let paint = world.get::<Paint>(b).unwrap();
        assert_eq!(paint.base.attachments, 1);
        assert_eq!(paint.base.entity, b);
        world.delete(b);
        assert!(world.arena::<Paint>().unwrap().is_empty());
    }

    #[test]
    fn test_non_shareable_rejects_second_owner() {
        let mut world = world();
        let a = world.new_entity();
        let b = world.new_entity();
        let cid = world.component_id::<Health>().unwrap();
        let index = world.attach_default(cid, a).unwrap();
        assert!(!world.attach_existing(cid, b, index));
        assert!(world.get::<Health>(b).is_none());
    }

    #[test]
    fn test_attach_to_null_is_ignored() {
        let mut world = world();
        let cid = world.component_id::<Health>().unwrap();
        assert!(world.attach_default(cid, Entity::NULL).is_none());
    }

    #[test]
    fn test_link_shares_only_shareable() {
        let mut world = world();
        let a = world.new_entity();
        world.attach_new::<Paint>(a);
        world.attach_new::<Health>(a);
        let b = world.new_entity();
        world.link(b, a);
        assert!(world.has::<Paint>(b));
        assert!(!world.has::<Health>(b));
    }

    #[test]
    fn test_delete_frees_handle() {
        let mut world = world();
        let a = world.new_entity();
        world.attach_new::<Health>(a);
        world.delete(a);
        assert!(!world.is_live(a));
        assert_eq!(world.new_entity(), a);
        assert!(world.get::<Health>(a).is_none());
    }

    #[test]
    fn test_singleton_and_names() {
        let mut world = world();
        world.singleton::<Health>().unwrap().points = 3.0;
        world.singleton::<Health>().unwrap().points += 1.0;
        assert_eq!(world.arena::<Health>().unwrap().len(), 1);
        assert_eq!(world.first::<Health>().unwrap().1.points, 4.0);

        let e = world.new_entity();
        world.attach_new::<Named>(e).unwrap().name = "door".into();
        assert_eq!(world.entity_by_name("door"), Some(e));
        assert_eq!(world.entity_by_name("window"), None);
    }

    #[test]
    fn test_entity_all_no_save() {
        let mut world = world();
        let e = world.new_entity();
        world.attach_new::<Health>(e).unwrap().base.flags.insert(ComponentFlags::NO_SAVE);
        assert!(world.entity_all_no_save(e));
        world.attach_new::<Paint>(e);
        assert!(!world.entity_all_no_save(e));
    }

    #[test]
    fn test_clear_keeps_registry() {
        let mut world = world();
        let e = world.new_entity();
        world.attach_new::<Health>(e);
        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert!(world.component_id::<Health>().is_some());
        assert_eq!(world.new_entity(), e);
    }

    #[test]
    fn test_discard_only_frees_unattached_slots() {
        let mut world = world();
        let e = world.new_entity();
        let cid = world.component_id::<Health>().unwrap();
        let index = world.attach_default(cid, e).unwrap();
        let copy = world.clone_component(cid, index).unwrap();
        assert!(!world.discard_component(cid, index));
        assert!(world.discard_component(cid, copy));
        assert_eq!(world.arena::<Health>().unwrap().len(), 1);
    }
}
