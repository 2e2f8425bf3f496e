//! # Component Registry
//!
//! Maps Rust types and persisted type names to numeric component IDs. IDs
//! are assigned in registration order starting at 1; the order is part of a
//! world's identity because saved files list components in ID order.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{Component, ComponentId};
use crate::memory::{AnyArena, ComponentArena};

/// Metadata for one registered component type.
#[derive(Clone, Debug)]
pub struct ComponentType {
    /// Assigned ID.
    pub id: ComponentId,
    /// Persisted type name.
    pub name: &'static str,
    /// Whether instances may be shared.
    pub shareable: bool,
    type_id: TypeId,
    factory: fn() -> Box<dyn AnyArena>,
}

impl ComponentType {
    /// Creates an empty arena for this type.
    #[must_use]
    pub fn new_arena(&self) -> Box<dyn AnyArena> {
        (self.factory)()
    }
}

fn arena_factory<T: Component>() -> Box<dyn AnyArena> {
    Box::new(ComponentArena::<T>::new())
}

/// Registry of component types.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    types: Vec<ComponentType>,
    by_type: HashMap<TypeId, ComponentId>,
    by_name: HashMap<&'static str, ComponentId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, returning its ID and whether it was newly added.
    pub fn register<T: Component>(&mut self) -> (ComponentId, bool) {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return (id, false);
        }
        let id = (self.types.len() + 1) as ComponentId;
        self.types.push(ComponentType {
            id,
            name: T::NAME,
            shareable: T::SHAREABLE,
            type_id: TypeId::of::<T>(),
            factory: arena_factory::<T>,
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        if self.by_name.insert(T::NAME, id).is_some() {
            tracing::warn!(name = T::NAME, "Two component types share a name");
        }
        (id, true)
    }

    /// ID of `T`, if registered.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// ID registered under `name`.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Metadata for `id`.
    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<&ComponentType> {
        (id as usize).checked_sub(1).and_then(|i| self.types.get(i))
    }

    /// Whether `id` was registered for the Rust type `type_id`.
    #[must_use]
    pub fn is_type(&self, id: ComponentId, type_id: TypeId) -> bool {
        self.get(id).is_some_and(|t| t.type_id == type_id)
    }

    /// Every registered type in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::component_base;
    use crate::ecs::Base;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct A {
        #[serde(flatten)]
        base: Base,
    }

    impl Component for A {
        const NAME: &'static str = "test.A";
        component_base!();
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct B {
        #[serde(flatten)]
        base: Base,
    }

    impl Component for B {
        const NAME: &'static str = "test.B";
        const SHAREABLE: bool = true;
        component_base!();
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.register::<A>(), (1, true));
        assert_eq!(registry.register::<B>(), (2, true));
        assert_eq!(registry.register::<A>(), (1, false));
        assert_eq!(registry.id_by_name("test.B"), Some(2));
        assert!(registry.get(2).unwrap().shareable);
        assert!(registry.get(0).is_none());
        assert_eq!(registry.get(1).unwrap().new_arena().type_name(), "test.A");
    }
}
