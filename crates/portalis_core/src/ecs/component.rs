//! # Components
//!
//! A component is plain data attached to one or more entities. Every
//! component embeds a [`Base`] carrying the ECS bookkeeping; everything else
//! is domain data.
//!
//! Shareable components may be attached to several entities at once (a
//! material used by many sectors, say). They are stored once and
//! reference-counted through [`Base::attachments`], never copied.

use std::any::Any;
use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::flags::ComponentFlags;
use crate::dynamic::Dynamic;

/// Numeric component type ID. `0` is reserved and never assigned.
pub type ComponentId = u16;

/// Bookkeeping embedded in every component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Base {
    /// Primary owner.
    #[serde(skip)]
    pub entity: Entity,
    /// Every entity this component is attached to.
    #[serde(skip)]
    pub entities: BTreeSet<Entity>,
    /// Number of attachments.
    #[serde(skip)]
    pub attachments: u32,
    /// Slot in the owning arena.
    #[serde(skip)]
    pub index_in_arena: usize,
    /// Flags.
    #[serde(rename = "Flags", skip_serializing_if = "ComponentFlags::is_default")]
    pub flags: ComponentFlags,
    /// Controllers keep running while the editor is paused.
    #[serde(rename = "ActiveWhilePaused", skip_serializing_if = "is_false")]
    pub active_while_paused: bool,
}

impl Base {
    /// A base with the given flags.
    #[must_use]
    pub fn with_flags(flags: ComponentFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    /// Whether the `Active` flag is set.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.flags.contains(ComponentFlags::ACTIVE)
    }

    /// Resets the ownership fields, keeping flags.
    pub(crate) fn reset_ownership(&mut self) {
        self.entity = Entity::NULL;
        self.entities.clear();
        self.attachments = 0;
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// A component type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Debug, Default, Serialize, Deserialize)]
/// pub struct Health {
///     #[serde(flatten)]
///     base: Base,
///     #[serde(rename = "Points")]
///     points: f64,
/// }
///
/// impl Component for Health {
///     const NAME: &'static str = "game.Health";
///     component_base!();
/// }
/// ```
pub trait Component: Any + Send + Sync + Default + Clone + Serialize + DeserializeOwned {
    /// Stable type name used in world files.
    const NAME: &'static str;

    /// Whether one instance may be attached to several entities.
    const SHAREABLE: bool = false;

    /// Flags applied to newly constructed instances.
    const DEFAULT_FLAGS: ComponentFlags = ComponentFlags::ACTIVE;

    /// The embedded bookkeeping.
    fn base(&self) -> &Base;

    /// The embedded bookkeeping, mutably.
    fn base_mut(&mut self) -> &mut Base;

    /// Called when the component is attached to `entity`.
    fn on_attach(&mut self, _entity: Entity) {}

    /// Called when the component is detached from `entity`.
    fn on_detach(&mut self, _entity: Entity) {}

    /// Called right before the last attachment is removed.
    fn on_delete(&mut self) {}

    /// Visits every dynamic value owned by the component.
    fn for_each_dynamic(&mut self, _f: &mut dyn FnMut(&mut dyn Dynamic)) {}

    /// Visits every entity handle stored in the component.
    fn for_each_entity_ref(&mut self, _f: &mut dyn FnMut(&mut Entity)) {}

    /// Whether controllers act on the component.
    #[inline]
    fn is_active(&self) -> bool {
        self.base().is_active()
    }
}

/// Implements [`Component::base`] and [`Component::base_mut`] for a struct
/// with a `base: Base` field.
#[macro_export]
macro_rules! component_base {
    () => {
        fn base(&self) -> &$crate::ecs::Base {
            &self.base
        }

        fn base_mut(&mut self) -> &mut $crate::ecs::Base {
            &mut self.base
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_serializes_flags_only() {
        let mut base = Base::default();
        base.entity = Entity::from_raw(9);
        base.attachments = 3;
        let text = serde_yaml::to_string(&base).unwrap();
        assert!(!text.contains("Flags"));

        base.flags.insert(ComponentFlags::NO_SAVE);
        let text = serde_yaml::to_string(&base).unwrap();
        assert!(text.contains("Active|NoSave"));
        let back: Base = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.flags, base.flags);
        assert!(back.entity.is_null());
    }
}
