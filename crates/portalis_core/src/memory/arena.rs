//! # Component Arena
//!
//! Chunked storage for one component type. Slots never move once filled, so
//! an index handed out by [`ComponentArena::add`] stays valid until the slot
//! is detached.
//!
//! ## Design Philosophy
//!
//! - **Chunked growth**: capacity grows in chunks of [`CHUNK_SIZE`]; existing
//!   chunks are never reallocated
//! - **Fill bitmap**: one bit per slot, set exactly when the slot is occupied
//! - **Lowest free slot**: additions reuse the lowest empty slot first

use std::any::Any;

use serde_yaml::Value;
use tracing::warn;

use crate::dynamic::Dynamic;
use crate::ecs::{Base, Component, Entity};
use crate::error::{EcsError, EcsResult};

/// Slots per chunk.
pub const CHUNK_SIZE: usize = 64;

/// Chunked, pointer-stable storage for components of type `T`.
pub struct ComponentArena<T> {
    /// Fixed-size chunks.
    chunks: Vec<Box<[Option<T>]>>,
    /// One bit per slot.
    fill: Vec<u64>,
    /// Occupied slots.
    len: usize,
}

impl<T> Default for ComponentArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComponentArena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunks: Vec::new(),
            fill: Vec::new(),
            len: 0,
        }
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slots across all chunks.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * CHUNK_SIZE
    }

    /// Whether `index` is occupied.
    #[inline]
    #[must_use]
    pub fn is_filled(&self, index: usize) -> bool {
        self.fill
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Number of set bits in the fill bitmap.
    #[must_use]
    pub fn fill_count(&self) -> usize {
        self.fill.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Component at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(index / CHUNK_SIZE)
            .and_then(|chunk| chunk[index % CHUNK_SIZE].as_ref())
    }

    /// Component at `index`, mutably.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.chunks
            .get_mut(index / CHUNK_SIZE)
            .and_then(|chunk| chunk[index % CHUNK_SIZE].as_mut())
    }

    /// Iterates occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.chunks.iter().enumerate().flat_map(|(c, chunk)| {
            chunk
                .iter()
                .enumerate()
                .filter_map(move |(i, slot)| slot.as_ref().map(|v| (c * CHUNK_SIZE + i, v)))
        })
    }

    /// Iterates occupied slots mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.chunks.iter_mut().enumerate().flat_map(|(c, chunk)| {
            chunk
                .iter_mut()
                .enumerate()
                .filter_map(move |(i, slot)| slot.as_mut().map(|v| (c * CHUNK_SIZE + i, v)))
        })
    }

    /// Indices of occupied slots in ascending order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.iter().map(|(i, _)| i).collect()
    }

    fn lowest_free(&mut self) -> usize {
        for (w, word) in self.fill.iter().enumerate() {
            if *word != u64::MAX {
                return w * 64 + word.trailing_ones() as usize;
            }
        }
        self.chunks.push((0..CHUNK_SIZE).map(|_| None).collect());
        self.fill.push(0);
        (self.chunks.len() - 1) * CHUNK_SIZE
    }

    /// Removes and returns the component at `index`.
    pub fn take(&mut self, index: usize) -> Option<T> {
        let value = self.chunks.get_mut(index / CHUNK_SIZE)?[index % CHUNK_SIZE].take()?;
        self.fill[index / 64] &= !(1 << (index % 64));
        self.len -= 1;
        Some(value)
    }

    /// Empties the arena, keeping its chunks.
    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            for slot in chunk.iter_mut() {
                *slot = None;
            }
        }
        self.fill.iter_mut().for_each(|w| *w = 0);
        self.len = 0;
    }
}

impl<T: Component> ComponentArena<T> {
    /// Stores `value` in the lowest free slot and returns the slot index.
    ///
    /// The component's ownership bookkeeping is reset; the caller attaches it.
    pub fn add(&mut self, mut value: T) -> usize {
        let index = self.lowest_free();
        value.base_mut().reset_ownership();
        value.base_mut().index_in_arena = index;
        self.chunks[index / CHUNK_SIZE][index % CHUNK_SIZE] = Some(value);
        self.fill[index / 64] |= 1 << (index % 64);
        self.len += 1;
        index
    }

    /// Overwrites the payload at `index`, keeping the slot's ownership.
    ///
    /// Returns `false` when the slot is empty.
    pub fn replace(&mut self, index: usize, mut value: T) -> bool {
        let Some(slot) = self.get_mut(index) else {
            return false;
        };
        let base = slot.base();
        let (entity, entities, attachments) = (base.entity, base.entities.clone(), base.attachments);
        let fresh = value.base_mut();
        fresh.entity = entity;
        fresh.entities = entities;
        fresh.attachments = attachments;
        fresh.index_in_arena = index;
        *slot = value;
        true
    }
}

// =============================================================================
// TYPE-ERASED ACCESS
// =============================================================================

/// Object-safe view of a [`ComponentArena`], used by the world for
/// operations that do not know the concrete component type.
pub trait AnyArena: Send + Sync {
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    /// Downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Stable type name.
    fn type_name(&self) -> &'static str;
    /// Whether components may be shared.
    fn shareable(&self) -> bool;
    /// Occupied slots.
    fn len(&self) -> usize;
    /// Whether no slot is occupied.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Total slots.
    fn capacity(&self) -> usize;
    /// Occupied slot indices.
    fn indices(&self) -> Vec<usize>;
    /// Bookkeeping of the component at `index`.
    fn base(&self, index: usize) -> Option<&Base>;
    /// Bookkeeping of the component at `index`, mutably.
    fn base_mut(&mut self, index: usize) -> Option<&mut Base>;
    /// Adds a default-constructed component.
    fn add_default(&mut self) -> usize;
    /// Replaces the payload at `index` with a default-constructed one.
    fn replace_default(&mut self, index: usize) -> bool;
    /// Adds a copy of the component at `index`.
    fn clone_slot(&mut self, index: usize) -> Option<usize>;
    /// Runs the attach hook.
    fn notify_attach(&mut self, index: usize, entity: Entity);
    /// Runs the detach hook.
    fn notify_detach(&mut self, index: usize, entity: Entity);
    /// Runs the delete hook and frees the slot.
    fn remove(&mut self, index: usize);
    /// Frees every slot.
    fn clear(&mut self);
    /// Encodes the component at `index`.
    fn encode(&self, index: usize) -> EcsResult<Value>;
    /// Decodes a component into a fresh slot.
    fn decode(&mut self, value: Value) -> EcsResult<usize>;
    /// Visits the dynamic values of every occupied slot.
    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic));
    /// Visits the entity handles of the component at `index`.
    fn for_each_entity_ref(&mut self, index: usize, f: &mut dyn FnMut(&mut Entity));
}

impl std::fmt::Debug for dyn AnyArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

fn fresh<T: Component>() -> T {
    let mut value = T::default();
    value.base_mut().flags = T::DEFAULT_FLAGS;
    value
}

impl<T: Component> AnyArena for ComponentArena<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn shareable(&self) -> bool {
        T::SHAREABLE
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        ComponentArena::capacity(self)
    }

    fn indices(&self) -> Vec<usize> {
        ComponentArena::indices(self)
    }

    fn base(&self, index: usize) -> Option<&Base> {
        self.get(index).map(Component::base)
    }

    fn base_mut(&mut self, index: usize) -> Option<&mut Base> {
        self.get_mut(index).map(Component::base_mut)
    }

    fn add_default(&mut self) -> usize {
        self.add(fresh::<T>())
    }

    fn replace_default(&mut self, index: usize) -> bool {
        self.replace(index, fresh::<T>())
    }

    fn clone_slot(&mut self, index: usize) -> Option<usize> {
        let copy = self.get(index)?.clone();
        Some(self.add(copy))
    }

    fn notify_attach(&mut self, index: usize, entity: Entity) {
        if let Some(c) = self.get_mut(index) {
            c.on_attach(entity);
        }
    }

    fn notify_detach(&mut self, index: usize, entity: Entity) {
        if let Some(c) = self.get_mut(index) {
            c.on_detach(entity);
        }
    }

    fn remove(&mut self, index: usize) {
        if let Some(c) = self.get_mut(index) {
            c.on_delete();
        }
        if self.take(index).is_none() {
            warn!(component = T::NAME, index, "Removing an empty arena slot");
        }
    }

    fn clear(&mut self) {
        ComponentArena::clear(self);
    }

    fn encode(&self, index: usize) -> EcsResult<Value> {
        let c = self.get(index).ok_or(EcsError::Encode {
            component: T::NAME,
            message: format!("slot {index} is empty"),
        })?;
        serde_yaml::to_value(c).map_err(|e| EcsError::Encode {
            component: T::NAME,
            message: e.to_string(),
        })
    }

    fn decode(&mut self, value: Value) -> EcsResult<usize> {
        let c: T = serde_yaml::from_value(value).map_err(|e| EcsError::Decode {
            component: T::NAME,
            message: e.to_string(),
        })?;
        Ok(self.add(c))
    }

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        for (_, c) in self.iter_mut() {
            c.for_each_dynamic(f);
        }
    }

    fn for_each_entity_ref(&mut self, index: usize, f: &mut dyn FnMut(&mut Entity)) {
        if let Some(c) = self.get_mut(index) {
            c.for_each_entity_ref(f);
        }
    }
}
