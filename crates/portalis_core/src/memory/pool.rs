//! # Entity Pool
//!
//! Allocates entity handles. Each source keeps its own bitmap of used local
//! indices; allocation returns the lowest free index, so a freshly cleared
//! world hands out `1, 2, 3, ...` again.

use crate::ecs::{Entity, EntitySourceId, LOCAL_MASK, MAX_SOURCES};

/// Bitmap allocator for entity handles.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = EntityPool::new();
/// let e = pool.allocate(0).unwrap();
/// assert_eq!(e.local_index(), 1);
/// pool.free(e);
/// ```
#[derive(Clone, Debug)]
pub struct EntityPool {
    /// Used-index bitmaps, one per source.
    sources: Vec<Vec<u64>>,
    /// Number of live entities.
    live: usize,
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: vec![Vec::new(); MAX_SOURCES],
            live: 0,
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// Allocates the lowest free local index of `source`.
    ///
    /// Local index 0 is never handed out.
    ///
    /// # Returns
    ///
    /// The new handle, or `None` if the source is exhausted.
    pub fn allocate(&mut self, source: EntitySourceId) -> Option<Entity> {
        let bits = self.sources.get_mut(source as usize)?;
        let mut local = None;
        for (w, word) in bits.iter().enumerate() {
            let mut free = !*word;
            if w == 0 {
                free &= !1;
            }
            if free != 0 {
                local = Some(w * 64 + free.trailing_zeros() as usize);
                break;
            }
        }
        let local = local.unwrap_or_else(|| (bits.len() * 64).max(1));
        if local > LOCAL_MASK as usize {
            return None;
        }
        let entity = Entity::new(source, local as u32);
        self.claim(entity);
        Some(entity)
    }

    /// Marks `entity` as live. Returns `false` if it already was, or if it is
    /// a reserved handle.
    pub fn claim(&mut self, entity: Entity) -> bool {
        let local = entity.local_index() as usize;
        if local == 0 {
            return false;
        }
        let Some(bits) = self.sources.get_mut(entity.source_id() as usize) else {
            return false;
        };
        let word = local / 64;
        if bits.len() <= word {
            bits.resize(word + 1, 0);
        }
        let mask = 1u64 << (local % 64);
        if bits[word] & mask != 0 {
            return false;
        }
        bits[word] |= mask;
        self.live += 1;
        true
    }

    /// Releases `entity`. Returns `false` if it was not live.
    pub fn free(&mut self, entity: Entity) -> bool {
        let local = entity.local_index() as usize;
        let Some(word) = self
            .sources
            .get_mut(entity.source_id() as usize)
            .and_then(|bits| bits.get_mut(local / 64))
        else {
            return false;
        };
        let mask = 1u64 << (local % 64);
        if *word & mask == 0 {
            return false;
        }
        *word &= !mask;
        self.live -= 1;
        true
    }

    /// Whether `entity` is live.
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        let local = entity.local_index() as usize;
        self.sources
            .get(entity.source_id() as usize)
            .and_then(|bits| bits.get(local / 64))
            .is_some_and(|word| word & (1 << (local % 64)) != 0)
    }

    /// Live entities of `source` in ascending order.
    #[must_use]
    pub fn live_in_source(&self, source: EntitySourceId) -> Vec<Entity> {
        let Some(bits) = self.sources.get(source as usize) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (w, word) in bits.iter().enumerate() {
            let mut rest = *word;
            while rest != 0 {
                let bit = rest.trailing_zeros() as usize;
                out.push(Entity::new(source, (w * 64 + bit) as u32));
                rest &= rest - 1;
            }
        }
        out
    }

    /// Every live entity, ordered by raw handle.
    #[must_use]
    pub fn live(&self) -> Vec<Entity> {
        (0..MAX_SOURCES as EntitySourceId)
            .flat_map(|s| self.live_in_source(s))
            .collect()
    }

    /// Releases every handle.
    pub fn clear(&mut self) {
        for bits in &mut self.sources {
            bits.clear();
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_lowest_free() {
        let mut pool = EntityPool::new();
        let a = pool.allocate(0).unwrap();
        let b = pool.allocate(0).unwrap();
        let c = pool.allocate(0).unwrap();
        assert_eq!((a.local_index(), b.local_index(), c.local_index()), (1, 2, 3));
        assert!(pool.free(b));
        assert_eq!(pool.allocate(0), Some(b));
        assert_eq!(pool.live_count(), 3);
    }

    #[test]
    fn test_sources_are_independent() {
        let mut pool = EntityPool::new();
        pool.allocate(0);
        let e = pool.allocate(4).unwrap();
        assert_eq!(e.source_id(), 4);
        assert_eq!(e.local_index(), 1);
        assert_eq!(pool.live_in_source(4), vec![e]);
    }

    #[test]
    fn test_claim_and_reserved() {
        let mut pool = EntityPool::new();
        assert!(!pool.claim(Entity::NULL));
        assert!(!pool.claim(Entity::new(2, 0)));
        let e = Entity::new(0, 130);
        assert!(pool.claim(e));
        assert!(!pool.claim(e));
        assert!(pool.is_live(e));
        assert_eq!(pool.allocate(0).unwrap().local_index(), 1);
    }

    #[test]
    fn test_spans_words() {
        let mut pool = EntityPool::new();
        for _ in 0..200 {
            pool.allocate(1);
        }
        let live = pool.live_in_source(1);
        assert_eq!(live.len(), 200);
        assert_eq!(live.last().unwrap().local_index(), 200);
        pool.clear();
        assert_eq!(pool.live_count(), 0);
        assert!(pool.live().is_empty());
    }
}
