//! # Component Tables
//!
//! Each live entity owns a small open-addressed table mapping component IDs
//! to arena slots. Entities rarely carry more than a handful of components,
//! so the table starts at 8 slots and grows by 8 whenever probing from a
//! key's home slot runs off the end.

use super::component::ComponentId;

/// Initial number of slots.
pub const INITIAL_CAPACITY: usize = 8;

/// Slots added on growth.
pub const GROWTH: usize = 8;

/// Open-addressed `ComponentId -> arena index` map.
#[derive(Clone, Debug)]
pub struct ComponentTable {
    slots: Vec<Option<(ComponentId, usize)>>,
    len: usize,
}

impl Default for ComponentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![None; INITIAL_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    fn home(&self, cid: ComponentId) -> usize {
        cid as usize % self.slots.len()
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the table is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn position(&self, cid: ComponentId) -> Option<usize> {
        for i in self.home(cid)..self.slots.len() {
            match self.slots[i] {
                Some((key, _)) if key == cid => return Some(i),
                Some(_) => {}
                None => return None,
            }
        }
        None
    }

    /// Arena index stored for `cid`.
    #[must_use]
    pub fn get(&self, cid: ComponentId) -> Option<usize> {
        self.position(cid).and_then(|i| self.slots[i].map(|(_, index)| index))
    }

    /// Whether `cid` is present.
    #[must_use]
    pub fn contains(&self, cid: ComponentId) -> bool {
        self.position(cid).is_some()
    }

    /// Inserts or overwrites the entry for `cid`.
    pub fn set(&mut self, cid: ComponentId, index: usize) {
        loop {
            for i in self.home(cid)..self.slots.len() {
                match self.slots[i] {
                    Some((key, _)) if key == cid => {
                        self.slots[i] = Some((cid, index));
                        return;
                    }
                    Some(_) => {}
                    None => {
                        self.slots[i] = Some((cid, index));
                        self.len += 1;
                        return;
                    }
                }
            }
            self.grow();
        }
    }

    fn grow(&mut self) {
        let entries: Vec<_> = self.slots.iter().flatten().copied().collect();
        let mut capacity = self.slots.len() + GROWTH;
        loop {
            if let Some(slots) = Self::rehash(&entries, capacity) {
                self.slots = slots;
                return;
            }
            capacity += GROWTH;
        }
    }

    fn rehash(
        entries: &[(ComponentId, usize)],
        capacity: usize,
    ) -> Option<Vec<Option<(ComponentId, usize)>>> {
        let mut slots = vec![None; capacity];
        'entries: for &(cid, index) in entries {
            for slot in slots.iter_mut().skip(cid as usize % capacity) {
                if slot.is_none() {
                    *slot = Some((cid, index));
                    continue 'entries;
                }
            }
            return None;
        }
        Some(slots)
    }

    /// Removes the entry for `cid`, shifting probe chains back over the hole.
    pub fn remove(&mut self, cid: ComponentId) -> Option<usize> {
        let mut hole = self.position(cid)?;
        let removed = self.slots[hole].take().map(|(_, index)| index);
        self.len -= 1;

        for j in hole + 1..self.slots.len() {
            let Some((key, index)) = self.slots[j] else {
                break;
            };
            if self.home(key) <= hole {
                self.slots[hole] = Some((key, index));
                self.slots[j] = None;
                hole = j;
            }
        }
        removed
    }

    /// Entries sorted by component ID.
    #[must_use]
    pub fn entries(&self) -> Vec<(ComponentId, usize)> {
        let mut out: Vec<_> = self.slots.iter().flatten().copied().collect();
        out.sort_unstable_by_key(|(cid, _)| *cid);
        out
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.slots = vec![None; INITIAL_CAPACITY];
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let mut table = ComponentTable::new();
        table.set(3, 10);
        table.set(5, 20);
        assert_eq!(table.get(3), Some(10));
        table.set(3, 11);
        assert_eq!(table.get(3), Some(11));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(4), None);
    }

    #[test]
    fn test_grows_on_probe_overflow() {
        let mut table = ComponentTable::new();
        // 7 and 15 share the last home slot of an 8-slot table.
        table.set(7, 1);
        table.set(15, 2);
        assert!(table.capacity() > INITIAL_CAPACITY);
        assert_eq!(table.get(7), Some(1));
        assert_eq!(table.get(15), Some(2));
    }

    #[test]
    fn test_remove_keeps_chains_reachable() {
        let mut table = ComponentTable::new();
        table.set(1, 100);
        table.set(9, 900);
        table.set(17, 1700);
        table.set(2, 200);
        assert_eq!(table.remove(1), Some(100));
        assert_eq!(table.get(9), Some(900));
        assert_eq!(table.get(17), Some(1700));
        assert_eq!(table.get(2), Some(200));
        assert_eq!(table.len(), 3);
        assert_eq!(table.remove(1), None);
    }

    #[test]
    fn test_many_entries() {
        let mut table = ComponentTable::new();
        for cid in 1..40 {
            table.set(cid, cid as usize * 2);
        }
        for cid in (1..40).step_by(2) {
            table.remove(cid);
        }
        for cid in 1..40 {
            let expected = (cid % 2 == 0).then_some(cid as usize * 2);
            assert_eq!(table.get(cid), expected, "cid {cid}");
        }
        let entries = table.entries();
        assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
