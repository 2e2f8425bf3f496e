//! # Entity Handles
//!
//! An entity is a bare 32-bit handle. The top bits name the *source file*
//! the entity was loaded from, the remaining bits are a local index inside
//! that source:
//!
//! ```text
//! 31      27 26                                   0
//! +---------+--------------------------------------+
//! | source  |             local index              |
//! +---------+--------------------------------------+
//! ```
//!
//! Handle `0` is the null entity. Local index `0` is reserved in every source
//! so that rebasing a handle onto source 0 at save time never yields null.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EcsError;

/// Identifier of a source file an entity belongs to.
pub type EntitySourceId = u8;

/// Bits reserved for the source ID.
pub const SOURCE_BITS: u32 = 5;

/// Bits reserved for the local index.
pub const LOCAL_BITS: u32 = 32 - SOURCE_BITS;

/// Mask extracting the local index.
pub const LOCAL_MASK: u32 = (1 << LOCAL_BITS) - 1;

/// Number of distinct sources.
pub const MAX_SOURCES: usize = 1 << SOURCE_BITS;

/// Handle to an entity.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct Entity(u32);

impl Entity {
    /// The null entity.
    pub const NULL: Self = Self(0);

    /// Builds a handle from a source ID and a local index.
    ///
    /// # Arguments
    ///
    /// * `source` - Source file ID (only the low [`SOURCE_BITS`] are used)
    /// * `local` - Index inside the source (only the low [`LOCAL_BITS`] are used)
    #[inline]
    #[must_use]
    pub const fn new(source: EntitySourceId, local: u32) -> Self {
        Self((((source as u32) & ((1 << SOURCE_BITS) - 1)) << LOCAL_BITS) | (local & LOCAL_MASK))
    }

    /// Wraps a raw handle.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit handle.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Source file this entity belongs to.
    #[inline]
    #[must_use]
    pub const fn source_id(self) -> EntitySourceId {
        (self.0 >> LOCAL_BITS) as EntitySourceId
    }

    /// Index inside the source.
    #[inline]
    #[must_use]
    pub const fn local_index(self) -> u32 {
        self.0 & LOCAL_MASK
    }

    /// The same local index rebased onto another source.
    #[inline]
    #[must_use]
    pub const fn with_source(self, source: EntitySourceId) -> Self {
        Self::new(source, self.local_index())
    }

    /// Checks if this is the null entity.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Entity {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::NULL);
        }
        trimmed
            .parse::<u32>()
            .map(Self)
            .map_err(|_| EcsError::InvalidEntity(s.to_string()))
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct EntityVisitor;

impl Visitor<'_> for EntityVisitor {
    type Value = Entity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an entity handle as a decimal string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Entity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Entity, E> {
        u32::try_from(v)
            .map(Entity)
            .map_err(|_| E::custom(format!("entity handle {v} out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Entity, E> {
        u32::try_from(v)
            .map(Entity)
            .map_err(|_| E::custom(format!("entity handle {v} out of range")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Entity, E> {
        Ok(Entity::NULL)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_and_local_split() {
        let e = Entity::new(3, 42);
        assert_eq!(e.source_id(), 3);
        assert_eq!(e.local_index(), 42);
        assert_eq!(e.raw(), (3 << LOCAL_BITS) | 42);
        assert_eq!(e.with_source(0), Entity::new(0, 42));
    }

    #[test]
    fn test_null() {
        assert!(Entity::NULL.is_null());
        assert!(Entity::default().is_null());
        assert!(!Entity::new(1, 0).is_null());
    }

    #[test]
    fn test_string_round_trip() {
        let e = Entity::new(2, 17);
        let text = e.to_string();
        assert_eq!(text.parse::<Entity>().unwrap(), e);
        assert_eq!("".parse::<Entity>().unwrap(), Entity::NULL);
        assert!("abc".parse::<Entity>().is_err());
    }

    #[test]
    fn test_yaml_accepts_string_and_int() {
        let a: Entity = serde_yaml::from_str("\"12\"").unwrap();
        let b: Entity = serde_yaml::from_str("12").unwrap();
        assert_eq!(a, b);
        let text = serde_yaml::to_string(&a).unwrap();
        let back: Entity = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, a);
    }
}
