//! Component flag bitset.
//!
//! Persisted as a `|`-joined list of names (`"Active|NoSave"`). The default
//! set (`Active` only) is omitted from saved files.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Per-component flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentFlags(u16);

impl ComponentFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Controllers act on this component.
    pub const ACTIVE: Self = Self(1 << 0);
    /// Never written to world files.
    pub const NO_SAVE: Self = Self(1 << 1);
    /// Hidden from editor component lists.
    pub const HIDE_IN_EDITOR: Self = Self(1 << 2);
    /// Hides the owning entity from editor lists.
    pub const HIDE_ENTITY_IN_EDITOR: Self = Self(1 << 3);
    /// The component cannot be edited.
    pub const LOCKED_IN_EDITOR: Self = Self(1 << 4);
    /// The owning entity cannot be edited.
    pub const LOCKED_ENTITY_IN_EDITOR: Self = Self(1 << 5);
    /// Engine-managed bookkeeping: never saved, never shown.
    pub const INTERNAL: Self = Self(Self::NO_SAVE.0 | Self::HIDE_IN_EDITOR.0 | Self::LOCKED_IN_EDITOR.0);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::ACTIVE, "Active"),
        (Self::NO_SAVE, "NoSave"),
        (Self::HIDE_IN_EDITOR, "HideInEditor"),
        (Self::HIDE_ENTITY_IN_EDITOR, "HideEntityInEditor"),
        (Self::LOCKED_IN_EDITOR, "LockedInEditor"),
        (Self::LOCKED_ENTITY_IN_EDITOR, "LockedEntityInEditor"),
    ];

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Checks whether every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags in `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Sets or clears the flags in `other`.
    #[inline]
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    /// True for the default set.
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Parses a `|`-joined name list. Unknown names are logged and skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut flags = Self::NONE;
        for name in text.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            match Self::NAMES.iter().find(|(_, n)| *n == name) {
                Some((flag, _)) => flags.insert(*flag),
                None => warn!(flag = name, "Unknown component flag"),
            }
        }
        flags
    }
}

impl Default for ComponentFlags {
    fn default() -> Self {
        Self::ACTIVE
    }
}

impl BitOr for ComponentFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ComponentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for ComponentFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}
