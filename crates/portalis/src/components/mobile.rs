//! Mobiles: bodies that move under forces and collide.
//!
//! Persisted collision responses are `|`-joined names (`"Bounce|Stop"`),
//! written the same way component flags are.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use portalis_core::{component_base, Base, Component, Dynamic, DynamicValue};
use portalis_shared::constants::PLAYER_MOUNT_HEIGHT;
use portalis_shared::Vec3;

use crate::serde_helpers::{default_true, is_true};

/// What a mobile does when it touches something.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollisionResponse(u8);

impl CollisionResponse {
    /// Passes through.
    pub const NONE: Self = Self(0);
    /// Pushed apart until no longer overlapping.
    pub const SEPARATE: Self = Self(1 << 0);
    /// Velocity reflected about the contact normal.
    pub const BOUNCE: Self = Self(1 << 1);
    /// Horizontal velocity zeroed.
    pub const STOP: Self = Self(1 << 2);
    /// Entity deleted.
    pub const REMOVE: Self = Self(1 << 3);
    /// Mobile deactivated.
    pub const DEACTIVATE: Self = Self(1 << 4);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::SEPARATE, "Separate"),
        (Self::BOUNCE, "Bounce"),
        (Self::STOP, "Stop"),
        (Self::REMOVE, "Remove"),
        (Self::DEACTIVATE, "Deactivate"),
    ];

    /// Checks whether every response in `other` is set. `NONE` is contained
    /// only in `NONE`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        if other.0 == 0 {
            return self.0 == 0;
        }
        self.0 & other.0 == other.0
    }

    /// Whether no response is set.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Parses a `|`-joined name list. Unknown names are logged and skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut response = Self::NONE;
        for name in text.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            if name == "None" {
                continue;
            }
            match Self::NAMES.iter().find(|(_, n)| *n == name) {
                Some((r, _)) => response |= *r,
                None => warn!(response = name, "Unknown collision response"),
            }
        }
        response
    }
}

impl BitOr for CollisionResponse {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionResponse {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CollisionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }
        let mut first = true;
        for (r, name) in Self::NAMES {
            if self.contains(r) {
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

impl Serialize for CollisionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CollisionResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

/// Velocity, mass and collision behaviour of a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mobile {
    #[serde(flatten)]
    base: Base,
    /// Velocity in metres per second.
    #[serde(rename = "Vel")]
    pub vel: DynamicValue<Vec3>,
    /// Force accumulated during the current step, in newtons.
    #[serde(skip)]
    pub force: Vec3,
    /// Mass in kilograms. Zero-mass mobiles do not move.
    #[serde(rename = "Mass")]
    pub mass: f64,
    /// Largest floor step the body climbs without being stopped.
    #[serde(rename = "MountHeight")]
    pub mount_height: f64,
    /// Subject to air drag.
    #[serde(rename = "AirDrag", default = "default_true", skip_serializing_if = "is_true")]
    pub air_drag: bool,
    /// Subject to the sector's gravity.
    #[serde(rename = "Gravity", default = "default_true", skip_serializing_if = "is_true")]
    pub gravity: bool,
    /// Bounciness: 0 is inelastic, 1 perfectly elastic.
    #[serde(rename = "Elasticity")]
    pub elasticity: f64,
    /// Response to other bodies.
    #[serde(rename = "CrBody")]
    pub cr_body: CollisionResponse,
    /// Response to the player.
    #[serde(rename = "CrPlayer")]
    pub cr_player: CollisionResponse,
    /// Response to walls, floors and ceilings.
    #[serde(rename = "CrWall")]
    pub cr_wall: CollisionResponse,
    /// Scripts run on body-body contact.
    #[serde(rename = "ContactScripts", skip_serializing_if = "Vec::is_empty")]
    pub contact_scripts: Vec<String>,
}

impl Default for Mobile {
    fn default() -> Self {
        Self {
            base: Base::default(),
            vel: DynamicValue::default(),
            force: Vec3::ZERO,
            mass: 0.0,
            mount_height: PLAYER_MOUNT_HEIGHT,
            air_drag: true,
            gravity: true,
            elasticity: 0.5,
            cr_body: CollisionResponse::NONE,
            cr_player: CollisionResponse::NONE,
            cr_wall: CollisionResponse::SEPARATE,
            contact_scripts: Vec::new(),
        }
    }
}

impl Component for Mobile {
    const NAME: &'static str = "core.Mobile";
    component_base!();

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.vel);
    }
}

impl Mobile {
    /// A mobile of `mass` kilograms.
    #[must_use]
    pub fn with_mass(mass: f64) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_names() {
        let r = CollisionResponse::BOUNCE | CollisionResponse::STOP;
        assert_eq!(r.to_string(), "Bounce|Stop");
        assert_eq!(CollisionResponse::parse("Bounce|Stop"), r);
        assert_eq!(CollisionResponse::NONE.to_string(), "None");
        assert_eq!(CollisionResponse::parse("None"), CollisionResponse::NONE);
        assert_eq!(CollisionResponse::parse("Wobble|Remove"), CollisionResponse::REMOVE);
    }

    #[test]
    fn test_contains_none_only_in_none() {
        assert!(CollisionResponse::NONE.contains(CollisionResponse::NONE));
        assert!(!CollisionResponse::SEPARATE.contains(CollisionResponse::NONE));
        assert!((CollisionResponse::SEPARATE | CollisionResponse::BOUNCE).contains(CollisionResponse::BOUNCE));
    }

    #[test]
    fn test_defaults_survive_yaml() {
        let mobile = Mobile::with_mass(3.0);
        let yaml = serde_yaml::to_string(&mobile).unwrap();
        assert!(yaml.contains("CrWall: Separate"));
        assert!(!yaml.contains("AirDrag"));
        let back: Mobile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.cr_wall, CollisionResponse::SEPARATE);
        assert_eq!(back.cr_body, CollisionResponse::NONE);
        assert!(back.gravity);
        assert!((back.mass - 3.0).abs() < 1e-12);
    }
}
