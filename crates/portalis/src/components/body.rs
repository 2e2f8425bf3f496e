//! Bodies: spheres positioned in the world.

use serde::{Deserialize, Serialize};

use portalis_core::dynamic::deserialize_angle;
use portalis_core::{component_base, Base, Component, Dynamic, DynamicValue, Entity};
use portalis_shared::{Vec2, Vec3};

/// Size of a body created without one.
pub const DEFAULT_BODY_SIZE: Vec2 = Vec2::new(1.0, 1.0);

/// A sphere-like body. `size.x` is the diameter, `size.y` the height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    #[serde(flatten)]
    base: Base,
    /// Centre position.
    #[serde(rename = "Pos")]
    pub pos: DynamicValue<Vec3>,
    /// Diameter and height.
    #[serde(rename = "Size")]
    pub size: DynamicValue<Vec2>,
    /// Facing in degrees.
    #[serde(rename = "Angle", deserialize_with = "deserialize_angle")]
    pub angle: DynamicValue<f64>,
    /// Sector containing the centre.
    #[serde(skip)]
    pub sector_entity: Entity,
    /// Resting on a floor.
    #[serde(skip)]
    pub on_ground: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            base: Base::default(),
            pos: DynamicValue::default(),
            size: DynamicValue::new(DEFAULT_BODY_SIZE),
            angle: DynamicValue::angle(0.0),
            sector_entity: Entity::NULL,
            on_ground: false,
        }
    }
}

impl Component for Body {
    const NAME: &'static str = "core.Body";
    component_base!();

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.pos);
        f(&mut self.size);
        f(&mut self.angle);
    }
}

impl Body {
    /// A body at `pos` with the given diameter and height.
    #[must_use]
    pub fn new(pos: Vec3, size: Vec2) -> Self {
        Self {
            pos: DynamicValue::new(pos),
            size: DynamicValue::new(size),
            ..Self::default()
        }
    }

    /// Half the diameter.
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.size.now.x * 0.5
    }

    /// Half the height.
    #[inline]
    #[must_use]
    pub fn half_height(&self) -> f64 {
        self.size.now.y * 0.5
    }

    /// Moves the body, also resetting the previous slot so the renderer does
    /// not blend across the jump.
    pub fn teleport_to(&mut self, pos: Vec3) {
        self.pos.now = pos;
        self.pos.prev = pos;
    }
}

/// Marks the body driven by the local player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(flatten)]
    base: Base,
}

impl Component for Player {
    const NAME: &'static str = "core.Player";
    component_base!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_survives_round_trip() {
        let mut body = Body::new(Vec3::new(1.0, 2.0, 3.0), Vec2::new(4.0, 8.0));
        body.angle.set_all(90.0);
        let yaml = serde_yaml::to_string(&body).unwrap();
        let back: Body = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.angle.is_angle);
        assert!((back.angle.now - 90.0).abs() < 1e-9);
        assert!((back.radius() - 2.0).abs() < 1e-9);
        assert!((back.half_height() - 4.0).abs() < 1e-9);
    }
}
