//! Point lights carried by bodies.

use serde::{Deserialize, Serialize};

use portalis_core::{component_base, Base, Component};
use portalis_shared::Vec3;

/// A point light at its body's position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    #[serde(flatten)]
    base: Base,
    /// Linear RGB colour.
    #[serde(rename = "Diffuse")]
    pub diffuse: Vec3,
    /// Intensity at the light's centre.
    #[serde(rename = "Strength")]
    pub strength: f64,
    /// Falloff exponent.
    #[serde(rename = "Attenuation")]
    pub attenuation: f64,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            base: Base::default(),
            diffuse: Vec3::new(1.0, 1.0, 1.0),
            strength: 15.0,
            attenuation: 1.2,
        }
    }
}

impl Component for Light {
    const NAME: &'static str = "core.Light";
    const SHAREABLE: bool = true;
    component_base!();
}

impl Light {
    /// A light of the given colour and strength.
    #[must_use]
    pub fn new(diffuse: Vec3, strength: f64) -> Self {
        Self {
            diffuse,
            strength,
            ..Self::default()
        }
    }

    /// Contribution at `distance` units from the light.
    #[must_use]
    pub fn intensity_at(&self, distance: f64) -> f64 {
        self.strength / (1.0 + distance.max(0.0)).powf(self.attenuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_falls_off() {
        let light = Light::default();
        assert!((light.intensity_at(0.0) - light.strength).abs() < 1e-12);
        assert!(light.intensity_at(10.0) < light.intensity_at(1.0));
    }
}
