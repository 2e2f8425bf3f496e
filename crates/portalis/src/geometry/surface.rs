//! Drawable surfaces: a material reference plus a texture-space transform.

use serde::{Deserialize, Serialize};

use portalis_core::{Dynamic, DynamicValue, Entity};
use portalis_shared::Matrix2;

/// The material and texture transform of a wall part, floor or ceiling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    /// Entity carrying the shared material.
    #[serde(rename = "Material", skip_serializing_if = "crate::serde_helpers::is_null")]
    pub material: Entity,
    /// Texture coordinates transform.
    #[serde(rename = "Transform", skip_serializing_if = "is_identity")]
    pub transform: DynamicValue<Matrix2>,
    /// Stretch the texture over the whole surface instead of tiling it.
    #[serde(rename = "Stretch", skip_serializing_if = "crate::serde_helpers::is_false")]
    pub stretch: bool,
}

fn is_identity(v: &DynamicValue<Matrix2>) -> bool {
    v.animation.is_none() && v.spawn == Matrix2::IDENTITY
}

impl Surface {
    /// A surface drawn with `material`.
    #[must_use]
    pub fn with_material(material: Entity) -> Self {
        Self {
            material,
            transform: DynamicValue::new(Matrix2::IDENTITY),
            stretch: false,
        }
    }

    /// Visits the texture transform.
    pub fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.transform);
    }

    /// Visits the material reference.
    pub fn for_each_entity_ref(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        f(&mut self.material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_surface_serializes_empty() {
        let surface = Surface::with_material(Entity::NULL);
        let yaml = serde_yaml::to_string(&surface).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }

    #[test]
    fn test_material_round_trip() {
        let surface = Surface::with_material(Entity::new(0, 9));
        let yaml = serde_yaml::to_string(&surface).unwrap();
        let back: Surface = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.material, Entity::new(0, 9));
        assert_eq!(back.transform.now, Matrix2::IDENTITY);
    }
}
