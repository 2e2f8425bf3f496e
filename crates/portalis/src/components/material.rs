//! Surface materials, shared between every surface that uses them.

use serde::{Deserialize, Serialize};

use portalis_core::{component_base, Base, Component};
use portalis_shared::Vec4;

use crate::serde_helpers::is_zero;

/// A surface material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    #[serde(flatten)]
    base: Base,
    /// Base colour, alpha in `w`.
    #[serde(rename = "Diffuse")]
    pub diffuse: Vec4,
    /// Image path, resolved by the renderer.
    #[serde(rename = "Texture", skip_serializing_if = "String::is_empty")]
    pub texture: String,
    /// Specular exponent.
    #[serde(rename = "Shininess", skip_serializing_if = "is_zero")]
    pub shininess: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base: Base::default(),
            diffuse: Vec4::ONE,
            texture: String::new(),
            shininess: 0.0,
        }
    }
}

impl Component for Material {
    const NAME: &'static str = "materials.Material";
    const SHAREABLE: bool = true;
    component_base!();
}
