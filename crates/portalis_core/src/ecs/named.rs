//! Human-readable entity names.

use serde::{Deserialize, Serialize};

use super::component::{Base, Component};
use crate::component_base;

/// A display name, used for lookups from scripts and tools.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Named {
    #[serde(flatten)]
    base: Base,
    /// The name.
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl Named {
    /// A named component with default flags.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Component for Named {
    const NAME: &'static str = "ecs.Named";
    component_base!();
}
