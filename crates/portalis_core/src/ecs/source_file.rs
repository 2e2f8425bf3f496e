//! # Source Files
//!
//! A world may be assembled from several files. Each loaded file is
//! described by an entity carrying a [`SourceFile`]; the file's own entities
//! live in the entity source named by [`SourceFile::id`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::component::{Base, Component};
use super::entity::EntitySourceId;
use crate::component_base;

/// A nested world file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(flatten)]
    base: Base,
    /// Path of the file, relative to the loading file.
    #[serde(rename = "Source", default)]
    pub source: String,
    /// Source ID assigned when the file was loaded.
    #[serde(rename = "ID", default)]
    pub id: EntitySourceId,
    /// Whether the file's contents are in the world.
    #[serde(skip)]
    pub loaded: bool,
    /// Number of files referencing this one.
    #[serde(skip)]
    pub references: u32,
    /// Source IDs as written in the file mapped to IDs in the world.
    #[serde(skip)]
    pub loaded_ids: BTreeMap<EntitySourceId, EntitySourceId>,
    /// Where the file was read from.
    #[serde(skip)]
    pub resolved: PathBuf,
}

impl SourceFile {
    /// Describes `source`, to be loaded into entity source `id`.
    #[must_use]
    pub fn new(source: impl Into<String>, id: EntitySourceId) -> Self {
        Self {
            source: source.into(),
            id,
            ..Self::default()
        }
    }

    /// Whether this entry only reserves a slot and names no file.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.source.is_empty()
    }
}

impl Component for SourceFile {
    const NAME: &'static str = "ecs.SourceFile";
    component_base!();
}
