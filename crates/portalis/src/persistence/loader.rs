//! World file loading.
//!
//! Loading runs in two phases. The first reads and validates the root file
//! and every file it nests, so a failure leaves the world untouched. The
//! second clears the world and instantiates each file's entities in its own
//! entity source, nested files before the files that reference them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info, warn};

use portalis_core::dynamic::{event_class, EventPayload};
use portalis_core::ecs::{EntitySourceId, MAX_SOURCES};
use portalis_core::{Component, ComponentId, ControllerMethod, Entity, SourceFile, World};

use crate::config::{install_settings, settings};
use crate::error::{LoadError, LoadResult};
use crate::topology::recalculate_topology;

const ENTITY_KEY: &str = "Entity";

/// One entity as written in a file.
#[derive(Debug)]
struct Entry {
    entity: Entity,
    components: Vec<(String, Value)>,
}

/// A `SourceFile` entry of a document.
#[derive(Debug)]
struct Nested {
    entity: Entity,
    disk_id: EntitySourceId,
    /// Index into the document list, `None` for placeholders.
    document: Option<usize>,
}

#[derive(Debug)]
struct Document {
    path: PathBuf,
    entries: Vec<Entry>,
    nested: Vec<Nested>,
}

#[derive(Default)]
struct Reader {
    documents: Vec<Document>,
    by_path: HashMap<PathBuf, Option<usize>>,
}

fn parse_entity(path: &Path, value: &Value) -> LoadResult<Entity> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    };
    text.parse().map_err(|_| LoadError::InvalidEntity {
        path: path.to_path_buf(),
        value: text,
    })
}

fn parse_entries(path: &Path, text: &str) -> LoadResult<Vec<Entry>> {
    let root: Value = serde_yaml::from_str(text).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    let items = match root {
        Value::Sequence(items) => items,
        Value::Null => Vec::new(),
        _ => {
            return Err(LoadError::NotASequence {
                path: path.to_path_buf(),
            })
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Mapping(map) = item else {
            return Err(LoadError::MissingEntity {
                path: path.to_path_buf(),
                index,
            });
        };
        let handle = map.get(ENTITY_KEY).ok_or_else(|| LoadError::MissingEntity {
            path: path.to_path_buf(),
            index,
        })?;
        let entity = parse_entity(path, handle)?;
        let components = map
            .into_iter()
            .filter_map(|(k, v)| match k {
                Value::String(name) if name != ENTITY_KEY => Some((name, v)),
                _ => None,
            })
            .collect();
        entries.push(Entry { entity, components });
    }
    Ok(entries)
}

fn source_fields(value: &Value) -> Option<(String, EntitySourceId)> {
    let Value::Mapping(map) = value else {
        return None;
    };
    let source = map
        .get("Source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let id = map
        .get("ID")
        .and_then(Value::as_u64)
        .and_then(|id| EntitySourceId::try_from(id).ok())
        .unwrap_or_default();
    Some((source, id))
}

impl Reader {
    /// Reads `path` and everything it nests.
    ///
    /// # Returns
    ///
    /// The document index, or `None` if the file is already being read
    /// further up (a nesting cycle).
    fn read(&mut self, path: &Path, text: String) -> LoadResult<Option<usize>> {
        if let Some(&known) = self.by_path.get(path) {
            if known.is_none() {
                warn!(path = %path.display(), "World files nest each other, ignoring the cycle");
            }
            return Ok(known);
        }
        self.by_path.insert(path.to_path_buf(), None);

        let entries = parse_entries(path, &text)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut nested = Vec::new();
        for entry in &entries {
            let Some((source, disk_id)) = entry
                .components
                .iter()
                .find(|(name, _)| name == SourceFile::NAME)
                .and_then(|(_, v)| source_fields(v))
            else {
                continue;
            };
            let document = if source.is_empty() {
                None
            } else {
                let child = base_dir.join(&source);
                let text = std::fs::read_to_string(&child).map_err(|source| LoadError::Nested {
                    path: path.to_path_buf(),
                    source: Box::new(LoadError::Io {
                        path: child.clone(),
                        source,
                    }),
                })?;
                self.read(&child, text).map_err(|e| LoadError::Nested {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                })?
            };
            nested.push(Nested {
                entity: entry.entity,
                disk_id,
                document,
            });
        }

        let index = self.documents.len();
        self.documents.push(Document {
            path: path.to_path_buf(),
            entries,
            nested,
        });
        self.by_path.insert(path.to_path_buf(), Some(index));
        Ok(Some(index))
    }
}

/// What the second phase needs per document.
struct Assignment {
    source: EntitySourceId,
    ids: BTreeMap<EntitySourceId, EntitySourceId>,
}

fn assign_sources(root_path: &Path, documents: &[Document]) -> LoadResult<Vec<Assignment>> {
    // The root is the last document read; nested files get IDs from 1 up.
    let root = documents.len() - 1;
    let mut sources = vec![0; documents.len()];
    let mut next: usize = 1;
    for (i, source) in sources.iter_mut().enumerate() {
        if i == root {
            continue;
        }
        if next >= MAX_SOURCES {
            return Err(LoadError::SourcesExhausted {
                path: root_path.to_path_buf(),
            });
        }
        *source = next as EntitySourceId;
        next += 1;
    }

    let mut assignments = Vec::with_capacity(documents.len());
    for (doc, &source) in documents.iter().zip(&sources) {
        let mut ids = BTreeMap::from([(0, source)]);
        for nested in doc.nested.iter().filter(|n| n.disk_id != 0) {
            let assigned = match nested.document {
                Some(child) => sources[child],
                None => nested.disk_id,
            };
            ids.insert(nested.disk_id, assigned);
        }
        assignments.push(Assignment { source, ids });
    }
    Ok(assignments)
}

fn remap(ids: &BTreeMap<EntitySourceId, EntitySourceId>, e: Entity) -> Entity {
    if e.is_null() {
        return e;
    }
    ids.get(&e.source_id()).map_or(e, |&id| e.with_source(id))
}

struct Instantiator<'w> {
    world: &'w mut World,
    loaded: Vec<(ComponentId, usize)>,
}

impl Instantiator<'_> {
    fn component(&mut self, path: &Path, entity: Entity, name: &str, value: Value, ids: &BTreeMap<EntitySourceId, EntitySourceId>) {
        let Some(cid) = self.world.registry().id_by_name(name) else {
            warn!(path = %path.display(), %entity, component = name, "Unknown component type, skipping");
            return;
        };
        let index = match self.world.decode_component(cid, value) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %path.display(), %entity, component = name, error = %e, "Component failed to decode, skipping");
                return;
            }
        };
        self.world.for_each_entity_ref(cid, index, &mut |e| *e = remap(ids, *e));
        if self.world.attach_existing(cid, entity, index) {
            self.loaded.push((cid, index));
        } else {
            self.world.discard_component(cid, index);
        }
    }

    fn shared(&mut self, path: &Path, entity: Entity, name: &str, owner: Entity) {
        let Some(cid) = self.world.registry().id_by_name(name) else {
            warn!(path = %path.display(), %entity, component = name, "Unknown component type, skipping");
            return;
        };
        match self.world.component_index(owner, cid) {
            Some(index) => {
                self.world.attach_existing(cid, entity, index);
            }
            None => {
                warn!(path = %path.display(), %entity, component = name, %owner, "Shared component reference resolves to nothing");
            }
        }
    }

    fn document(&mut self, document: &Document, assignment: &Assignment, counts: &HashMap<usize, u32>, sources: &[EntitySourceId]) {
        let ids = &assignment.ids;
        let mut shared = Vec::new();
        for entry in &document.entries {
            let entity = remap(ids, entry.entity);
            if entity.source_id() != assignment.source {
                warn!(path = %document.path.display(), %entity, "Entity belongs to another file, skipping");
                continue;
            }
            if !self.world.claim_entity(entity) {
                warn!(path = %document.path.display(), %entity, "Entity defined twice, skipping");
                continue;
            }
            for (name, value) in &entry.components {
                match value {
                    Value::String(handle) => match handle.parse::<Entity>() {
                        Ok(owner) => shared.push((entity, name.clone(), remap(ids, owner))),
                        Err(_) => warn!(path = %document.path.display(), %entity, component = %name, "Invalid shared component reference"),
                    },
                    _ => self.component(&document.path, entity, name, value.clone(), ids),
                }
            }
        }
        for (entity, name, owner) in shared {
            self.shared(&document.path, entity, &name, owner);
        }

        let base_dir = document.path.parent().map(Path::to_path_buf).unwrap_or_default();
        for nested in &document.nested {
            let entity = remap(ids, nested.entity);
            let Some(file) = self.world.get_mut::<SourceFile>(entity) else {
                continue;
            };
            match nested.document {
                Some(child) => {
                    file.id = sources[child];
                    file.loaded = true;
                    file.references = counts.get(&child).copied().unwrap_or(1);
                    file.resolved = base_dir.join(&file.source);
                }
                None => file.loaded = false,
            }
            file.loaded_ids = ids.clone();
        }
    }

    /// Nulls entity references that point at nothing.
    fn check_references(&mut self) {
        let loaded = std::mem::take(&mut self.loaded);
        let live = self.world.entities();
        for (cid, index) in loaded {
            let mut dangling = Vec::new();
            self.world.for_each_entity_ref(cid, index, &mut |e| {
                if !e.is_null() && live.binary_search(e).is_err() {
                    dangling.push(*e);
                    *e = Entity::NULL;
                }
            });
            let component = self.world.registry().get(cid).map_or("?", |t| t.name);
            for target in dangling {
                warn!(component, index, %target, "Reference to a missing entity, cleared");
            }
        }
    }
}

/// Replaces the contents of `world` with the world file at `path` and the
/// files it nests.
///
/// # Errors
///
/// Fails without touching `world` if any file cannot be read or parsed.
pub fn load_file(world: &mut World, path: impl AsRef<Path>) -> LoadResult<()> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_named(world, path, text)
}

/// Replaces the contents of `world` with the YAML document `text`. Nested
/// files resolve relative to `base_dir`.
///
/// # Errors
///
/// Fails without touching `world` if the document or a nested file is
/// invalid.
pub fn load_str(world: &mut World, text: &str, base_dir: impl AsRef<Path>) -> LoadResult<()> {
    load_named(world, &base_dir.as_ref().join("<memory>"), text.to_string())
}

fn load_named(world: &mut World, path: &Path, text: String) -> LoadResult<()> {
    let mut reader = Reader::default();
    reader.read(path, text)?;
    let documents = reader.documents;
    let assignments = assign_sources(path, &documents)?;
    let sources: Vec<EntitySourceId> = assignments.iter().map(|a| a.source).collect();
    let mut counts: HashMap<usize, u32> = HashMap::new();
    for nested in documents.iter().flat_map(|d| d.nested.iter()) {
        if let Some(child) = nested.document {
            *counts.entry(child).or_default() += 1;
        }
    }

    let config = settings(world);
    world.clear();

    let mut instantiator = Instantiator {
        world: &mut *world,
        loaded: Vec::new(),
    };
    for (document, assignment) in documents.iter().zip(&assignments) {
        instantiator.document(document, assignment, &counts, &sources);
        debug!(path = %document.path.display(), source = assignment.source, entities = document.entries.len(), "Instantiated world file");
    }
    instantiator.check_references();

    install_settings(world, config);
    recalculate_topology(world);
    world.act_all(ControllerMethod::LOADED);
    world.emit(event_class::WORLD_LOADED, EventPayload::Text(path.display().to_string()));
    info!(
        path = %path.display(),
        files = documents.len(),
        entities = world.entity_count(),
        "Loaded world"
    );
    Ok(())
}

/// Releases one reference to the nested file described by `file_entity`.
/// When the last reference goes, its own nested files are released, then
/// every entity of its source is deleted.
pub fn unload(world: &mut World, file_entity: Entity) {
    let Some(file) = world.get::<SourceFile>(file_entity) else {
        warn!(entity = %file_entity, "Unloading an entity without a source file");
        return;
    };
    if !file.loaded {
        return;
    }
    let id = file.id;
    if id == 0 {
        warn!(entity = %file_entity, "Refusing to unload the root source");
        return;
    }

    let mut remaining = 0;
    let holders: Vec<Entity> = world.iter::<SourceFile>().filter(|(_, f)| f.id == id).map(|(e, _)| e).collect();
    for holder in &holders {
        if let Some(f) = world.get_mut::<SourceFile>(*holder) {
            f.references = f.references.saturating_sub(1);
            remaining = remaining.max(f.references);
        }
    }
    if remaining > 0 {
        debug!(source = id, remaining, "Released a nested file reference");
        return;
    }

    let children: Vec<Entity> = world
        .iter::<SourceFile>()
        .filter(|(e, f)| e.source_id() == id && f.loaded)
        .map(|(e, _)| e)
        .collect();
    for child in children {
        unload(world, child);
    }
    let entities = world.entities_in_source(id);
    let count = entities.len();
    for entity in entities {
        world.delete(entity);
    }
    for holder in holders {
        if let Some(f) = world.get_mut::<SourceFile>(holder) {
            f.loaded = false;
        }
    }
    info!(source = id, entities = count, "Unloaded nested world file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sector;
    use crate::{create_world, EngineConfig};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("portalis-loader-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn named(name: &str) -> String {
        format!("- Entity: \"1\"\n  ecs.Named:\n    Name: {name}\n")
    }

    #[test]
    fn test_entities_remap_into_assigned_sources() {
        let dir = scratch_dir("remap");
        std::fs::write(dir.join("a.yaml"), named("north")).unwrap();
        std::fs::write(dir.join("b.yaml"), named("south")).unwrap();
        // Disk source 4, local 1, as written by the file that nests `b`.
        let south_on_disk = Entity::new(4, 1).raw();
        std::fs::write(
            dir.join("root.yaml"),
            format!(
                "- Entity: \"1\"\n  ecs.SourceFile:\n    Source: a.yaml\n    ID: 3\n\
                 - Entity: \"2\"\n  ecs.SourceFile:\n    Source: b.yaml\n    ID: 4\n\
                 - Entity: \"3\"\n  core.Sector:\n    Bottom:\n      Target: \"{south_on_disk}\"\n    Segments:\n\
                 \x20     - P: {{Spawn: {{X: 0, Y: 0}}}}\n\
                 \x20     - P: {{Spawn: {{X: 10, Y: 0}}}}\n\
                 \x20     - P: {{Spawn: {{X: 10, Y: 10}}}}\n"
            ),
        )
        .unwrap();

        let mut world = create_world(EngineConfig::default());
        load_file(&mut world, dir.join("root.yaml")).unwrap();

        let north = world.entity_by_name("north").unwrap();
        let south = world.entity_by_name("south").unwrap();
        assert_eq!(north, Entity::new(1, 1));
        assert_eq!(south, Entity::new(2, 1));
        let sector = world.get::<Sector>(Entity::from_raw(3)).unwrap();
        assert_eq!(sector.bottom.target, south);

        let b_file = world.get::<SourceFile>(Entity::from_raw(2)).unwrap();
        assert_eq!(b_file.id, 2);
        assert_eq!(b_file.loaded_ids.get(&3), Some(&1));
        assert_eq!(b_file.loaded_ids.get(&4), Some(&2));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_unload_removes_only_that_file() {
        let dir = scratch_dir("unload");
        std::fs::write(dir.join("a.yaml"), named("north")).unwrap();
        std::fs::write(dir.join("b.yaml"), named("south")).unwrap();
        std::fs::write(
            dir.join("root.yaml"),
            "- Entity: \"1\"\n  ecs.SourceFile:\n    Source: a.yaml\n    ID: 3\n\
             - Entity: \"2\"\n  ecs.SourceFile:\n    Source: b.yaml\n    ID: 4\n",
        )
        .unwrap();

        let mut world = create_world(EngineConfig::default());
        load_file(&mut world, dir.join("root.yaml")).unwrap();
        unload(&mut world, Entity::from_raw(1));

        assert!(world.entity_by_name("north").is_none());
        assert!(world.entity_by_name("south").is_some());
        assert!(world.entities_in_source(1).is_empty());
        assert!(!world.get::<SourceFile>(Entity::from_raw(1)).unwrap().loaded);
        assert!(world.get::<SourceFile>(Entity::from_raw(2)).unwrap().loaded);

        // Unloading twice changes nothing.
        unload(&mut world, Entity::from_raw(1));
        assert!(world.entity_by_name("south").is_some());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_shared_file_unloads_on_last_reference() {
        let dir = scratch_dir("shared");
        std::fs::write(dir.join("props.yaml"), named("lamp")).unwrap();
        std::fs::write(
            dir.join("root.yaml"),
            "- Entity: \"1\"\n  ecs.SourceFile:\n    Source: props.yaml\n    ID: 3\n\
             - Entity: \"2\"\n  ecs.SourceFile:\n    Source: props.yaml\n    ID: 5\n",
        )
        .unwrap();

        let mut world = create_world(EngineConfig::default());
        load_file(&mut world, dir.join("root.yaml")).unwrap();
        let lamp = world.entity_by_name("lamp").unwrap();
        assert_eq!(lamp.source_id(), 1);
        for holder in [1, 2] {
            let file = world.get::<SourceFile>(Entity::from_raw(holder)).unwrap();
            assert_eq!((file.id, file.references), (1, 2));
        }

        unload(&mut world, Entity::from_raw(1));
        assert_eq!(world.entity_by_name("lamp"), Some(lamp));
        unload(&mut world, Entity::from_raw(2));
        assert!(world.entity_by_name("lamp").is_none());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_targets_are_nulled_in_nested_files() {
        let dir = scratch_dir("dangling");
        std::fs::write(
            dir.join("room.yaml"),
            "- Entity: \"1\"\n  core.Sector:\n    Top:\n      Target: \"7\"\n    Segments:\n\
             \x20     - P: {Spawn: {X: 0, Y: 0}}\n\
             \x20     - P: {Spawn: {X: 10, Y: 0}}\n\
             \x20     - P: {Spawn: {X: 10, Y: 10}}\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("root.yaml"),
            "- Entity: \"1\"\n  ecs.SourceFile:\n    Source: room.yaml\n    ID: 2\n",
        )
        .unwrap();

        let mut world = create_world(EngineConfig::default());
        load_file(&mut world, dir.join("root.yaml")).unwrap();
        let sector = world.get::<Sector>(Entity::new(1, 1)).unwrap();
        assert!(sector.top.target.is_null());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_nesting_cycle_is_ignored() {
        let dir = scratch_dir("cycle");
        std::fs::write(
            dir.join("root.yaml"),
            "- Entity: \"1\"\n  ecs.SourceFile:\n    Source: root.yaml\n    ID: 2\n\
             - Entity: \"2\"\n  ecs.Named:\n    Name: hall\n",
        )
        .unwrap();

        let mut world = create_world(EngineConfig::default());
        load_file(&mut world, dir.join("root.yaml")).unwrap();
        assert_eq!(world.entity_by_name("hall"), Some(Entity::from_raw(2)));
        assert!(!world.get::<SourceFile>(Entity::from_raw(1)).unwrap().loaded);
        std::fs::remove_dir_all(dir).ok();
    }
}
