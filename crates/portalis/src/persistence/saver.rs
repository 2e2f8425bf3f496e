//! World file saving.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use portalis_core::{ComponentFlags, Entity, World};

use crate::error::{SaveError, SaveResult};

/// Encodes one entity, or `None` if it has nothing worth saving.
fn encode_entity(world: &World, entity: Entity) -> Option<Mapping> {
    if world.entity_all_no_save(entity) {
        return None;
    }
    let mut map = Mapping::new();
    map.insert(Value::from("Entity"), Value::from(entity.to_string()));
    for (cid, index) in world.components_of(entity) {
        let Some(arena) = world.arena_dyn(cid) else {
            continue;
        };
        let Some(base) = arena.base(index) else {
            continue;
        };
        if base.flags.contains(ComponentFlags::NO_SAVE) {
            continue;
        }
        let name = Value::from(arena.type_name());
        if arena.shareable() && base.entity != entity && !base.entity.is_null() {
            map.insert(name, Value::from(base.entity.to_string()));
            continue;
        }
        match world.encode_component(cid, index) {
            Ok(value) => {
                map.insert(name, value);
            }
            Err(e) => warn!(%entity, component = arena.type_name(), error = %e, "Component failed to encode, skipping"),
        }
    }
    (map.len() > 1).then_some(map)
}

/// Encodes the root file's entities as a YAML sequence. Entities of nested
/// files stay in their own files.
#[must_use]
pub fn save_to_value(world: &World) -> Value {
    Value::Sequence(
        world
            .entities_in_source(0)
            .into_iter()
            .filter_map(|e| encode_entity(world, e))
            .map(Value::Mapping)
            .collect(),
    )
}

/// Encodes the world as a YAML document.
///
/// # Errors
///
/// Fails if the document cannot be rendered.
pub fn save_to_string(world: &World) -> SaveResult<String> {
    Ok(serde_yaml::to_string(&save_to_value(world))?)
}

/// Writes the world to `path`.
///
/// # Errors
///
/// Fails if the document cannot be rendered or written.
pub fn save_file(world: &World, path: impl AsRef<Path>) -> SaveResult<()> {
    let path = path.as_ref();
    let value = save_to_value(world);
    let count = value.as_sequence().map_or(0, Vec::len);
    let text = serde_yaml::to_string(&value)?;
    std::fs::write(path, text).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), entities = count, "Saved world");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Body;
    use crate::{create_world, EngineConfig};
    use portalis_core::{Component, Named};
    use portalis_shared::{Vec2, Vec3};

    fn saved_entities(value: &Value) -> Vec<&Mapping> {
        value
            .as_sequence()
            .map(|items| items.iter().filter_map(Value::as_mapping).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_fresh_world_saves_nothing() {
        let world = create_world(EngineConfig::default());
        assert!(saved_entities(&save_to_value(&world)).is_empty());
    }

    #[test]
    fn test_nested_sources_stay_out_of_root() {
        let mut world = create_world(EngineConfig::default());
        let root = world.new_entity();
        world.attach(root, Named::new("hall"));
        let nested = world.new_entity_in_source(1).unwrap();
        world.attach(nested, Named::new("lamp"));

        let value = save_to_value(&world);
        let saved = saved_entities(&value);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].get("Entity"), Some(&Value::from(root.to_string())));
    }

    #[test]
    fn test_no_save_component_is_dropped() {
        let mut world = create_world(EngineConfig::default());
        let e = world.new_entity();
        world.attach(e, Named::new("crate"));
        if let Some(body) = world.attach(e, Body::new(Vec3::ZERO, Vec2::new(2.0, 2.0))) {
            body.base_mut().flags.insert(ComponentFlags::NO_SAVE);
        }

        let value = save_to_value(&world);
        let saved = saved_entities(&value);
        assert_eq!(saved.len(), 1);
        assert!(saved[0].contains_key(Named::NAME));
        assert!(!saved[0].contains_key(Body::NAME));
    }
}
