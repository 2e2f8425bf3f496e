//! # Engine Configuration
//!
//! Tunables read from TOML. Every field has a default equal to the matching
//! constant in [`portalis_shared::constants`], so an empty file is valid.
//!
//! ```toml
//! max_portals = 300
//! collision_check = 2.0
//! pvs_refresh_per_frame = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use portalis_core::{component_base, Base, Component, ComponentFlags, SimulationConfig, World};
use portalis_shared::constants::{
    COLLISION_CHECK, COLLISION_STEPS, LIGHT_GRID, MAX_EVENTS, MAX_PORTALS,
    MIN_MILLIS_PER_FRAME, QUADTREE_INIT_DIM, TIME_STEP_MS,
};

use crate::error::{ConfigError, ConfigResult};

/// Default number of sectors whose visibility is rebuilt per fixed step.
pub const DEFAULT_PVS_REFRESH_PER_FRAME: usize = 2;

/// Default node budget of a single path search.
pub const DEFAULT_PATH_MAX_NODES: usize = 20_000;

/// Engine tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of one fixed step in milliseconds.
    pub time_step_ms: f64,
    /// Host frames are clamped to at most this many milliseconds.
    pub min_millis_per_frame: f64,
    /// Portal hops before a traversal gives up.
    pub max_portals: usize,
    /// Travel distance per collision sub-step.
    pub collision_check: f64,
    /// Resolution passes per collision sub-step.
    pub collision_iterations: usize,
    /// Initial half extent of the quadtree root.
    pub quadtree_init_dim: f64,
    /// Lightmap cell size.
    pub light_grid: f64,
    /// Capacity of the simulation event queue.
    pub event_capacity: usize,
    /// Warn about host frames that exceed their budget.
    pub enable_timing_logs: bool,
    /// Sectors whose visibility is rebuilt per fixed step.
    pub pvs_refresh_per_frame: usize,
    /// Nodes a single path search may expand.
    pub path_max_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_step_ms: TIME_STEP_MS,
            min_millis_per_frame: MIN_MILLIS_PER_FRAME,
            max_portals: MAX_PORTALS,
            collision_check: COLLISION_CHECK,
            collision_iterations: COLLISION_STEPS,
            quadtree_init_dim: QUADTREE_INIT_DIM,
            light_grid: LIGHT_GRID,
            event_capacity: MAX_EVENTS,
            enable_timing_logs: false,
            pvs_refresh_per_frame: DEFAULT_PVS_REFRESH_PER_FRAME,
            path_max_nodes: DEFAULT_PATH_MAX_NODES,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed input and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(field: &'static str, v: f64) -> ConfigResult<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    message: format!("{v} must be positive"),
                })
            }
        }

        positive("time_step_ms", self.time_step_ms)?;
        positive("min_millis_per_frame", self.min_millis_per_frame)?;
        positive("collision_check", self.collision_check)?;
        positive("quadtree_init_dim", self.quadtree_init_dim)?;
        positive("light_grid", self.light_grid)?;
        if self.collision_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "collision_iterations",
                message: "at least one pass is required".into(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_capacity",
                message: "the event queue needs room for one event".into(),
            });
        }
        Ok(())
    }

    /// The subset consumed by [`World`].
    #[must_use]
    pub const fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            time_step_ms: self.time_step_ms,
            min_millis_per_frame: self.min_millis_per_frame,
            event_capacity: self.event_capacity,
        }
    }
}

/// World-resident copy of the engine configuration, read by controllers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    base: Base,
    /// The configuration.
    #[serde(skip)]
    pub config: EngineConfig,
}

impl Component for Settings {
    const NAME: &'static str = "core.Settings";
    const DEFAULT_FLAGS: ComponentFlags = ComponentFlags::INTERNAL;
    component_base!();
}

/// The configuration stored in `world`, or the defaults.
#[must_use]
pub fn settings(world: &World) -> EngineConfig {
    world.first::<Settings>().map(|(_, s)| s.config).unwrap_or_default()
}

/// Stores `config` in `world`.
pub fn install_settings(world: &mut World, config: EngineConfig) {
    world.config = config.simulation();
    if let Some(settings) = world.singleton::<Settings>() {
        settings.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_portals, MAX_PORTALS);
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str("max_portals = 12\nlight_grid = 8.0\n").unwrap();
        assert_eq!(config.max_portals, 12);
        assert!((config.light_grid - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.collision_iterations, COLLISION_STEPS);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("collision_check = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "collision_check", .. }));
        let err = EngineConfig::from_toml_str("collision_iterations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "collision_iterations", .. }));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_portals = ="),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_settings_round_trip_through_world() {
        let mut world = World::new();
        world.register_component::<Settings>();
        assert_eq!(settings(&world), EngineConfig::default());

        let config = EngineConfig {
            max_portals: 7,
            ..EngineConfig::default()
        };
        install_settings(&mut world, config);
        assert_eq!(settings(&world).max_portals, 7);
    }
}
