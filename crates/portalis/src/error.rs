//! # Engine Errors
//!
//! Failures the host can react to. Everything the engine can recover from on
//! its own (a body outside every sector, a dangling entity reference in a
//! world file) is logged and degraded instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading a world file.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    Yaml {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// The document root is not a sequence of entities.
    #[error("{path}: the document root must be a sequence of entities")]
    NotASequence {
        /// Offending file.
        path: PathBuf,
    },

    /// An entry is not a mapping or lacks its `Entity` key.
    #[error("{path}: entry {index} has no Entity key")]
    MissingEntity {
        /// Offending file.
        path: PathBuf,
        /// Position of the entry in the sequence.
        index: usize,
    },

    /// An `Entity` value is not a valid handle.
    #[error("{path}: invalid entity handle '{value}'")]
    InvalidEntity {
        /// Offending file.
        path: PathBuf,
        /// Raw value.
        value: String,
    },

    /// Every entity source ID is taken.
    #[error("{path}: no free entity source ID")]
    SourcesExhausted {
        /// File that needed an ID.
        path: PathBuf,
    },

    /// A nested file failed to load.
    #[error("{path}: nested file failed: {source}")]
    Nested {
        /// Parent file.
        path: PathBuf,
        /// Failure of the nested file.
        source: Box<LoadError>,
    },
}

/// Errors produced while saving a world file.
#[derive(Error, Debug)]
pub enum SaveError {
    /// The file could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The world could not be encoded.
    #[error("failed to encode world: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors produced while reading engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for world loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for world saving.
pub type SaveResult<T> = Result<T, SaveError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
