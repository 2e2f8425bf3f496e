//! # ECS Errors
//!
//! Failures surfaced by the entity store. Programmer errors such as attaching
//! to a null entity are logged and ignored rather than returned; this enum
//! covers the cases a caller can reasonably react to.

use thiserror::Error;

use crate::ecs::{ComponentId, Entity};

/// Errors produced by the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// An entity string could not be parsed.
    #[error("invalid entity handle '{0}'")]
    InvalidEntity(String),

    /// No component type is registered under this name.
    #[error("unknown component type '{0}'")]
    UnknownComponent(String),

    /// No component type is registered under this ID.
    #[error("unknown component id {0}")]
    UnknownComponentId(ComponentId),

    /// The entity is not alive.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// All local indices of a source are in use.
    #[error("entity source {0} is exhausted")]
    SourceExhausted(u8),

    /// A component payload could not be decoded.
    #[error("failed to decode {component}: {message}")]
    Decode {
        /// Component type name.
        component: &'static str,
        /// Decoder message.
        message: String,
    },

    /// A component payload could not be encoded.
    #[error("failed to encode {component}: {message}")]
    Encode {
        /// Component type name.
        component: &'static str,
        /// Encoder message.
        message: String,
    },
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
