//! # Memory Management
//!
//! Storage primitives behind the ECS:
//! - Chunked component arenas with stable slot indices
//! - A bitmap entity allocator partitioned by source file

mod arena;
mod pool;

pub use arena::{AnyArena, ComponentArena, CHUNK_SIZE};
pub use pool::EntityPool;
