//! # World Files
//!
//! A world file is a YAML sequence of entities:
//!
//! ```yaml
//! - Entity: "2"
//!   core.Sector:
//!     Segments:
//!       - P: {Spawn: {X: 0, Y: 0}}
//!   materials.Material: "5"
//! ```
//!
//! Each entry names its handle under `Entity` and its components under their
//! type names. A string in place of a component body refers to the
//! shareable component already attached to that entity.
//!
//! `ecs.SourceFile` entries nest other files. Each nested file is loaded
//! into its own entity source; handles written in it are rewritten to that
//! source on load.

mod loader;
mod saver;

pub use loader::{load_file, load_str, unload};
pub use saver::{save_file, save_to_string, save_to_value};
