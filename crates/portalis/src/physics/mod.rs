//! # Physics
//!
//! Mobile bodies move under gravity, air drag and floor friction, then
//! collide with the sector they are in:
//!
//! ```text
//! step_mobile ──► apply_forces ──► integrate ──► sub-step ──► collide
//!                                                   ▲            │
//!                                                   └────────────┘
//! ```
//!
//! [`collide`] keeps the body inside walkable space: walls push it back,
//! portals and nested sectors move it between sectors, floors and ceilings
//! bound it vertically and other bodies are separated or bounced off.

mod body_sector;
mod collision;
mod mobile;

pub use body_sector::{find_body_sector, locate_sector, move_between_sectors, Placement};
pub use collision::{collide, remove_body, Contact, Motion};
pub use mobile::{apply_forces, step_mobile};
