//! # World Geometry
//!
//! Sectors, their segments and planes, and free-standing internal walls.
//!
//! ## Architecture
//!
//! ```text
//! Sector ──┬── Bottom / Top: SectorPlane ── Surface ── Material entity
//!          └── Segments[]: SectorSegment ─┬─ Segment (derived geometry)
//!                                         ├─ Lo / Mid / Hi: Surface
//!                                         └─ AdjacentSector + AdjacentSegment
//! ```

mod internal_segment;
mod sector;
mod sector_plane;
mod sector_segment;
mod segment;
mod surface;

pub use internal_segment::InternalSegment;
pub use sector::{Sector, ON_SEGMENT_EPSILON_SQUARED};
pub use sector_plane::{PlaneKind, SectorPlane};
pub use sector_segment::SectorSegment;
pub use segment::Segment;
pub use surface::Surface;
