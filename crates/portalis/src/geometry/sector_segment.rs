//! # Sector Segments
//!
//! One edge of a sector polygon. The authored data is the start vertex `P`,
//! three surfaces and the portal coupling; the geometric [`Segment`], the
//! neighbour links and the teleport matrices are derived by sector
//! recalculation.
//!
//! ```text
//!        Hi   upper step of a portal gap
//!       ────
//!        Mid  solid wall, or the portal opening itself
//!       ────
//!        Lo   lower step of a portal gap
//! ```

use serde::{Deserialize, Serialize};

use portalis_core::{Dynamic, DynamicValue, Entity};
use portalis_shared::{Matrix2, Vec2};

use super::segment::Segment;
use super::surface::Surface;
use crate::serde_helpers::{default_true, is_false, is_null, is_true};

/// One edge of a sector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorSegment {
    /// Start vertex. The end vertex is the next segment's start.
    #[serde(rename = "P")]
    pub p: DynamicValue<Vec2>,
    /// Lower step surface.
    #[serde(rename = "Lo", skip_serializing_if = "is_default_surface")]
    pub lo: Surface,
    /// Wall surface.
    #[serde(rename = "Mid", skip_serializing_if = "is_default_surface")]
    pub mid: Surface,
    /// Upper step surface.
    #[serde(rename = "Hi", skip_serializing_if = "is_default_surface")]
    pub hi: Surface,
    /// The mid surface is drawn even though the segment is a portal.
    #[serde(rename = "PortalHasMaterial", skip_serializing_if = "is_false")]
    pub portal_has_material: bool,
    /// Bodies may cross the portal.
    #[serde(rename = "PortalIsPassable", default = "default_true", skip_serializing_if = "is_true")]
    pub portal_is_passable: bool,
    /// Crossing the portal applies the teleport transform.
    #[serde(rename = "PortalTeleports", skip_serializing_if = "is_false")]
    pub portal_teleports: bool,
    /// Sector on the other side of the portal.
    #[serde(rename = "AdjacentSector", skip_serializing_if = "is_null")]
    pub adjacent_sector: Entity,
    /// Index of the paired segment in the adjacent sector.
    #[serde(rename = "AdjacentSegment", skip_serializing_if = "Option::is_none")]
    pub adjacent_segment: Option<usize>,
    /// Scripts run when a body touches the segment.
    #[serde(rename = "ContactScripts", skip_serializing_if = "Vec::is_empty")]
    pub contact_scripts: Vec<String>,

    /// Derived edge geometry.
    #[serde(skip)]
    pub segment: Segment,
    /// Position in the owning sector.
    #[serde(skip)]
    pub index: usize,
    /// Previous segment index.
    #[serde(skip)]
    pub prev: usize,
    /// Next segment index.
    #[serde(skip)]
    pub next: usize,
    /// Maps portal-local coordinates (x along the edge, y along the normal)
    /// into the world.
    #[serde(skip)]
    pub portal_matrix: Matrix2,
    /// The portal frame seen from the other side.
    #[serde(skip)]
    pub mirror_portal_matrix: Matrix2,
}

fn is_default_surface(s: &Surface) -> bool {
    *s == Surface::default()
}

impl Default for SectorSegment {
    fn default() -> Self {
        Self {
            p: DynamicValue::default(),
            lo: Surface::default(),
            mid: Surface::default(),
            hi: Surface::default(),
            portal_has_material: false,
            portal_is_passable: true,
            portal_teleports: false,
            adjacent_sector: Entity::NULL,
            adjacent_segment: None,
            contact_scripts: Vec::new(),
            segment: Segment::default(),
            index: 0,
            prev: 0,
            next: 0,
            portal_matrix: Matrix2::IDENTITY,
            mirror_portal_matrix: Matrix2::IDENTITY,
        }
    }
}

impl SectorSegment {
    /// A segment starting at `p`.
    #[must_use]
    pub fn at(p: Vec2) -> Self {
        Self {
            p: DynamicValue::new(p),
            ..Self::default()
        }
    }

    /// Whether the segment couples to another sector.
    #[inline]
    #[must_use]
    pub fn is_portal(&self) -> bool {
        !self.adjacent_sector.is_null()
    }

    /// Whether bodies can move through the segment.
    #[inline]
    #[must_use]
    pub fn is_passable_portal(&self) -> bool {
        self.is_portal() && self.portal_is_passable
    }

    /// Clears the coupling.
    pub fn disconnect(&mut self) {
        self.adjacent_sector = Entity::NULL;
        self.adjacent_segment = None;
    }

    /// Rebuilds the edge from the current vertices and the teleport frames.
    ///
    /// # Arguments
    ///
    /// * `next` - Start vertex of the following segment
    /// * `flip` - Negate the normal so that it points into the sector
    pub fn recalculate(&mut self, next: Vec2, flip: bool) {
        self.segment = Segment::new(self.p.now, next);
        if flip {
            self.segment.normal = -self.segment.normal;
        }
        let s = &self.segment;
        self.portal_matrix = Matrix2::new(s.delta(), s.normal, s.a);
        self.mirror_portal_matrix = Matrix2::new(-s.delta(), -s.normal, s.b);
    }

    /// Visits the vertex and the surface transforms.
    pub fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.p);
        self.lo.for_each_dynamic(f);
        self.mid.for_each_dynamic(f);
        self.hi.for_each_dynamic(f);
    }

    /// Visits the adjacent sector and the materials.
    pub fn for_each_entity_ref(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        f(&mut self.adjacent_sector);
        self.lo.for_each_entity_ref(f);
        self.mid.for_each_entity_ref(f);
        self.hi.for_each_entity_ref(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_passable_and_unsaved() {
        let s = SectorSegment::at(Vec2::new(1.0, 2.0));
        assert!(s.portal_is_passable);
        let yaml = serde_yaml::to_string(&s).unwrap();
        assert!(!yaml.contains("PortalIsPassable"));
        assert!(!yaml.contains("AdjacentSector"));
        let back: SectorSegment = serde_yaml::from_str(&yaml).unwrap();
        assert!(back.portal_is_passable);
        assert_eq!(back.p.now, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_portal_matrices_map_edge_frame() {
        let mut s = SectorSegment::at(Vec2::new(0.0, 0.0));
        s.recalculate(Vec2::new(10.0, 0.0), false);
        let mid = s.portal_matrix.project(Vec2::new(0.5, 0.0));
        assert!((mid.x - 5.0).abs() < 1e-9);
        let mirrored = s.mirror_portal_matrix.project(Vec2::new(0.25, 0.0));
        assert!((mirrored.x - 7.5).abs() < 1e-9);
        let local = s.portal_matrix.unproject(Vec2::new(2.0, 3.0)).unwrap();
        assert!((local.x - 0.2).abs() < 1e-9);
        assert!((local.y - 3.0).abs() < 1e-9);
    }
}
