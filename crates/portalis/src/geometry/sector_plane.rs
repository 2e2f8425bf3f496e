//! Floor and ceiling planes.
//!
//! A plane is a height plus a slope along the inward normal of the sector's
//! first segment. A plane with a `Target` is itself a portal: bodies falling
//! through the floor (or rising through the ceiling) continue in the target
//! sector.

use serde::{Deserialize, Serialize};

use portalis_core::{Dynamic, DynamicValue, Entity};
use portalis_shared::{Vec2, Vec3};

use super::surface::Surface;
use crate::serde_helpers::{is_null, is_zero};

/// Which plane of a sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneKind {
    /// The floor, normal pointing up.
    Bottom,
    /// The ceiling, normal pointing down.
    Top,
}

/// A sloped floor or ceiling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorPlane {
    /// Height at the first vertex.
    #[serde(rename = "Z")]
    pub z: DynamicValue<f64>,
    /// Height change per unit along the first segment's inward normal.
    #[serde(rename = "Slope", skip_serializing_if = "is_zero")]
    pub slope: f64,
    /// Sector entered through this plane.
    #[serde(rename = "Target", skip_serializing_if = "is_null")]
    pub target: Entity,
    /// Drawn surface.
    #[serde(rename = "Surface", skip_serializing_if = "is_default_surface")]
    pub surface: Surface,
    /// Scripts run when a body touches the plane.
    #[serde(rename = "Scripts", skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,
    /// Unit normal, derived.
    #[serde(skip)]
    pub normal: Vec3,
}

fn is_default_surface(s: &Surface) -> bool {
    *s == Surface::default()
}

impl SectorPlane {
    /// A flat plane at `z`.
    #[must_use]
    pub fn at(z: f64) -> Self {
        Self {
            z: DynamicValue::new(z),
            ..Self::default()
        }
    }

    /// Rederives the normal.
    ///
    /// # Arguments
    ///
    /// * `kind` - Which side of the sector the plane bounds
    /// * `inward` - Inward normal of the sector's first segment
    pub fn recalculate(&mut self, kind: PlaneKind, inward: Vec2) {
        let n = Vec3::new(-self.slope * inward.x, -self.slope * inward.y, 1.0).normalize();
        self.normal = match kind {
            PlaneKind::Bottom => n,
            PlaneKind::Top => -n,
        };
    }

    /// Height at `p` from the current value.
    ///
    /// # Arguments
    ///
    /// * `origin` - First vertex of the sector
    /// * `inward` - Inward normal of the sector's first segment
    #[inline]
    #[must_use]
    pub fn z_at(&self, origin: Vec2, inward: Vec2, p: Vec2) -> f64 {
        plane_height(self.z.now, self.slope, origin, inward, p)
    }

    /// Height at `p` from the render-blended value.
    #[inline]
    #[must_use]
    pub fn render_z_at(&self, origin: Vec2, inward: Vec2, p: Vec2) -> f64 {
        plane_height(self.z.render, self.slope, origin, inward, p)
    }

    /// Visits the height and the surface transform.
    pub fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.z);
        self.surface.for_each_dynamic(f);
    }

    /// Visits the target and the material.
    pub fn for_each_entity_ref(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        f(&mut self.target);
        self.surface.for_each_entity_ref(f);
    }
}

#[inline]
fn plane_height(z: f64, slope: f64, origin: Vec2, inward: Vec2, p: Vec2) -> f64 {
    if slope == 0.0 {
        z
    } else {
        z + slope * (p - origin).dot(inward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_plane_normals() {
        let mut floor = SectorPlane::at(0.0);
        let mut ceil = SectorPlane::at(64.0);
        floor.recalculate(PlaneKind::Bottom, Vec2::new(0.0, 1.0));
        ceil.recalculate(PlaneKind::Top, Vec2::new(0.0, 1.0));
        assert_eq!(floor.normal, Vec3::Z);
        assert_eq!(ceil.normal, -Vec3::Z);
        assert!((ceil.z_at(Vec2::ZERO, Vec2::new(0.0, 1.0), Vec2::new(3.0, 7.0)) - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_slope_raises_along_inward_normal() {
        let mut floor = SectorPlane::at(10.0);
        floor.slope = 0.5;
        let inward = Vec2::new(0.0, 1.0);
        floor.recalculate(PlaneKind::Bottom, inward);
        assert!((floor.z_at(Vec2::ZERO, inward, Vec2::new(5.0, 4.0)) - 12.0).abs() < 1e-9);
        assert!(floor.normal.z > 0.0);
        assert!(floor.normal.y < 0.0);
        assert!((floor.normal.length() - 1.0).abs() < 1e-9);
    }
}
