//! # Sectors
//!
//! A polygonal floor plan extruded between a floor and a ceiling plane.
//!
//! ## Authored vs derived data
//!
//! - Authored: planes, segment vertices and surfaces, portal couplings,
//!   gravity, friction, scripts, layer
//! - Derived by [`Sector::recalculate`]: winding, segment geometry and links,
//!   plane normals, bounds, centre, lightmap size
//! - Derived by the world-level passes: inner/outer nesting, bodies inside,
//!   internal segments, visibility sets
//!
//! Cross-sector references are entity handles plus segment indices; nothing
//! here points into another component.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use portalis_core::{component_base, Base, Component, Dynamic, Entity};
use portalis_shared::constants::{
    DEFAULT_CEILING_Z, FLOOR_FRICTION, GRAVITY, LIGHTMAP_BORDER, LIGHT_GRID, MATCH_EPSILON,
};
use portalis_shared::{Vec2, Vec3, Vec4};

use super::sector_plane::{PlaneKind, SectorPlane};
use super::sector_segment::SectorSegment;
use crate::serde_helpers::is_zero_i32;

/// Squared distance under which a point counts as lying on a segment.
pub const ON_SEGMENT_EPSILON_SQUARED: f64 = 1e-12;

/// A sector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sector {
    #[serde(flatten)]
    base: Base,
    /// Floor.
    #[serde(rename = "Bottom")]
    pub bottom: SectorPlane,
    /// Ceiling.
    #[serde(rename = "Top")]
    pub top: SectorPlane,
    /// Cyclic edge list.
    #[serde(rename = "Segments")]
    pub segments: Vec<SectorSegment>,
    /// Gravity in m/s².
    #[serde(rename = "Gravity", skip_serializing_if = "is_default_gravity")]
    pub gravity: Vec3,
    /// Kinetic friction applied to bodies resting on the floor.
    #[serde(rename = "FloorFriction", skip_serializing_if = "is_default_friction")]
    pub floor_friction: f64,
    /// Scripts run when a body enters.
    #[serde(rename = "EnterScripts", skip_serializing_if = "Vec::is_empty")]
    pub enter_scripts: Vec<String>,
    /// Scripts run when a body leaves.
    #[serde(rename = "ExitScripts", skip_serializing_if = "Vec::is_empty")]
    pub exit_scripts: Vec<String>,
    /// Nesting preference: containing sectors with a higher layer win.
    #[serde(rename = "Layer", skip_serializing_if = "is_zero_i32")]
    pub layer: i32,

    /// Sectors nested inside this one.
    #[serde(skip)]
    pub inner: Vec<Entity>,
    /// Sector this one is nested inside.
    #[serde(skip)]
    pub outer: Entity,
    /// Bodies currently inside.
    #[serde(skip)]
    pub bodies: BTreeSet<Entity>,
    /// Internal segments lying within the sector.
    #[serde(skip)]
    pub internal_segments: Vec<Entity>,
    /// Potentially visible sectors, this one included.
    #[serde(skip)]
    pub pvs: Vec<Entity>,
    /// Light-bearing bodies in the visible sectors.
    #[serde(skip)]
    pub pvl: Vec<Entity>,
    /// `1` for counter-clockwise input, `-1` for clockwise.
    #[serde(skip)]
    pub winding: i8,
    /// Whether any interior angle exceeds 180°.
    #[serde(skip)]
    pub concave: bool,
    /// Bounds including the plane heights.
    #[serde(skip)]
    pub min: Vec3,
    /// Bounds including the plane heights.
    #[serde(skip)]
    pub max: Vec3,
    /// Vertex average, with the mid height.
    #[serde(skip)]
    pub center: Vec3,
    /// Lightmap cells along X.
    #[serde(skip)]
    pub lightmap_width: u32,
    /// Lightmap cells along Y.
    #[serde(skip)]
    pub lightmap_height: u32,
    /// Lightmap buffer, filled by the renderer.
    #[serde(skip)]
    pub lightmap: Vec<Vec4>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_gravity(g: &Vec3) -> bool {
    *g == Vec3::new(0.0, 0.0, -GRAVITY)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_friction(f: &f64) -> bool {
    (*f - FLOOR_FRICTION).abs() < f64::EPSILON
}

impl Default for Sector {
    fn default() -> Self {
        Self {
            base: Base::default(),
            bottom: SectorPlane::at(0.0),
            top: SectorPlane::at(DEFAULT_CEILING_Z),
            segments: Vec::new(),
            gravity: Vec3::new(0.0, 0.0, -GRAVITY),
            floor_friction: FLOOR_FRICTION,
            enter_scripts: Vec::new(),
            exit_scripts: Vec::new(),
            layer: 0,
            inner: Vec::new(),
            outer: Entity::NULL,
            bodies: BTreeSet::new(),
            internal_segments: Vec::new(),
            pvs: Vec::new(),
            pvl: Vec::new(),
            winding: 1,
            concave: false,
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            center: Vec3::ZERO,
            lightmap_width: 0,
            lightmap_height: 0,
            lightmap: Vec::new(),
        }
    }
}

impl Component for Sector {
    const NAME: &'static str = "core.Sector";
    component_base!();

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        self.bottom.for_each_dynamic(f);
        self.top.for_each_dynamic(f);
        for segment in &mut self.segments {
            segment.for_each_dynamic(f);
        }
    }

    fn for_each_entity_ref(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        self.bottom.for_each_entity_ref(f);
        self.top.for_each_entity_ref(f);
        for segment in &mut self.segments {
            segment.for_each_entity_ref(f);
        }
    }
}

impl Sector {
    /// A sector with one segment per vertex, recalculated.
    #[must_use]
    pub fn from_points(points: &[Vec2]) -> Self {
        let mut sector = Self {
            segments: points.iter().copied().map(SectorSegment::at).collect(),
            ..Self::default()
        };
        sector.recalculate();
        sector
    }

    // =========================================================================
    // Recalculation
    // =========================================================================

    /// Rebuilds every derived field from the authored data.
    pub fn recalculate(&mut self) {
        self.recalculate_with_grid(LIGHT_GRID);
    }

    /// As [`Sector::recalculate`], with an explicit lightmap cell size.
    pub fn recalculate_with_grid(&mut self, light_grid: f64) {
        self.remove_degenerate_segments();
        let count = self.segments.len();
        if count == 0 {
            return;
        }

        let mut sum = 0.0;
        for i in 0..count {
            let p = self.segments[i].p.now;
            let next = self.segments[(i + 1) % count].p.now;
            sum += (next.x - p.x) * (p.y + next.y);
        }
        self.winding = if sum < 0.0 { 1 } else { -1 };
        let flip = self.winding < 0;

        for i in 0..count {
            let next_p = self.segments[(i + 1) % count].p.now;
            let segment = &mut self.segments[i];
            segment.index = i;
            segment.prev = (i + count - 1) % count;
            segment.next = (i + 1) % count;
            segment.recalculate(next_p, flip);
        }

        let origin = self.segments[0].p.now;
        let inward = self.segments[0].segment.normal;
        self.bottom.recalculate(PlaneKind::Bottom, inward);
        self.top.recalculate(PlaneKind::Top, inward);

        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut center = Vec2::ZERO;
        for segment in &self.segments {
            let p = segment.p.now;
            let floor = self.bottom.z_at(origin, inward, p);
            let ceil = self.top.z_at(origin, inward, p);
            min = min.min(Vec3::new(p.x, p.y, floor.min(ceil)));
            max = max.max(Vec3::new(p.x, p.y, floor.max(ceil)));
            center += p;
        }
        center = center * (1.0 / count as f64);
        self.min = min;
        self.max = max;
        self.center = center.to_3d((self.bottom.z_at(origin, inward, center) + self.top.z_at(origin, inward, center)) * 0.5);

        self.concave = false;
        let mut sign = 0.0_f64;
        for segment in &self.segments {
            let next = &self.segments[segment.next];
            let c = segment.segment.delta().cross(next.segment.delta());
            if c.abs() < f64::EPSILON {
                continue;
            }
            if sign != 0.0 && c.signum() != sign {
                self.concave = true;
                break;
            }
            sign = c.signum();
        }

        self.lightmap_width = cells(max.x - min.x, light_grid);
        self.lightmap_height = cells(max.y - min.y, light_grid);
        self.lightmap
            .resize((self.lightmap_width * self.lightmap_height) as usize, Vec4::ZERO);
    }

    fn remove_degenerate_segments(&mut self) {
        let mut i = 0;
        while self.segments.len() > 1 && i < self.segments.len() {
            let next = (i + 1) % self.segments.len();
            if self.segments[i].p.now.distance_squared(self.segments[next].p.now) <= f64::EPSILON {
                self.segments.remove(i);
            } else {
                i += 1;
            }
        }
    }

    // =========================================================================
    // Heights
    // =========================================================================

    fn plane_frame(&self) -> (Vec2, Vec2) {
        self.segments
            .first()
            .map_or((Vec2::ZERO, Vec2::ZERO), |s| (s.p.now, s.segment.normal))
    }

    /// Floor height at `p`.
    #[must_use]
    pub fn floor_z_at(&self, p: Vec2) -> f64 {
        let (origin, inward) = self.plane_frame();
        self.bottom.z_at(origin, inward, p)
    }

    /// Ceiling height at `p`.
    #[must_use]
    pub fn ceil_z_at(&self, p: Vec2) -> f64 {
        let (origin, inward) = self.plane_frame();
        self.top.z_at(origin, inward, p)
    }

    /// Floor and ceiling heights at `p`.
    #[must_use]
    pub fn z_at(&self, p: Vec2) -> (f64, f64) {
        (self.floor_z_at(p), self.ceil_z_at(p))
    }

    /// Render-blended floor and ceiling heights at `p`.
    #[must_use]
    pub fn render_z_at(&self, p: Vec2) -> (f64, f64) {
        let (origin, inward) = self.plane_frame();
        (
            self.bottom.render_z_at(origin, inward, p),
            self.top.render_z_at(origin, inward, p),
        )
    }

    // =========================================================================
    // Containment
    // =========================================================================

    /// Whether `p` lies strictly inside the polygon.
    ///
    /// Points on a segment are outside.
    #[must_use]
    pub fn is_point_inside_2d(&self, p: Vec2) -> bool {
        if self.segments.len() < 3 {
            return false;
        }
        let mut inside = false;
        for segment in &self.segments {
            let s = &segment.segment;
            if s.distance_to_point_squared(p) <= ON_SEGMENT_EPSILON_SQUARED {
                return false;
            }
            let (a, b) = (s.a, s.b);
            if (a.y <= p.y && b.y > p.y) || (b.y <= p.y && a.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether the 3D boxes overlap.
    #[must_use]
    pub fn aabb_intersect(&self, min: Vec3, max: Vec3, include_edges: bool) -> bool {
        overlaps(self.min.x, self.max.x, min.x, max.x, include_edges)
            && overlaps(self.min.y, self.max.y, min.y, max.y, include_edges)
            && overlaps(self.min.z, self.max.z, min.z, max.z, include_edges)
    }

    /// Whether the boxes overlap in the XY plane.
    #[must_use]
    pub fn aabb_intersect_2d(&self, min: Vec2, max: Vec2, include_edges: bool) -> bool {
        overlaps(self.min.x, self.max.x, min.x, max.x, include_edges)
            && overlaps(self.min.y, self.max.y, min.y, max.y, include_edges)
    }

    /// Whether `p` is within the XY bounds, with tolerance.
    #[must_use]
    pub fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= self.min.x - MATCH_EPSILON
            && p.x <= self.max.x + MATCH_EPSILON
            && p.y >= self.min.y - MATCH_EPSILON
            && p.y <= self.max.y + MATCH_EPSILON
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Index and squared distance of the segment nearest to `p`.
    #[must_use]
    pub fn nearest_segment(&self, p: Vec2) -> Option<(usize, f64)> {
        self.segments
            .iter()
            .map(|s| (s.index, s.segment.distance_to_point_squared(p)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Splits segment `index` at `p`. The new segment copies every attribute
    /// of the original and starts at `p`. The sector is recalculated with a
    /// lightmap cell size of `light_grid`.
    ///
    /// # Returns
    ///
    /// The index of the new segment, or `None` if `index` is out of range.
    pub fn split_segment(&mut self, index: usize, p: Vec2, light_grid: f64) -> Option<usize> {
        let original = self.segments.get(index)?;
        let mut copy = original.clone();
        copy.p.set_all(p);
        self.segments.insert(index + 1, copy);
        self.recalculate_with_grid(light_grid);
        Some(index + 1)
    }

    /// Indices of the segments coupled to `sector`.
    #[must_use]
    pub fn portals_to(&self, sector: Entity) -> Vec<usize> {
        self.segments
            .iter()
            .filter(|s| s.adjacent_sector == sector)
            .map(|s| s.index)
            .collect()
    }

    /// The lightmap as raw bytes, row-major RGBA in f64, ready for upload.
    #[must_use]
    pub fn lightmap_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lightmap)
    }
}

fn overlaps(a_min: f64, a_max: f64, b_min: f64, b_max: f64, include_edges: bool) -> bool {
    if include_edges {
        a_min <= b_max && a_max >= b_min
    } else {
        a_min < b_max && a_max > b_min
    }
}

fn cells(extent: f64, grid: f64) -> u32 {
    if grid <= 0.0 || !extent.is_finite() {
        return LIGHTMAP_BORDER * 2;
    }
    (extent / grid).ceil().max(0.0) as u32 + LIGHTMAP_BORDER * 2
}
