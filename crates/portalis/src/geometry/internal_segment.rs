//! Free-standing walls inside sectors: railings, pillars' faces, glass.
//!
//! An internal segment does not partition its sector. It blocks bodies and
//! rays between its bottom and top heights and can be one- or two-sided.

use serde::{Deserialize, Serialize};

use portalis_core::{component_base, Base, Component, Dynamic, DynamicValue, Entity};
use portalis_shared::{Vec2, Vec3};

use super::segment::Segment;
use super::surface::Surface;
use crate::serde_helpers::{default_true, is_false, is_true};

/// A wall that lives inside one or more sectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalSegment {
    #[serde(flatten)]
    base: Base,
    /// Start vertex.
    #[serde(rename = "A")]
    pub a: DynamicValue<Vec2>,
    /// End vertex.
    #[serde(rename = "B")]
    pub b: DynamicValue<Vec2>,
    /// Lowest blocked height.
    #[serde(rename = "Bottom")]
    pub bottom: f64,
    /// Highest blocked height.
    #[serde(rename = "Top")]
    pub top: f64,
    /// Blocks from both sides.
    #[serde(rename = "TwoSided", default = "default_true", skip_serializing_if = "is_true")]
    pub two_sided: bool,
    /// Drawn, but bodies and rays pass through.
    #[serde(rename = "Portal", skip_serializing_if = "is_false")]
    pub portal: bool,
    /// Drawn surface.
    #[serde(rename = "Surface", skip_serializing_if = "is_default_surface")]
    pub surface: Surface,

    /// Derived edge geometry.
    #[serde(skip)]
    pub segment: Segment,
    /// Sectors the segment lies within.
    #[serde(skip)]
    pub sectors: Vec<Entity>,
}

fn is_default_surface(s: &Surface) -> bool {
    *s == Surface::default()
}

impl Default for InternalSegment {
    fn default() -> Self {
        Self {
            base: Base::default(),
            a: DynamicValue::default(),
            b: DynamicValue::default(),
            bottom: 0.0,
            top: portalis_shared::constants::DEFAULT_CEILING_Z,
            two_sided: true,
            portal: false,
            surface: Surface::default(),
            segment: Segment::default(),
            sectors: Vec::new(),
        }
    }
}

impl Component for InternalSegment {
    const NAME: &'static str = "core.InternalSegment";
    component_base!();

    fn for_each_dynamic(&mut self, f: &mut dyn FnMut(&mut dyn Dynamic)) {
        f(&mut self.a);
        f(&mut self.b);
        self.surface.for_each_dynamic(f);
    }

    fn for_each_entity_ref(&mut self, f: &mut dyn FnMut(&mut Entity)) {
        self.surface.for_each_entity_ref(f);
    }
}

impl InternalSegment {
    /// A wall from `a` to `b` between two heights.
    #[must_use]
    pub fn new(a: Vec2, b: Vec2, bottom: f64, top: f64) -> Self {
        let mut s = Self {
            a: DynamicValue::new(a),
            b: DynamicValue::new(b),
            bottom,
            top,
            ..Self::default()
        };
        s.recalculate();
        s
    }

    /// Rederives the edge from the current vertices.
    pub fn recalculate(&mut self) {
        self.segment = Segment::new(self.a.now, self.b.now);
    }

    /// Whether the wall stops bodies and rays.
    #[inline]
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        !self.portal
    }

    /// Intersects a ray with the wall.
    ///
    /// One-sided walls are only hit from their normal side.
    #[must_use]
    pub fn intersect_ray(&self, start: Vec3, end: Vec3) -> Option<Vec3> {
        if !self.two_sided && self.segment.normal.dot((end - start).to_2d()) > 0.0 {
            return None;
        }
        self.segment.intersect_3d(self.bottom, self.top, start, end)
    }
}
