//! # Segments
//!
//! A directed 2D edge with its derived length and unit normal. Sector edges
//! and free-standing internal walls both build on this.
//!
//! The normal is the edge direction rotated a quarter turn counter-clockwise.
//! Sector recalculation flips it by the polygon winding so that it always
//! points into the sector interior.

use portalis_shared::constants::{INTERSECT_EPSILON, MATCH_EPSILON};
use portalis_shared::intersect::{closest_point_on_segment, segment_parameters};
use portalis_shared::{Vec2, Vec3};

/// A directed edge `a → b`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Segment {
    /// Start vertex.
    pub a: Vec2,
    /// End vertex.
    pub b: Vec2,
    /// Length of the edge.
    pub length: f64,
    /// Unit normal.
    pub normal: Vec2,
}

impl Segment {
    /// Builds a segment and derives its length and normal.
    #[must_use]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        let mut s = Self {
            a,
            b,
            ..Self::default()
        };
        s.recalculate();
        s
    }

    /// Rederives length and normal from the endpoints.
    pub fn recalculate(&mut self) {
        let d = self.b - self.a;
        self.length = d.length();
        self.normal = if self.length > 0.0 {
            Vec2::new(-d.y / self.length, d.x / self.length)
        } else {
            Vec2::ZERO
        };
    }

    /// Edge direction `b - a`.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.b - self.a
    }

    /// Midpoint of the edge.
    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }

    /// Closest point on the edge to `p`.
    #[inline]
    #[must_use]
    pub fn closest_to_point(&self, p: Vec2) -> Vec2 {
        closest_point_on_segment(self.a, self.b, p)
    }

    /// Squared distance from `p` to the edge.
    #[inline]
    #[must_use]
    pub fn distance_to_point_squared(&self, p: Vec2) -> f64 {
        self.closest_to_point(p).distance_squared(p)
    }

    /// Signed distance of `p` from the edge's line, positive on the normal
    /// side.
    #[inline]
    #[must_use]
    pub fn which_side(&self, p: Vec2) -> f64 {
        self.normal.dot(p - self.a)
    }

    /// Whether both segments share endpoints, in either direction.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let near = |p: Vec2, q: Vec2| (p.x - q.x).abs() < MATCH_EPSILON && (p.y - q.y).abs() < MATCH_EPSILON;
        (near(self.a, other.a) && near(self.b, other.b)) || (near(self.a, other.b) && near(self.b, other.a))
    }

    /// Intersects the edge with the segment `p1 → p2`.
    #[must_use]
    pub fn intersect_2d(&self, p1: Vec2, p2: Vec2) -> Option<Vec2> {
        portalis_shared::intersect::intersect_segments(self.a, self.b, p1, p2)
    }

    /// Intersects the edge, extruded between `bottom` and `top`, with the
    /// 3D segment `start → end`.
    ///
    /// # Returns
    ///
    /// The intersection point with its height interpolated along the ray, or
    /// `None` if the ray misses the edge or passes above or below it.
    #[must_use]
    pub fn intersect_3d(&self, bottom: f64, top: f64, start: Vec3, end: Vec3) -> Option<Vec3> {
        let (s, t) = segment_parameters(self.a, self.b, start.to_2d(), end.to_2d())?;
        let range = -INTERSECT_EPSILON..=1.0 + INTERSECT_EPSILON;
        if !range.contains(&s) || !range.contains(&t) {
            return None;
        }
        let p = self.a + self.delta() * s;
        let z = start.z + (end.z - start.z) * t;
        if z < bottom || z > top {
            return None;
        }
        Some(p.to_3d(z))
    }

    /// Whether the edge's bounding box overlaps `[min, max]`.
    #[must_use]
    pub fn aabb_intersect(&self, min: Vec2, max: Vec2) -> bool {
        let lo = self.a.min(self.b);
        let hi = self.a.max(self.b);
        lo.x <= max.x && hi.x >= min.x && lo.y <= max.y && hi.y >= min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_normal_is_left_of_direction() {
        let s = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert!((s.length - 10.0).abs() < EPSILON);
        assert!((s.normal.x).abs() < EPSILON);
        assert!((s.normal.y - 1.0).abs() < EPSILON);
        assert!(s.which_side(Vec2::new(5.0, 3.0)) > 0.0);
        assert!(s.which_side(Vec2::new(5.0, -3.0)) < 0.0);
    }

    #[test]
    fn test_degenerate_segment_has_zero_normal() {
        let s = Segment::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        assert_eq!(s.normal, Vec2::ZERO);
        assert!((s.distance_to_point_squared(Vec2::new(4.0, 5.0)) - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_matches_either_direction() {
        let s = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let r = Segment::new(Vec2::new(10.0, 0.00001), Vec2::new(0.0, 0.0));
        let other = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 1.0));
        assert!(s.matches(&r));
        assert!(!s.matches(&other));
    }

    #[test]
    fn test_intersect_3d_respects_height() {
        let s = Segment::new(Vec2::new(0.0, -5.0), Vec2::new(0.0, 5.0));
        let hit = s
            .intersect_3d(0.0, 10.0, Vec3::new(-5.0, 0.0, 2.0), Vec3::new(5.0, 0.0, 6.0))
            .unwrap();
        assert!(hit.x.abs() < EPSILON);
        assert!((hit.z - 4.0).abs() < EPSILON);
        assert!(s
            .intersect_3d(0.0, 3.0, Vec3::new(-5.0, 0.0, 2.0), Vec3::new(5.0, 0.0, 6.0))
            .is_none());
        assert!(s
            .intersect_3d(0.0, 10.0, Vec3::new(1.0, 0.0, 2.0), Vec3::new(5.0, 0.0, 6.0))
            .is_none());
    }

    #[test]
    fn test_closest_point_clamps_to_endpoints() {
        let s = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert_eq!(s.closest_to_point(Vec2::new(-4.0, 3.0)), Vec2::new(0.0, 0.0));
        assert_eq!(s.closest_to_point(Vec2::new(4.0, 3.0)), Vec2::new(4.0, 0.0));
    }
}
