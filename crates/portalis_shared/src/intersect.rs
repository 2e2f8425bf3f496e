//! 2D intersection and distance primitives.

use crate::constants::INTERSECT_EPSILON;
use crate::math::Vec2;

/// Intersects segment `a1→a2` with segment `b1→b2`.
///
/// Returns the intersection point when both parameters lie in `[0, 1]`
/// (with [`INTERSECT_EPSILON`] slack), or `None` for parallel or disjoint
/// segments.
#[must_use]
pub fn intersect_segments(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let (s, t) = segment_parameters(a1, a2, b1, b2)?;
    if (-INTERSECT_EPSILON..=1.0 + INTERSECT_EPSILON).contains(&s)
        && (-INTERSECT_EPSILON..=1.0 + INTERSECT_EPSILON).contains(&t)
    {
        Some(a1 + (a2 - a1) * s)
    } else {
        None
    }
}

/// Intersects segment `a1→a2` with the infinite line through `l1` and `l2`.
#[must_use]
pub fn intersect_segment_line(a1: Vec2, a2: Vec2, l1: Vec2, l2: Vec2) -> Option<Vec2> {
    let (s, _) = segment_parameters(a1, a2, l1, l2)?;
    if (-INTERSECT_EPSILON..=1.0 + INTERSECT_EPSILON).contains(&s) {
        Some(a1 + (a2 - a1) * s)
    } else {
        None
    }
}

/// Parameters `(s, t)` such that `a1 + s·(a2-a1) == b1 + t·(b2-b1)`.
#[must_use]
pub fn segment_parameters(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<(f64, f64)> {
    let da = a2 - a1;
    let db = b2 - b1;
    let denom = da.cross(db);
    if denom.abs() < INTERSECT_EPSILON {
        return None;
    }
    let diff = b1 - a1;
    Some((diff.cross(db) / denom, diff.cross(da) / denom))
}

/// Closest point to `p` on segment `a→b`.
#[must_use]
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let d = b - a;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return a;
    }
    let t = ((p - a).dot(d) / len2).clamp(0.0, 1.0);
    a + d * t
}

/// Squared distance from `p` to segment `a→b`.
#[must_use]
pub fn distance_to_segment_squared(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    closest_point_on_segment(a, b, p).distance_squared(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_segments() {
        let p = intersect_segments(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 0.0),
        )
        .unwrap();
        assert!((p.x - 5.0).abs() < 1e-9);
        assert!((p.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_and_parallel() {
        assert!(intersect_segments(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0)
        )
        .is_none());
        assert!(intersect_segments(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(5.0, 1.0)
        )
        .is_none());
    }

    #[test]
    fn test_closest_point_clamps() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(closest_point_on_segment(a, b, Vec2::new(-5.0, 3.0)), a);
        assert_eq!(closest_point_on_segment(a, b, Vec2::new(4.0, 3.0)), Vec2::new(4.0, 0.0));
        assert!((distance_to_segment_squared(a, b, Vec2::new(4.0, 3.0)) - 9.0).abs() < 1e-12);
    }
}
