//! # Tweening Functions
//!
//! Scalar easing curves used by animations. Every curve has a stable name
//! that appears verbatim in world files, so the names below are part of the
//! persisted format.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::math::{DEG_TO_RAD, RAD_TO_DEG};

/// A named easing curve mapping `t ∈ [0, 1]` onto `[start, end]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tween {
    /// Linear interpolation.
    #[default]
    Lerp,
    /// Quadratic ease-in.
    EaseIn2,
    /// Cubic ease-in.
    EaseIn3,
    /// Quartic ease-in.
    EaseIn4,
    /// Quadratic ease-out.
    EaseOut2,
    /// Cubic ease-out.
    EaseOut3,
    /// Quartic ease-out.
    EaseOut4,
    /// Quadratic ease-in-out.
    EaseInOut2,
    /// Cubic ease-in-out.
    EaseInOut3,
    /// Quartic ease-in-out.
    EaseInOut4,
    /// Linear up to the midpoint, then back.
    Spike,
    /// Quadratic spike.
    Spike2,
    /// Cubic spike.
    Spike3,
    /// Quartic spike.
    Spike4,
    /// Elastic ease-in.
    ElasticIn,
    /// Elastic ease-out.
    ElasticOut,
    /// Elastic ease-in-out.
    ElasticInOut,
}

impl Tween {
    /// Every tween, in catalogue order.
    pub const ALL: [Self; 17] = [
        Self::Lerp,
        Self::EaseIn2,
        Self::EaseIn3,
        Self::EaseIn4,
        Self::EaseOut2,
        Self::EaseOut3,
        Self::EaseOut4,
        Self::EaseInOut2,
        Self::EaseInOut3,
        Self::EaseInOut4,
        Self::Spike,
        Self::Spike2,
        Self::Spike3,
        Self::Spike4,
        Self::ElasticIn,
        Self::ElasticOut,
        Self::ElasticInOut,
    ];

    /// The stable serialized name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lerp => "Lerp",
            Self::EaseIn2 => "EaseIn2",
            Self::EaseIn3 => "EaseIn3",
            Self::EaseIn4 => "EaseIn4",
            Self::EaseOut2 => "EaseOut2",
            Self::EaseOut3 => "EaseOut3",
            Self::EaseOut4 => "EaseOut4",
            Self::EaseInOut2 => "EaseInOut2",
            Self::EaseInOut3 => "EaseInOut3",
            Self::EaseInOut4 => "EaseInOut4",
            Self::Spike => "Spike",
            Self::Spike2 => "Spike2",
            Self::Spike3 => "Spike3",
            Self::Spike4 => "Spike4",
            Self::ElasticIn => "ElasticIn",
            Self::ElasticOut => "ElasticOut",
            Self::ElasticInOut => "ElasticInOut",
        }
    }

    /// Looks a tween up by its serialized name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Evaluates the curve.
    #[must_use]
    pub fn apply(self, start: f64, end: f64, t: f64) -> f64 {
        match self {
            Self::Lerp => lerp(start, end, t),
            Self::EaseIn2 => lerp(start, end, t * t),
            Self::EaseIn3 => lerp(start, end, t * t * t),
            Self::EaseIn4 => lerp(start, end, t * t * t * t),
            Self::EaseOut2 => lerp(start, end, 1.0 - (1.0 - t).powi(2)),
            Self::EaseOut3 => lerp(start, end, 1.0 - (1.0 - t).powi(3)),
            Self::EaseOut4 => lerp(start, end, 1.0 - (1.0 - t).powi(4)),
            Self::EaseInOut2 => lerp(start, end, ease_in_out(t, 2, 2.0)),
            Self::EaseInOut3 => lerp(start, end, ease_in_out(t, 3, 4.0)),
            Self::EaseInOut4 => lerp(start, end, ease_in_out(t, 4, 8.0)),
            Self::Spike => spike(Self::Lerp, start, end, t),
            Self::Spike2 => spike(Self::EaseIn2, start, end, t),
            Self::Spike3 => spike(Self::EaseIn3, start, end, t),
            Self::Spike4 => spike(Self::EaseIn4, start, end, t),
            Self::ElasticIn => elastic(start, end, t, |t| {
                -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * (2.0 * PI / 3.0)).sin()
            }),
            Self::ElasticOut => elastic(start, end, t, |t| {
                2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * (2.0 * PI / 3.0)).sin() + 1.0
            }),
            Self::ElasticInOut => elastic(start, end, t, |t| {
                let c5 = 2.0 * PI / 4.5;
                if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
                }
            }),
        }
    }

    /// Tweens between two angles in degrees through Cartesian space so the
    /// short way around the circle is taken.
    #[must_use]
    pub fn apply_angle(self, start: f64, end: f64, t: f64) -> f64 {
        let (y1, x1) = (start * DEG_TO_RAD).sin_cos();
        let (y2, x2) = (end * DEG_TO_RAD).sin_cos();
        let x = self.apply(x1, x2, t);
        let y = self.apply(y1, y2, t);
        y.atan2(x) * RAD_TO_DEG
    }
}

/// Clamped linear interpolation.
#[inline]
#[must_use]
pub fn lerp(start: f64, end: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return start;
    }
    if t >= 1.0 {
        return end;
    }
    start * (1.0 - t) + end * t
}

fn ease_in_out(t: f64, power: i32, scale: f64) -> f64 {
    if t < 0.5 {
        scale * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) * 0.5
    }
}

fn spike(curve: Tween, start: f64, end: f64, t: f64) -> f64 {
    if t <= 0.5 {
        curve.apply(start, end, t * 2.0)
    } else {
        curve.apply(start, end, (1.0 - t) * 2.0)
    }
}

fn elastic(start: f64, end: f64, t: f64, curve: impl Fn(f64) -> f64) -> f64 {
    if t <= 0.0 {
        return start;
    }
    if t >= 1.0 {
        return end;
    }
    let k = curve(t);
    start * (1.0 - k) + end * k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for tween in Tween::ALL {
            if matches!(tween, Tween::Spike | Tween::Spike2 | Tween::Spike3 | Tween::Spike4) {
                continue;
            }
            assert!((tween.apply(3.0, 7.0, 0.0) - 3.0).abs() < 1e-9, "{}", tween.name());
            assert!((tween.apply(3.0, 7.0, 1.0) - 7.0).abs() < 1e-9, "{}", tween.name());
        }
    }

    #[test]
    fn test_names_are_stable() {
        for tween in Tween::ALL {
            assert_eq!(Tween::from_name(tween.name()), Some(tween));
        }
        assert_eq!(Tween::from_name("Bogus"), None);
    }

    #[test]
    fn test_spike_peaks_at_midpoint() {
        assert!((Tween::Spike.apply(0.0, 10.0, 0.5) - 10.0).abs() < 1e-9);
        assert!(Tween::Spike.apply(0.0, 10.0, 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_takes_short_way() {
        let mid = Tween::Lerp.apply_angle(350.0, 10.0, 0.5);
        assert!(mid.abs() < 1e-9);
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        let a = Tween::EaseInOut2.apply(0.0, 1.0, 0.25);
        let b = Tween::EaseInOut2.apply(0.0, 1.0, 0.75);
        assert!((a + b - 1.0).abs() < 1e-9);
    }
}
