//! # Animations
//!
//! An animation drives the `now` slot of a [`DynamicValue`](super::DynamicValue)
//! between two endpoints. Progress is a percentage advanced once per fixed
//! simulation step; the lifetime decides what happens at an endpoint.

use portalis_shared::Tween;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::value::DynamicType;

/// Default animation length in milliseconds.
pub const DEFAULT_DURATION_MS: f64 = 1000.0;

/// What an animation does when it reaches an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationLifetime {
    /// Run start to end once, then deactivate.
    Once,
    /// Restart from the beginning on completion.
    Loop,
    /// Run start to end and back once, then deactivate.
    BounceOnce,
    /// Run start to end and back forever.
    #[default]
    Bounce,
}

impl AnimationLifetime {
    #[inline]
    const fn bounces(self) -> bool {
        matches!(self, Self::Bounce | Self::BounceOnce)
    }
}

/// Whether animated values are offsets from the spawn value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationCoordinates {
    /// The spawn value is added to the tweened value.
    #[default]
    Relative,
    /// The tweened value is used as is.
    Absolute,
}

/// A tween between two values of `T`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, bound = "T: DynamicType")]
pub struct Animation<T: DynamicType> {
    /// Easing curve.
    #[serde(
        rename = "TweeningFunc",
        deserialize_with = "deserialize_tween",
        skip_serializing_if = "is_lerp"
    )]
    pub tween: Tween,
    /// Value at 0%.
    #[serde(rename = "Start")]
    pub start: T,
    /// Value at 100%.
    #[serde(rename = "End")]
    pub end: T,
    /// Length of one pass in milliseconds.
    #[serde(rename = "Duration", skip_serializing_if = "is_default_duration")]
    pub duration: f64,
    /// Whether the animation advances.
    #[serde(rename = "Active", skip_serializing_if = "is_true")]
    pub active: bool,
    /// Running from end to start.
    #[serde(rename = "Reverse", skip_serializing_if = "is_false")]
    pub reverse: bool,
    /// Endpoint behaviour.
    #[serde(rename = "Lifetime", skip_serializing_if = "is_default_lifetime")]
    pub lifetime: AnimationLifetime,
    /// Relative or absolute values.
    #[serde(rename = "Coordinates", skip_serializing_if = "is_relative")]
    pub coordinates: AnimationCoordinates,
    /// Progress in `[0, 1]`.
    #[serde(rename = "Percent", skip_serializing_if = "is_zero")]
    pub percent: f64,
}

impl<T: DynamicType> Default for Animation<T> {
    fn default() -> Self {
        Self {
            tween: Tween::Lerp,
            start: T::default(),
            end: T::default(),
            duration: DEFAULT_DURATION_MS,
            active: true,
            reverse: false,
            lifetime: AnimationLifetime::Bounce,
            coordinates: AnimationCoordinates::Relative,
            percent: 0.0,
        }
    }
}

impl<T: DynamicType> Animation<T> {
    /// Creates an active animation with default settings.
    #[must_use]
    pub fn new(start: T, end: T, duration: f64, lifetime: AnimationLifetime) -> Self {
        Self {
            start,
            end,
            duration,
            lifetime,
            ..Self::default()
        }
    }

    /// Rewinds to the start of the current direction.
    pub fn reset(&mut self) {
        self.percent = if self.reverse { 1.0 } else { 0.0 };
    }

    /// Advances by `dt_ms` and returns the value for this step.
    ///
    /// Returns `None` when inactive. `spawn` is added to the tweened value for
    /// relative animations.
    pub fn advance(&mut self, dt_ms: f64, spawn: T) -> Option<T> {
        if !self.active {
            return None;
        }

        let delta = if self.duration > 0.0 { dt_ms / self.duration } else { 1.0 };
        if self.reverse {
            self.percent -= delta;
        } else {
            self.percent += delta;
        }
        self.percent = self.percent.clamp(0.0, 1.0);

        let mut progress = self.percent;
        if self.lifetime.bounces() {
            progress *= 2.0;
            if progress > 1.0 {
                progress = 2.0 - progress;
            }
        }

        let mut value = T::tween(self.start, self.end, progress, self.tween);
        if self.coordinates == AnimationCoordinates::Relative {
            value = value.offset(spawn);
        }

        let at_end = (self.percent >= 1.0 && !self.reverse) || (self.percent <= 0.0 && self.reverse);
        if at_end {
            match self.lifetime {
                AnimationLifetime::Once | AnimationLifetime::BounceOnce => self.active = false,
                AnimationLifetime::Bounce => self.reverse = !self.reverse,
                AnimationLifetime::Loop => self.reset(),
            }
        }

        Some(value)
    }
}

fn deserialize_tween<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tween, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(Tween::from_name(&name).unwrap_or_else(|| {
        warn!(tween = %name, "Unknown tweening function, using Lerp");
        Tween::Lerp
    }))
}

fn is_lerp(t: &Tween) -> bool {
    *t == Tween::Lerp
}

fn is_default_duration(d: &f64) -> bool {
    (*d - DEFAULT_DURATION_MS).abs() < f64::EPSILON
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_default_lifetime(l: &AnimationLifetime) -> bool {
    *l == AnimationLifetime::Bounce
}

fn is_relative(c: &AnimationCoordinates) -> bool {
    *c == AnimationCoordinates::Relative
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn once(start: f64, end: f64, duration: f64) -> Animation<f64> {
        let mut a = Animation::new(start, end, duration, AnimationLifetime::Once);
        a.coordinates = AnimationCoordinates::Absolute;
        a
    }

    #[test]
    fn test_defaults() {
        let a = Animation::<f64>::default();
        assert!(a.active);
        assert_eq!(a.duration, DEFAULT_DURATION_MS);
        assert_eq!(a.tween, Tween::Lerp);
        assert_eq!(a.lifetime, AnimationLifetime::Bounce);
        assert_eq!(a.coordinates, AnimationCoordinates::Relative);
    }

    #[test]
    fn test_once_deactivates_at_end() {
        let mut a = once(0.0, 10.0, 100.0);
        let mut last = 0.0;
        for _ in 0..10 {
            if let Some(v) = a.advance(25.0, 0.0) {
                last = v;
            }
        }
        assert!(!a.active);
        assert!((last - 10.0).abs() < 1e-9);
        assert!(a.advance(25.0, 0.0).is_none());
    }

    #[test]
    fn test_bounce_reverses() {
        let mut a = Animation::new(0.0, 10.0, 100.0, AnimationLifetime::Bounce);
        a.coordinates = AnimationCoordinates::Absolute;
        let mid = a.advance(25.0, 0.0).unwrap();
        assert!((mid - 5.0).abs() < 1e-9, "bounce runs there and back in one pass");
        for _ in 0..3 {
            a.advance(25.0, 0.0);
        }
        assert!(a.reverse);
        assert!(a.active);
    }

    #[test]
    fn test_loop_rewinds() {
        let mut a = Animation::new(0.0, 10.0, 50.0, AnimationLifetime::Loop);
        a.coordinates = AnimationCoordinates::Absolute;
        a.advance(25.0, 0.0);
        a.advance(25.0, 0.0);
        assert_eq!(a.percent, 0.0);
        assert!(a.active);
    }

    #[test]
    fn test_relative_adds_spawn() {
        let mut a = Animation::new(0.0, 10.0, 100.0, AnimationLifetime::Once);
        let v = a.advance(50.0, 100.0).unwrap();
        assert!((v - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_tween_falls_back() {
        let a: Animation<f64> = serde_yaml::from_str("TweeningFunc: Wobble\nStart: 1\nEnd: 2\n").unwrap();
        assert_eq!(a.tween, Tween::Lerp);
        assert_eq!(a.start, 1.0);
        assert_eq!(a.duration, DEFAULT_DURATION_MS);
    }
}
