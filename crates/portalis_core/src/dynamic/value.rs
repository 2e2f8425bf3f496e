//! # Dynamic Values
//!
//! A dynamic value is a scalar, vector or matrix that the simulation can
//! animate and the renderer can blend. It carries four slots:
//!
//! - `spawn`: the authored value, the only slot that is persisted
//! - `prev`: `now` as of the last fixed step
//! - `now`: the current simulated value
//! - `render`: `prev` blended towards `now` for the current render frame
//!
//! Components expose their dynamic values through
//! [`Component::for_each_dynamic`](crate::ecs::Component::for_each_dynamic);
//! there is no global registry of live values.

use std::fmt::Debug;

use portalis_shared::{Matrix2, Tween, Vec2, Vec3, Vec4};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::animation::Animation;
use crate::ecs::Entity;

// =============================================================================
// VALUE TYPES
// =============================================================================

/// A type that can live inside a [`DynamicValue`].
pub trait DynamicType:
    Copy + Default + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Whether render blending interpolates between `prev` and `now`.
    const BLENDS: bool = true;

    /// Evaluates `tween` between `start` and `end`.
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self;

    /// `self` offset by `by`, for relative animations.
    fn offset(self, by: Self) -> Self;
}

impl DynamicType for f64 {
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        tween.apply(start, end, t)
    }

    fn offset(self, by: Self) -> Self {
        self + by
    }
}

impl DynamicType for i32 {
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        tween.apply(f64::from(start), f64::from(end), t).round() as i32
    }

    fn offset(self, by: Self) -> Self {
        self.wrapping_add(by)
    }
}

impl DynamicType for Vec2 {
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        Self::new(tween.apply(start.x, end.x, t), tween.apply(start.y, end.y, t))
    }

    fn offset(self, by: Self) -> Self {
        self + by
    }
}

impl DynamicType for Vec3 {
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        Self::new(
            tween.apply(start.x, end.x, t),
            tween.apply(start.y, end.y, t),
            tween.apply(start.z, end.z, t),
        )
    }

    fn offset(self, by: Self) -> Self {
        self + by
    }
}

impl DynamicType for Vec4 {
    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        Self::new(
            tween.apply(start.x, end.x, t),
            tween.apply(start.y, end.y, t),
            tween.apply(start.z, end.z, t),
            tween.apply(start.w, end.w, t),
        )
    }

    fn offset(self, by: Self) -> Self {
        self + by
    }
}

impl DynamicType for Matrix2 {
    const BLENDS: bool = false;

    fn tween(start: Self, end: Self, t: f64, tween: Tween) -> Self {
        Self::new(
            Vec2::tween(start.x_axis, end.x_axis, t, tween),
            Vec2::tween(start.y_axis, end.y_axis, t, tween),
            Vec2::tween(start.translation, end.translation, t, tween),
        )
    }

    fn offset(self, by: Self) -> Self {
        Self::new(self.x_axis, self.y_axis, self.translation + by.translation)
    }
}

impl DynamicType for Entity {
    const BLENDS: bool = false;

    fn tween(start: Self, end: Self, t: f64, _tween: Tween) -> Self {
        if t >= 1.0 {
            end
        } else {
            start
        }
    }

    fn offset(self, _by: Self) -> Self {
        self
    }
}

// =============================================================================
// DYNAMIC TRAIT
// =============================================================================

/// Type-erased view of a dynamic value used by the simulation.
pub trait Dynamic {
    /// Copies `now` into `prev` at the start of a fixed step.
    fn new_frame(&mut self);
    /// Advances the animation, if any, by `dt_ms`.
    fn animate(&mut self, dt_ms: f64);
    /// Computes `render` for blend factor `alpha ∈ [0, 1)`.
    fn render_blend(&mut self, alpha: f64);
    /// Restores every slot to `spawn` and rewinds the animation.
    fn reset_to_spawn(&mut self);
    /// Whether an active animation is attached.
    fn is_animating(&self) -> bool;
}

// =============================================================================
// DYNAMIC VALUE
// =============================================================================

/// An animatable, render-blended value.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicValue<T: DynamicType> {
    /// Authored value.
    pub spawn: T,
    /// Value at the previous fixed step.
    pub prev: T,
    /// Current simulated value.
    pub now: T,
    /// Blended value for rendering.
    pub render: T,
    /// Angle in degrees; rendering follows `now` without blending.
    pub is_angle: bool,
    /// Rendering follows `now` without blending.
    pub no_render_blend: bool,
    /// Optional animation driving `now`.
    pub animation: Option<Animation<T>>,
}

impl<T: DynamicType> Default for DynamicValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: DynamicType> DynamicValue<T> {
    /// Creates a value with every slot set to `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            spawn: value,
            prev: value,
            now: value,
            render: value,
            is_angle: false,
            no_render_blend: false,
            animation: None,
        }
    }

    /// Creates an angle value.
    #[must_use]
    pub fn angle(value: T) -> Self {
        Self {
            is_angle: true,
            ..Self::new(value)
        }
    }

    /// Assigns `value` to the spawn, previous and current slots.
    pub fn set_all(&mut self, value: T) {
        self.spawn = value;
        self.prev = value;
        self.now = value;
        self.render = value;
    }

    /// Assigns only the current slot.
    pub fn set_now(&mut self, value: T) {
        self.now = value;
    }

    /// Attaches `animation`, replacing any previous one.
    pub fn animate_with(&mut self, animation: Animation<T>) -> &mut Animation<T> {
        self.animation.insert(animation)
    }
}

impl<T: DynamicType> Dynamic for DynamicValue<T> {
    fn new_frame(&mut self) {
        self.prev = self.now;
    }

    fn animate(&mut self, dt_ms: f64) {
        if let Some(animation) = self.animation.as_mut() {
            if let Some(value) = animation.advance(dt_ms, self.spawn) {
                self.now = value;
            }
        }
    }

    fn render_blend(&mut self, alpha: f64) {
        self.render = if self.is_angle || self.no_render_blend || !T::BLENDS {
            self.now
        } else {
            T::tween(self.prev, self.now, alpha, Tween::Lerp)
        };
    }

    fn reset_to_spawn(&mut self) {
        self.prev = self.spawn;
        self.now = self.spawn;
        self.render = self.spawn;
        if let Some(animation) = self.animation.as_mut() {
            animation.reset();
        }
    }

    fn is_animating(&self) -> bool {
        self.animation.as_ref().is_some_and(|a| a.active)
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

#[derive(Serialize)]
#[serde(bound = "T: DynamicType")]
struct DynamicRef<'a, T: DynamicType> {
    #[serde(rename = "Spawn")]
    spawn: &'a T,
    #[serde(rename = "Animation", skip_serializing_if = "no_animation")]
    animation: &'a Option<Animation<T>>,
}

fn no_animation<T: DynamicType>(animation: &&Option<Animation<T>>) -> bool {
    animation.is_none()
}

#[derive(Deserialize)]
#[serde(untagged, bound = "T: DynamicType")]
enum DynamicRepr<T: DynamicType> {
    Full {
        #[serde(rename = "Spawn", alias = "Original")]
        spawn: T,
        #[serde(rename = "Animation", default)]
        animation: Option<Animation<T>>,
    },
    Bare(T),
}

impl<T: DynamicType> Serialize for DynamicValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DynamicRef {
            spawn: &self.spawn,
            animation: &self.animation,
        }
        .serialize(serializer)
    }
}

impl<'de, T: DynamicType> Deserialize<'de> for DynamicValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match DynamicRepr::<T>::deserialize(deserializer)? {
            DynamicRepr::Full { spawn, animation } => Self {
                animation,
                ..Self::new(spawn)
            },
            DynamicRepr::Bare(spawn) => Self::new(spawn),
        })
    }
}

/// Deserializes a dynamic angle, keeping the angle marker that plain
/// deserialization cannot know about.
///
/// # Errors
///
/// Propagates the underlying decoder error.
pub fn deserialize_angle<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DynamicValue<f64>, D::Error> {
    let mut value = DynamicValue::<f64>::deserialize(deserializer)?;
    value.is_angle = true;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::AnimationLifetime;

    #[test]
    fn test_render_blend_interpolates() {
        let mut v = DynamicValue::new(0.0);
        v.new_frame();
        v.set_now(10.0);
        v.render_blend(0.25);
        assert!((v.render - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_angles_do_not_blend() {
        let mut v = DynamicValue::angle(0.0);
        v.new_frame();
        v.set_now(90.0);
        v.render_blend(0.5);
        assert_eq!(v.render, 90.0);
    }

    #[test]
    fn test_entities_do_not_blend() {
        let mut v = DynamicValue::new(Entity::from_raw(1));
        v.new_frame();
        v.set_now(Entity::from_raw(7));
        v.render_blend(0.1);
        assert_eq!(v.render, Entity::from_raw(7));
    }

    #[test]
    fn test_reset_to_spawn() {
        let mut v = DynamicValue::new(Vec3::new(1.0, 2.0, 3.0));
        v.set_now(Vec3::ZERO);
        v.reset_to_spawn();
        assert_eq!(v.now, v.spawn);
        assert_eq!(v.prev, v.spawn);
    }

    #[test]
    fn test_serializes_spawn_only() {
        let mut v = DynamicValue::new(5.0);
        v.set_now(99.0);
        let text = serde_yaml::to_string(&v).unwrap();
        let back: DynamicValue<f64> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.now, 5.0);
        assert!(back.animation.is_none());
    }

    #[test]
    fn test_accepts_bare_and_full_forms() {
        let bare: DynamicValue<f64> = serde_yaml::from_str("3.5").unwrap();
        assert_eq!(bare.spawn, 3.5);

        let full: DynamicValue<Vec2> =
            serde_yaml::from_str("Spawn: {X: 1}\nAnimation: {Start: {X: 0}, End: {X: 4}, Lifetime: Once}\n")
                .unwrap();
        assert_eq!(full.spawn, Vec2::new(1.0, 0.0));
        let animation = full.animation.unwrap();
        assert_eq!(animation.end, Vec2::new(4.0, 0.0));
        assert_eq!(animation.lifetime, AnimationLifetime::Once);

        let bare_vec: DynamicValue<Vec2> = serde_yaml::from_str("{X: 2, Y: 3}").unwrap();
        assert_eq!(bare_vec.spawn, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_animate_drives_now() {
        let mut v = DynamicValue::new(0.0);
        v.animate_with(Animation::new(0.0, 8.0, 100.0, AnimationLifetime::Once));
        v.new_frame();
        v.animate(50.0);
        assert!((v.now - 4.0).abs() < 1e-9);
        assert!(v.is_animating());
    }
}
