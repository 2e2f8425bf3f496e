//! Mathematical types shared by every crate.
//!
//! World geometry is authored in double precision: sector vertices, plane
//! heights and body positions all live in `f64` so that the portal epsilon
//! tests in the traversal code stay meaningful on large maps.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Degrees to radians.
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees.
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Clamps `v` into `[lo, hi]`.
#[inline]
#[must_use]
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Normalizes an angle in degrees into `[0, 360)`.
#[inline]
#[must_use]
pub fn normalize_angle(a: f64) -> f64 {
    let r = a % 360.0;
    if r < 0.0 {
        r + 360.0
    } else {
        r
    }
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// 2D Vector - floor plan vertices, XY positions
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec2 {
    /// X component
    #[serde(rename = "X", skip_serializing_if = "is_zero")]
    pub x: f64,
    /// Y component
    #[serde(rename = "Y", skip_serializing_if = "is_zero")]
    pub y: f64,
}

impl Vec2 {
    /// Creates a new Vec2
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Dot product
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Perp-dot product (z of the 3D cross product).
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Length squared (avoids sqrt)
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Distance squared (avoids sqrt)
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Extends into 3D with the given height.
    #[inline]
    #[must_use]
    pub const fn to_3d(self, z: f64) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Returns true when every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// 3D Vector - position, velocity, force
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    /// X component
    #[serde(rename = "X", skip_serializing_if = "is_zero")]
    pub x: f64,
    /// Y component
    #[serde(rename = "Y", skip_serializing_if = "is_zero")]
    pub y: f64,
    /// Z component
    #[serde(rename = "Z", skip_serializing_if = "is_zero")]
    pub z: f64,
}

impl Vec3 {
    /// Creates a new Vec3
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Dot product
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Distance squared (avoids sqrt)
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Drops the Z component.
    #[inline]
    #[must_use]
    pub const fn to_2d(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Returns true when every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl std::ops::SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

/// 4D Vector - colours and packed tuples
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec4 {
    /// X (red) component
    #[serde(rename = "X", skip_serializing_if = "is_zero")]
    pub x: f64,
    /// Y (green) component
    #[serde(rename = "Y", skip_serializing_if = "is_zero")]
    pub y: f64,
    /// Z (blue) component
    #[serde(rename = "Z", skip_serializing_if = "is_zero")]
    pub z: f64,
    /// W (alpha) component
    #[serde(rename = "W", skip_serializing_if = "is_zero")]
    pub w: f64,
}

impl Vec4 {
    /// Creates a new Vec4
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Opaque white.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
}

impl std::ops::Add for Vec4 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w)
    }
}

impl std::ops::Sub for Vec4 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.w - rhs.w)
    }
}

impl std::ops::Mul<f64> for Vec4 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

/// 2D affine matrix: two basis columns plus a translation.
///
/// `project` maps a point from the matrix's local frame into the world,
/// `unproject` maps back. Portal teleports compose one portal's `unproject`
/// with the paired portal's `project`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Matrix2 {
    /// Image of the local X axis.
    #[serde(rename = "X")]
    pub x_axis: Vec2,
    /// Image of the local Y axis.
    #[serde(rename = "Y")]
    pub y_axis: Vec2,
    /// Translation.
    #[serde(rename = "T")]
    pub translation: Vec2,
}

impl Default for Matrix2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix2 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        x_axis: Vec2::new(1.0, 0.0),
        y_axis: Vec2::new(0.0, 1.0),
        translation: Vec2::ZERO,
    };

    /// Builds a matrix from its columns.
    #[inline]
    #[must_use]
    pub const fn new(x_axis: Vec2, y_axis: Vec2, translation: Vec2) -> Self {
        Self {
            x_axis,
            y_axis,
            translation,
        }
    }

    /// Determinant of the linear part.
    #[inline]
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.x_axis.cross(self.y_axis)
    }

    /// Local point to world point.
    #[inline]
    #[must_use]
    pub fn project(&self, p: Vec2) -> Vec2 {
        self.translation + self.project_vector(p)
    }

    /// Local direction to world direction (no translation).
    #[inline]
    #[must_use]
    pub fn project_vector(&self, v: Vec2) -> Vec2 {
        self.x_axis * v.x + self.y_axis * v.y
    }

    /// World point to local point. Returns `None` for a singular matrix.
    #[must_use]
    pub fn unproject(&self, p: Vec2) -> Option<Vec2> {
        self.unproject_vector(p - self.translation)
    }

    /// World direction to local direction. Returns `None` for a singular matrix.
    #[must_use]
    pub fn unproject_vector(&self, v: Vec2) -> Option<Vec2> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Vec2::new(
            (v.x * self.y_axis.y - v.y * self.y_axis.x) * inv,
            (self.x_axis.x * v.y - self.x_axis.y * v.x) * inv,
        ))
    }
}
