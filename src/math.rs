use core::ops::{Add, Mul};
use vek::*;

/// A trait for per-vertex attributes that the pipeline can interpolate across a primitive.
///
/// Anything that forms a linear space over `f32` qualifies: the blanket impl covers every type
/// with `Add`, `Mul<f32>` and `Default`. `vek` vectors and colours work out of the box; for
/// user-defined attribute bundles, deriving `Add` and `Mul` with `derive_more` is the intended
/// route. Attribute-less pipelines use [`Empty`].
pub trait Varying: Clone + Default {
    /// Linearly scale two items and sum them.
    fn weighted_sum2(a: Self, b: Self, x: f32, y: f32) -> Self;

    /// Linearly scale three items and sum them.
    fn weighted_sum3(a: Self, b: Self, c: Self, x: f32, y: f32, z: f32) -> Self;

    /// Interpolate between two items with parameter `t`.
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::weighted_sum2(a, b, 1.0 - t, t)
    }
}

impl<T> Varying for T
where
    T: Clone + Default + Add<Output = T> + Mul<f32, Output = T>,
{
    #[inline]
    fn weighted_sum2(a: Self, b: Self, x: f32, y: f32) -> Self {
        a * x + b * y
    }

    #[inline]
    fn weighted_sum3(a: Self, b: Self, c: Self, x: f32, y: f32, z: f32) -> Self {
        a * x + b * y + c * z
    }
}

/// A unit type standing in for 'no attributes' or 'no pixel output'.
///
/// `()` cannot be used here because it supports no arithmetic; `Empty` does, trivially.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Empty;

impl Add for Empty {
    type Output = Self;

    #[inline]
    fn add(self, _: Self) -> Self {
        Self
    }
}

impl Mul<f32> for Empty {
    type Output = Self;

    #[inline]
    fn mul(self, _: f32) -> Self {
        Self
    }
}

/// Linear interpolation between two scalars.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    t.mul_add(b - a, a)
}

/// Componentwise linear interpolation between two homogeneous positions.
#[inline]
pub fn lerp_vec4(a: Vec4<f32>, b: Vec4<f32>, t: f32) -> Vec4<f32> {
    Vec4::new(
        lerp(a.x, b.x, t),
        lerp(a.y, b.y, t),
        lerp(a.z, b.z, t),
        lerp(a.w, b.w, t),
    )
}

/// The z component of the 3D cross product of two 2D vectors, i.e. twice the signed area of the
/// triangle `(0, a, b)`.
#[inline]
pub fn cross2(a: Vec2<f32>, b: Vec2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Apply a 2D homogeneous transform to a point.
#[inline]
pub fn transform_point2(m: Mat3<f32>, p: Vec2<f32>) -> Vec2<f32> {
    let v = m * Vec3::new(p.x, p.y, 1.0);
    Vec2::new(v.x, v.y)
}

/// The transform mapping one axis-aligned rectangle onto another.
pub fn rect_to_rect(from: Aabr<f32>, to: Aabr<f32>) -> Mat3<f32> {
    let sx = (to.max.x - to.min.x) / (from.max.x - from.min.x);
    let sy = (to.max.y - to.min.y) / (from.max.y - from.min.y);
    let tx = to.min.x - from.min.x * sx;
    let ty = to.min.y - from.min.y * sy;
    Mat3::from_row_arrays([[sx, 0.0, tx], [0.0, sy, ty], [0.0, 0.0, 1.0]])
}
