use crate::math::{lerp, lerp_vec4, Varying};
use vek::*;

/// A vertex-shader output in homogeneous clip space.
///
/// `pos` must not be the zero vector, and `pos.w` must be nonzero before [`Fragment::project`]
/// is called on it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fragment<V> {
    pub pos: Vec4<f32>,
    pub attrs: V,
}

impl<V: Varying> Fragment<V> {
    #[inline]
    pub fn new(pos: Vec4<f32>, attrs: V) -> Self {
        Self { pos, attrs }
    }

    /// Interpolate between two clip-space fragments.
    ///
    /// Both the position and the attributes interpolate linearly: in homogeneous space, linear
    /// interpolation already corresponds to linear interpolation in the world.
    #[inline]
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            pos: lerp_vec4(a.pos, b.pos, t),
            attrs: V::lerp(a.attrs.clone(), b.attrs.clone(), t),
        }
    }

    /// Perform the perspective divide, producing a screen-space fragment.
    #[inline]
    pub fn project(self) -> ProjectedFragment<V> {
        let w_inv = 1.0 / self.pos.w;
        ProjectedFragment {
            pos: Vec2::new(self.pos.x * w_inv, self.pos.y * w_inv),
            depth: self.pos.z * w_inv,
            z_inv: w_inv,
            attrs: self.attrs,
        }
    }
}

/// A fragment after the perspective divide.
///
/// `depth` is `z/w` and `z_inv` is `1/w`; both are affine across a primitive in screen space,
/// which is what makes perspective-correct attribute interpolation possible.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectedFragment<V> {
    pub pos: Vec2<f32>,
    pub depth: f32,
    pub z_inv: f32,
    pub attrs: V,
}

impl<V: Varying> ProjectedFragment<V> {
    /// Interpolate between two screen-space fragments.
    ///
    /// Position, depth and `z_inv` are affine in screen space and interpolate linearly; the
    /// attributes are weighted by `1/w` and renormalised so that the result matches linear
    /// interpolation in the world.
    #[inline]
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        let z_inv = lerp(a.z_inv, b.z_inv, t);
        Self {
            pos: Vec2::new(lerp(a.pos.x, b.pos.x, t), lerp(a.pos.y, b.pos.y, t)),
            depth: lerp(a.depth, b.depth, t),
            z_inv,
            attrs: lerp_projected_attrs(&a.attrs, &b.attrs, t, a.z_inv, b.z_inv, z_inv),
        }
    }
}

/// Perspective-correct interpolation of attributes between two projected fragments.
///
/// `z_inv_t` must be `lerp(z_inv_a, z_inv_b, t)`; it is a parameter so that callers stepping
/// incrementally (the line rasterizer) can reuse their running value.
#[inline]
pub fn lerp_projected_attrs<V: Varying>(
    a: &V,
    b: &V,
    t: f32,
    z_inv_a: f32,
    z_inv_b: f32,
    z_inv_t: f32,
) -> V {
    let norm = 1.0 / z_inv_t;
    V::weighted_sum2(
        a.clone(),
        b.clone(),
        (1.0 - t) * z_inv_a * norm,
        t * z_inv_b * norm,
    )
}
