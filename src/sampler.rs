use crate::program::{FragmentContext, GroupKind, Token};
use crate::texture::Texture;
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// What happens when a texel coordinate falls outside the image.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Out-of-bounds reads return magenta, making them easy to spot.
    Blank,
    /// Coordinates saturate at the image edges.
    Clamp,
    /// Coordinates repeat by the absolute value's remainder, mirroring the tiling across the
    /// origin.
    Periodic,
    /// Coordinates repeat; negative values wrap around from the far end.
    Repeat,
}

/// How texels are picked or blended within one mip level, and across mip levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Truncate to the texel containing the sample point.
    Point,
    /// Round to the nearest texel.
    Nearest,
    /// Blend the surrounding texels (bilinear within a level, a two-level blend across mips).
    Linear,
}

/// A texture sampling configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sampler {
    pub wrap: WrapMode,
    pub filter: Filter,
    pub mip_filter: Filter,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            filter: Filter::Linear,
            mip_filter: Filter::Nearest,
        }
    }
}

/// Publish the texel-space coordinate of `uv` to this fragment's group, handing back the
/// barrier token the shader must yield before calling [`sample`].
///
/// Mip selection needs screen-space derivatives of the texel coordinate, and derivatives are
/// only valid once every member of the group has shared its value and passed a
/// [`Token::Synchronize`] barrier. The intended shader shape is:
///
/// ```ignore
/// yield sampler::prepare(&ctx, &tex, uv);     // shares, then synchronizes
/// let color = sampler::sample(&ctx, &s, &tex, uv);
/// ```
#[inline]
pub fn prepare(ctx: &FragmentContext<Vec2<f32>>, texture: &Texture, uv: Vec2<f32>) -> Token {
    let [w, h] = texture.size();
    ctx.share(Vec2::new(uv.x * w as f32, uv.y * h as f32));
    Token::Synchronize
}

/// Sample a texture with the level of detail implied by this group's derivatives.
///
/// Points always sample the base level; lines use the finite difference along the line;
/// filled quads use the larger of the horizontal and vertical differences. Must run after the
/// barrier yielded by [`prepare`].
pub fn sample(
    ctx: &FragmentContext<Vec2<f32>>,
    sampler: &Sampler,
    texture: &Texture,
    uv: Vec2<f32>,
) -> Rgba<f32> {
    let lod = match ctx.kind() {
        GroupKind::Point => 0.0,
        GroupKind::Line => {
            let d = ctx.dfdv();
            0.5 * d.dot(d).max(1.0).log2()
        }
        GroupKind::Filled => {
            let dx = ctx.dfdx();
            let dy = ctx.dfdy();
            0.5 * dx.dot(dx).max(dy.dot(dy)).max(1.0).log2()
        }
    };
    sample_lod(sampler, texture, uv, lod)
}

/// Sample a texture at an explicit level of detail.
pub fn sample_lod(sampler: &Sampler, texture: &Texture, uv: Vec2<f32>, lod: f32) -> Rgba<f32> {
    match sampler.mip_filter {
        Filter::Point => sample_level(sampler, texture, uv, level_index(texture, lod.floor())),
        Filter::Nearest => sample_level(sampler, texture, uv, level_index(texture, lod.round())),
        Filter::Linear => {
            let lo = sample_level(sampler, texture, uv, level_index(texture, lod.floor()));
            let hi = sample_level(sampler, texture, uv, level_index(texture, lod.ceil()));
            let t = lod - lod.floor();
            lo * (1.0 - t) + hi * t
        }
    }
}

#[inline]
fn level_index(texture: &Texture, lod: f32) -> usize {
    (lod.max(0.0) as usize).min(texture.levels() - 1)
}

/// Sample one mip level. The continuous texel coordinate is `size * uv - 0.5`, putting texel
/// centers on the integer grid.
fn sample_level(sampler: &Sampler, texture: &Texture, uv: Vec2<f32>, level: usize) -> Rgba<f32> {
    let [w, h] = texture.level_size(level);
    let at = Vec2::new(uv.x * w as f32 - 0.5, uv.y * h as f32 - 0.5);
    match sampler.filter {
        Filter::Point => texel(sampler, texture, level, at.map(|e| e.floor() as i32)),
        Filter::Nearest => texel(
            sampler,
            texture,
            level,
            at.map(|e| (e - 0.5).round() as i32),
        ),
        Filter::Linear => {
            let base = at.map(|e| e.floor());
            let frac = at - base;
            let corner = base.map(|e| e as i32);
            let t00 = texel(sampler, texture, level, corner);
            let t10 = texel(sampler, texture, level, corner + Vec2::new(1, 0));
            let t01 = texel(sampler, texture, level, corner + Vec2::new(0, 1));
            let t11 = texel(sampler, texture, level, corner + Vec2::new(1, 1));
            let t0 = t00 * (1.0 - frac.y) + t01 * frac.y;
            let t1 = t10 * (1.0 - frac.y) + t11 * frac.y;
            t0 * (1.0 - frac.x) + t1 * frac.x
        }
    }
}

/// Read a texel with the sampler's wrap mode applied to each coordinate.
fn texel(sampler: &Sampler, texture: &Texture, level: usize, at: Vec2<i32>) -> Rgba<f32> {
    let [w, h] = texture.level_size(level);
    let wrap = |v: i32, size: usize| -> Option<usize> {
        match sampler.wrap {
            WrapMode::Blank => (v >= 0 && (v as usize) < size).then(|| v as usize),
            WrapMode::Clamp => Some((v.max(0) as usize).min(size - 1)),
            // `unsigned_abs` sidesteps the i32::MIN overflow of `abs`.
            WrapMode::Periodic => Some(v.unsigned_abs() as usize % size),
            // `rem_euclid` keeps the remainder non-negative, so negatives wrap around from
            // the far end at any width.
            WrapMode::Repeat => Some(v.rem_euclid(size as i32) as usize),
        }
    };
    match (wrap(at.x, w), wrap(at.y, h)) {
        (Some(x), Some(y)) => texture.texel(level, x, y),
        _ => Rgba::new(1.0, 0.0, 1.0, 1.0),
    }
}
