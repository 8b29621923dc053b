use crate::buffer::Buffer2d;
use alloc::vec::Vec;
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// A mipmap pyramid of RGBA8 images, `level 0` being the base.
///
/// Level `i + 1` is half the size of level `i` in each dimension (rounded down, floored at 1).
/// Rows are stored bottom-up: texel `(0, 0)` is the bottom-left corner of the image.
#[derive(Clone, Debug)]
pub struct Texture {
    levels: Vec<Buffer2d<Rgba<u8>>>,
}

impl Texture {
    /// Build a texture, including its mip chain, from row-major RGBA8 texels.
    ///
    /// # Panics
    ///
    /// Panics if the texel count does not match the size, or if either dimension is zero.
    pub fn from_rgba8(size: [usize; 2], texels: Vec<Rgba<u8>>) -> Self {
        assert!(
            size[0] > 0 && size[1] > 0,
            "textures must have at least one texel per dimension",
        );
        let base = Buffer2d::from_raw(size, texels);

        let count = ((size[0].max(size[1]) as f32).log2().floor() as usize).max(1);
        let mut levels = Vec::with_capacity(count);
        levels.push(base);
        while levels.len() < count {
            levels.push(downsample(levels.last().unwrap()));
        }

        log::debug!(
            "built a {}x{} texture with {} mip levels",
            size[0],
            size[1],
            levels.len(),
        );
        Self { levels }
    }

    /// Decode a texture from an image file.
    ///
    /// Whatever the source format, the result is RGBA8 with the origin at the bottom-left.
    #[cfg(feature = "image")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, TextureError> {
        let decoded = image_::open(path)?.to_rgba8();
        let (w, h) = decoded.dimensions();
        let mut texels = Vec::with_capacity(w as usize * h as usize);
        // Image files store rows top-down; flip to our bottom-left origin.
        for y in (0..h).rev() {
            for x in 0..w {
                let p = decoded.get_pixel(x, y);
                texels.push(Rgba::new(p[0], p[1], p[2], p[3]));
            }
        }
        Ok(Self::from_rgba8([w as usize, h as usize], texels))
    }

    /// The size of the base level.
    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.levels[0].size()
    }

    /// How many mip levels this texture has.
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn level_size(&self, level: usize) -> [usize; 2] {
        self.levels[level].size()
    }

    /// Read one texel as normalised floats.
    ///
    /// # Panics
    ///
    /// Panics if the level or the coordinates are out of bounds.
    #[inline]
    pub fn texel(&self, level: usize, x: usize, y: usize) -> Rgba<f32> {
        self.levels[level].get([x, y]).map(|e| e as f32 / 255.0)
    }
}

/// Box-filter one mip level down to the next, weighting colours by alpha so that transparent
/// texels do not bleed their colour into the average.
fn downsample(src: &Buffer2d<Rgba<u8>>) -> Buffer2d<Rgba<u8>> {
    let [w, h] = src.size();
    let size = [(w / 2).max(1), (h / 2).max(1)];
    let (mut x, mut y) = (0, 0);
    let next = Buffer2d::fill_with(size, || {
        let corner = [x * 2, y * 2];
        x += 1;
        if x == size[0] {
            x = 0;
            y += 1;
        }

        let mut rgb_sum = Vec3::<f32>::zero();
        let mut a_sum = 0.0;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let texel = *src.get([(corner[0] + dx).min(w - 1), (corner[1] + dy).min(h - 1)]);
            let a = texel.a as f32;
            rgb_sum += Vec3::new(texel.r as f32, texel.g as f32, texel.b as f32) * a;
            a_sum += a;
        }
        let rgb = if a_sum > 0.0 {
            rgb_sum / a_sum
        } else {
            Vec3::zero()
        };
        Rgba::new(
            rgb.x as u8,
            rgb.y as u8,
            rgb.z as u8,
            (a_sum / 4.0) as u8,
        )
    });
    next
}

/// Failure to load a texture from disk.
#[cfg(feature = "image")]
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode texture: {0}")]
    Decode(#[from] image_::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: u8) -> Rgba<u8> {
        Rgba::new(v, v, v, 255)
    }

    #[test]
    fn mip_chain_halves_until_the_count_runs_out() {
        let tex = Texture::from_rgba8([8, 4], alloc::vec![gray(128); 32]);
        assert_eq!(tex.levels(), 3);
        assert_eq!(tex.level_size(0), [8, 4]);
        assert_eq!(tex.level_size(1), [4, 2]);
        assert_eq!(tex.level_size(2), [2, 1]);
    }

    #[test]
    fn one_by_one_textures_have_a_single_level() {
        let tex = Texture::from_rgba8([1, 1], alloc::vec![gray(7)]);
        assert_eq!(tex.levels(), 1);
    }

    #[test]
    fn downsampling_averages_opaque_texels() {
        let texels = alloc::vec![gray(0), gray(100), gray(100), gray(200)];
        let tex = Texture::from_rgba8([2, 2], texels);
        // 2x2 still gets floor(log2(2)) = 1 level: the chain stops at the base. Use a 4x4 to
        // see a downsample.
        assert_eq!(tex.levels(), 1);

        let texels = alloc::vec![gray(100); 16];
        let tex = Texture::from_rgba8([4, 4], texels);
        assert_eq!(tex.levels(), 2);
        assert_eq!(tex.texel(1, 0, 0), Rgba::new(100.0, 100.0, 100.0, 255.0).map(|e: f32| e / 255.0));
    }

    #[test]
    fn transparent_texels_carry_no_colour_weight() {
        let texels = alloc::vec![
            Rgba::new(255, 0, 0, 255),
            Rgba::new(0, 255, 0, 0),
            Rgba::new(0, 0, 255, 255),
            Rgba::new(255, 255, 255, 0),
        ];
        let tex = Texture::from_rgba8([4, 1], alloc::vec![
            texels[0], texels[1], texels[2], texels[3],
        ]);
        assert_eq!(tex.levels(), 2);
        // First downsampled texel averages texels 0 and 1 (plus the clamped row repeat): the
        // fully transparent green contributes nothing to the colour, only to the alpha.
        let out = tex.texel(1, 0, 0);
        assert!(out.r > 0.9);
        assert!(out.g < 0.05);
        assert!((out.a - 0.5).abs() < 0.01);
    }
}
