use crate::buffer::Buffer2d;
use crate::clip::DEPTH_CLEAR;
use vek::*;

/// The surface a draw call renders into.
///
/// The renderer only relies on this contract; concrete framebuffers (an in-memory buffer, an
/// SDL surface, a terminal cell grid) live outside the pipeline. Positions handed to
/// [`Framebuffer::plot`] and [`Framebuffer::test_and_set_depth`] may land exactly on the far
/// boundary (the screen rectangle maps onto `[0, w] x [0, h]`); implementations must tolerate
/// out-of-range positions by ignoring them.
pub trait Framebuffer<T> {
    /// The transform taking screen-space positions (the `[-1, 1]` square, y up) to
    /// window-space pixel coordinates.
    fn screen_to_window(&self) -> Mat3<f32>;

    /// Write a fragment's output at the given pixel.
    fn plot(&mut self, pos: Vec2<i32>, targets: T);

    /// Run the depth test at the given pixel, recording `depth` if it wins.
    ///
    /// Depth follows the projected convention: `z/w` in `[0, 1]`, smaller values further from
    /// the camera. A fragment wins when its depth is strictly less than the stored value;
    /// cleared cells hold [`DEPTH_CLEAR`], which any valid fragment beats. The default
    /// implementation skips testing entirely and lets every fragment through.
    #[inline]
    fn test_and_set_depth(&mut self, _pos: Vec2<i32>, _depth: f32) -> bool {
        true
    }
}

#[inline]
fn window_transform([w, h]: [usize; 2]) -> Mat3<f32> {
    let (w, h) = (w as f32, h as f32);
    Mat3::from_row_arrays([
        [w * 0.5, 0.0, w * 0.5],
        [0.0, h * 0.5, h * 0.5],
        [0.0, 0.0, 1.0],
    ])
}

#[inline]
fn checked_index(size: [usize; 2], pos: Vec2<i32>) -> Option<[usize; 2]> {
    (pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < size[0] && (pos.y as usize) < size[1])
        .then(|| [pos.x as usize, pos.y as usize])
}

/// A plain colour buffer is a framebuffer without a depth attachment; the depth test is
/// skipped.
impl<T: Clone> Framebuffer<T> for Buffer2d<T> {
    fn screen_to_window(&self) -> Mat3<f32> {
        window_transform(self.size())
    }

    fn plot(&mut self, pos: Vec2<i32>, targets: T) {
        if let Some(index) = checked_index(self.size(), pos) {
            self.write(index, targets);
        }
    }
}

/// The reference framebuffer: a colour buffer with a depth attachment.
#[derive(Clone, Debug)]
pub struct RenderBuffer<T> {
    color: Buffer2d<T>,
    depth: Buffer2d<f32>,
}

impl<T: Clone> RenderBuffer<T> {
    pub fn new(size: [usize; 2], clear: T) -> Self {
        Self {
            color: Buffer2d::fill(size, clear),
            depth: Buffer2d::fill(size, DEPTH_CLEAR),
        }
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.color.size()
    }

    #[inline]
    pub fn color(&self) -> &Buffer2d<T> {
        &self.color
    }

    #[inline]
    pub fn depth(&self) -> &Buffer2d<f32> {
        &self.depth
    }

    /// Reset the colour attachment to the given value and the depth attachment to
    /// [`DEPTH_CLEAR`].
    pub fn clear(&mut self, color: T) {
        self.color.clear(color);
        self.depth.clear(DEPTH_CLEAR);
    }
}

impl<T: Clone> Framebuffer<T> for RenderBuffer<T> {
    fn screen_to_window(&self) -> Mat3<f32> {
        window_transform(self.size())
    }

    fn plot(&mut self, pos: Vec2<i32>, targets: T) {
        if let Some(index) = checked_index(self.size(), pos) {
            self.color.write(index, targets);
        }
    }

    fn test_and_set_depth(&mut self, pos: Vec2<i32>, depth: f32) -> bool {
        match checked_index(self.size(), pos) {
            Some(index) => {
                let cell = self.depth.get_mut(index);
                if depth < *cell {
                    *cell = depth;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::transform_point2;

    #[test]
    fn screen_corners_map_onto_the_window() {
        let fb = RenderBuffer::new([64, 32], 0u32);
        let m = fb.screen_to_window();
        assert_eq!(transform_point2(m, Vec2::new(-1.0, -1.0)), Vec2::new(0.0, 0.0));
        assert_eq!(transform_point2(m, Vec2::new(1.0, 1.0)), Vec2::new(64.0, 32.0));
        assert_eq!(transform_point2(m, Vec2::new(0.0, 0.0)), Vec2::new(32.0, 16.0));
    }

    #[test]
    fn depth_test_is_strictly_less_than() {
        let mut fb = RenderBuffer::new([4, 4], 0u32);
        let at = Vec2::new(1, 1);
        assert!(fb.test_and_set_depth(at, 0.5));
        assert!(!fb.test_and_set_depth(at, 0.5));
        assert!(fb.test_and_set_depth(at, 0.25));
        assert!(!fb.test_and_set_depth(at, 0.75));
        assert_eq!(*fb.depth().get([1, 1]), 0.25);
    }

    #[test]
    fn out_of_range_plots_are_ignored() {
        let mut fb = RenderBuffer::new([4, 4], 0u32);
        fb.plot(Vec2::new(4, 0), 1);
        fb.plot(Vec2::new(-1, 0), 1);
        assert!(!fb.test_and_set_depth(Vec2::new(0, 4), 0.0));
        assert!(fb.color().raw().iter().all(|&c| c == 0));
    }
}
