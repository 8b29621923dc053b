use crate::fragment::lerp_projected_attrs;
use crate::math::{lerp, lerp_vec4, Varying};
use alloc::collections::VecDeque;
use core::mem;
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// The screen-space bounds every projected fragment must end up inside.
pub const SCREEN_BOUNDS: Aabr<f32> = Aabr {
    min: Vec2 { x: -1.0, y: -1.0 },
    max: Vec2 { x: 1.0, y: 1.0 },
};

/// The farthest representable depth.
pub const DEPTH_MIN: f32 = 0.0;
/// The nearest representable depth.
pub const DEPTH_MAX: f32 = 1.0;
/// The depth a framebuffer clears to. Strictly greater than [`DEPTH_MAX`] so that any valid
/// fragment depth beats a cleared cell.
pub const DEPTH_CLEAR: f32 = 2.0;

/// The six planes bounding the view frustum in homogeneous clip space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FrustumPlane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

const FRUSTUM_PLANES: [FrustumPlane; 6] = [
    FrustumPlane::Left,
    FrustumPlane::Right,
    FrustumPlane::Bottom,
    FrustumPlane::Top,
    FrustumPlane::Near,
    FrustumPlane::Far,
];

impl FrustumPlane {
    /// Signed distance of a homogeneous point to the plane; non-negative means inside.
    #[inline]
    fn distance(&self, p: Vec4<f32>) -> f32 {
        match self {
            FrustumPlane::Left => p.x + p.w,
            FrustumPlane::Right => p.w - p.x,
            FrustumPlane::Bottom => p.y + p.w,
            FrustumPlane::Top => p.w - p.y,
            FrustumPlane::Near => p.z,
            FrustumPlane::Far => p.w - p.z,
        }
    }
}

/// Whether a homogeneous point lies inside the view frustum.
///
/// The all-zero vector is degenerate and rejected.
#[inline]
pub fn point_in_frustum(p: Vec4<f32>) -> bool {
    p != Vec4::broadcast(0.0)
        && -p.w <= p.x
        && p.x <= p.w
        && -p.w <= p.y
        && p.y <= p.w
        && 0.0 <= p.z
        && p.z <= p.w
}

/// Whether a screen-space point lies inside the given bounds.
#[inline]
pub fn point_in_bounds(p: Vec2<f32>, bounds: Aabr<f32>) -> bool {
    bounds.min.x <= p.x && p.x <= bounds.max.x && bounds.min.y <= p.y && p.y <= bounds.max.y
}

/// Narrow `[t0, t1]` against one boundary, where the inside half-space is `q + t * p >= 0`.
///
/// Returns `false` once the interval is empty. A line parallel to the boundary (`p ~ 0`) is
/// kept iff its starting point is inside.
#[inline]
fn narrow_interval(q: f32, p: f32, t0: &mut f32, t1: &mut f32) -> bool {
    if p.abs() <= f32::EPSILON {
        return q >= 0.0;
    }
    let t = -q / p;
    if p < 0.0 {
        *t1 = t1.min(t);
    } else {
        *t0 = t0.max(t);
    }
    *t0 <= *t1
}

/// Clip the line `a + t * (b - a)` against the view frustum (Liang–Barsky in homogeneous
/// coordinates), returning the surviving parameter interval.
///
/// Lines whose endpoints both have `w < 0`, and lines with a degenerate all-zero endpoint, are
/// rejected outright.
pub fn line_in_frustum(a: Vec4<f32>, b: Vec4<f32>) -> Option<(f32, f32)> {
    let zero = Vec4::broadcast(0.0);
    if a == zero || b == zero || (a.w < 0.0 && b.w < 0.0) {
        return None;
    }

    let d = b - a;
    let (mut t0, mut t1) = (0.0, 1.0);
    for plane in FRUSTUM_PLANES {
        // The plane distances are linear, so the distance of the delta is the delta of the
        // distances.
        let q = plane.distance(a);
        let p = plane.distance(d);
        if !narrow_interval(q, p, &mut t0, &mut t1) {
            return None;
        }
    }
    Some((t0, t1))
}

/// Clip the 2D line `a + t * (b - a)` against an axis-aligned rectangle, returning the
/// surviving parameter interval.
pub fn line_in_bounds(a: Vec2<f32>, b: Vec2<f32>, bounds: Aabr<f32>) -> Option<(f32, f32)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0, 1.0);
    let sides = [
        (a.x - bounds.min.x, d.x),
        (bounds.max.x - a.x, -d.x),
        (a.y - bounds.min.y, d.y),
        (bounds.max.y - a.y, -d.y),
    ];
    for (q, p) in sides {
        if !narrow_interval(q, p, &mut t0, &mut t1) {
            return None;
        }
    }
    Some((t0, t1))
}

/// An in/out pair of triplet queues: one FIFO of position triplets paired with one FIFO of
/// attribute triplets. The two always have equal length, entry `i` of one corresponding to
/// entry `i` of the other.
#[derive(Clone, Debug)]
pub(crate) struct ClipQueues<V> {
    pos_in: VecDeque<[Vec4<f32>; 3]>,
    pos_out: VecDeque<[Vec4<f32>; 3]>,
    attrs_in: VecDeque<[V; 3]>,
    attrs_out: VecDeque<[V; 3]>,
}

impl<V> ClipQueues<V> {
    fn new() -> Self {
        Self {
            pos_in: VecDeque::new(),
            pos_out: VecDeque::new(),
            attrs_in: VecDeque::new(),
            attrs_out: VecDeque::new(),
        }
    }

    fn clear(&mut self) {
        self.pos_in.clear();
        self.pos_out.clear();
        self.attrs_in.clear();
        self.attrs_out.clear();
    }

    fn seed(&mut self, pos: [Vec4<f32>; 3], attrs: [V; 3]) {
        self.clear();
        self.pos_in.push_back(pos);
        self.attrs_in.push_back(attrs);
    }

    /// Pop the next surviving triplet.
    pub(crate) fn pop(&mut self) -> Option<([Vec4<f32>; 3], [V; 3])> {
        let pos = self.pos_in.pop_front()?;
        let attrs = self
            .attrs_in
            .pop_front()
            .expect("clip queues out of step: position triplet without attribute triplet");
        Some((pos, attrs))
    }

    fn emit(&mut self, pos: [Vec4<f32>; 3], attrs: [V; 3]) {
        self.pos_out.push_back(pos);
        self.attrs_out.push_back(attrs);
    }

    fn swap(&mut self) {
        mem::swap(&mut self.pos_in, &mut self.pos_out);
        mem::swap(&mut self.attrs_in, &mut self.attrs_out);
    }
}

/// Scratch queues for triangle subdivision, owned by the caller so that repeated draws reuse
/// their allocations. One pair serves the frustum pass, the other the screen-space pass that
/// runs while the frustum results are still being drained. Never share these across
/// concurrent draws.
#[derive(Clone, Debug)]
pub struct ClipBuffers<V> {
    pub(crate) frustum: ClipQueues<V>,
    pub(crate) screen: ClipQueues<V>,
}

impl<V> ClipBuffers<V> {
    pub fn new() -> Self {
        Self {
            frustum: ClipQueues::new(),
            screen: ClipQueues::new(),
        }
    }
}

impl<V> Default for ClipBuffers<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// One Sutherland–Hodgman pass: drain the in-queues, clip every triplet against a single
/// plane, and leave the survivors in the in-queues again.
///
/// `distance` is the plane's signed distance function (non-negative = inside) and
/// `interpolate` produces the vertex at parameter `t` along an edge.
fn clip_queues_against<V, D, L>(queues: &mut ClipQueues<V>, distance: D, interpolate: L)
where
    V: Varying,
    D: Fn(Vec4<f32>) -> f32,
    L: Fn((Vec4<f32>, &V), (Vec4<f32>, &V), f32) -> (Vec4<f32>, V),
{
    while let Some((pos, attrs)) = queues.pop() {
        let d = [distance(pos[0]), distance(pos[1]), distance(pos[2])];
        let inside = [d[0] >= 0.0, d[1] >= 0.0, d[2] >= 0.0];
        match inside.iter().filter(|i| **i).count() {
            0 => {}
            3 => queues.emit(pos, attrs),
            1 => {
                // Rotate so the inside vertex sits at index 0, preserving winding, then pull
                // both outgoing edges back to the plane.
                let i = inside.iter().position(|i| *i).unwrap_or(0);
                let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
                let t01 = d[i] / (d[i] - d[i1]);
                let t02 = d[i] / (d[i] - d[i2]);
                let (p01, a01) = interpolate((pos[i], &attrs[i]), (pos[i1], &attrs[i1]), t01);
                let (p02, a02) = interpolate((pos[i], &attrs[i]), (pos[i2], &attrs[i2]), t02);
                queues.emit(
                    [pos[i], p01, p02],
                    [attrs[i].clone(), a01, a02],
                );
            }
            2 => {
                // Rotate so the outside vertex sits at index 2; the surviving quad is split
                // into two triangles, subdivision first.
                let o = inside.iter().position(|i| !*i).unwrap_or(0);
                let (i0, i1) = ((o + 1) % 3, (o + 2) % 3);
                let t02 = d[i0] / (d[i0] - d[o]);
                let t12 = d[i1] / (d[i1] - d[o]);
                let (p02, a02) = interpolate((pos[i0], &attrs[i0]), (pos[o], &attrs[o]), t02);
                let (p12, a12) = interpolate((pos[i1], &attrs[i1]), (pos[o], &attrs[o]), t12);
                queues.emit(
                    [pos[i1], p12, p02],
                    [attrs[i1].clone(), a12, a02.clone()],
                );
                queues.emit(
                    [pos[i0], pos[i1], p02],
                    [attrs[i0].clone(), attrs[i1].clone(), a02],
                );
            }
            _ => unreachable!(),
        }
    }
    queues.swap();
}

/// Clip a clip-space triangle against the view frustum.
///
/// Attributes interpolate linearly in homogeneous space. Returns `false` when nothing
/// survives; otherwise the surviving triplets can be drained with [`ClipQueues::pop`] from
/// the frustum queues.
pub(crate) fn clip_triangle_to_frustum<V: Varying>(
    buffers: &mut ClipBuffers<V>,
    pos: [Vec4<f32>; 3],
    attrs: [V; 3],
) -> bool {
    let queues = &mut buffers.frustum;
    queues.seed(pos, attrs);
    for plane in FRUSTUM_PLANES {
        clip_queues_against(
            queues,
            |p| plane.distance(p),
            |(pa, aa), (pb, ab), t| (lerp_vec4(pa, pb, t), V::lerp(aa.clone(), ab.clone(), t)),
        );
        if queues.pos_in.is_empty() {
            return false;
        }
    }
    true
}

/// Clip a projected triangle against a screen-space rectangle.
///
/// Each vertex is a [`Vec4`] packing `(x, y, depth, z_inv)`. All four components are affine in
/// screen space and interpolate linearly; the attributes are weighted by `z_inv` so that
/// subdivision stays perspective-correct. Survivors end up in the screen queues.
pub(crate) fn clip_triangle_to_bounds<V: Varying>(
    buffers: &mut ClipBuffers<V>,
    bounds: Aabr<f32>,
    pos: [Vec4<f32>; 3],
    attrs: [V; 3],
) -> bool {
    let interpolate = |(pa, aa): (Vec4<f32>, &V), (pb, ab): (Vec4<f32>, &V), t: f32| {
        let z_inv = lerp(pa.w, pb.w, t);
        (
            lerp_vec4(pa, pb, t),
            lerp_projected_attrs(aa, ab, t, pa.w, pb.w, z_inv),
        )
    };

    let queues = &mut buffers.screen;
    queues.seed(pos, attrs);
    for side in 0..4 {
        let distance = move |p: Vec4<f32>| match side {
            0 => p.x - bounds.min.x,
            1 => bounds.max.x - p.x,
            2 => p.y - bounds.min.y,
            _ => bounds.max.y - p.y,
        };
        clip_queues_against(queues, distance, interpolate);
        if queues.pos_in.is_empty() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Empty;

    fn inside_frustum_after(p0: Vec4<f32>, p1: Vec4<f32>, t: f32) -> bool {
        let p = lerp_vec4(p0, p1, t);
        // A whisker of tolerance for accumulated rounding.
        let e = 1e-5 * p.w.abs().max(1.0);
        -p.w - e <= p.x
            && p.x <= p.w + e
            && -p.w - e <= p.y
            && p.y <= p.w + e
            && -e <= p.z
            && p.z <= p.w + e
    }

    #[test]
    fn frustum_point_predicate() {
        assert!(point_in_frustum(Vec4::new(0.0, 0.0, 0.0, 1.0)));
        assert!(point_in_frustum(Vec4::new(1.0, -1.0, 1.0, 1.0)));
        assert!(!point_in_frustum(Vec4::new(2.0, 0.0, 0.0, 1.0)));
        assert!(!point_in_frustum(Vec4::new(0.0, 0.0, -0.1, 1.0)));
        assert!(!point_in_frustum(Vec4::new(0.0, 0.0, 0.0, -1.0)));
        // The degenerate all-zero point satisfies every inequality but is still rejected.
        assert!(!point_in_frustum(Vec4::broadcast(0.0)));
    }

    #[test]
    fn line_fully_inside_keeps_whole_interval() {
        let a = Vec4::new(-0.5, 0.0, 0.5, 1.0);
        let b = Vec4::new(0.5, 0.0, 0.5, 1.0);
        assert_eq!(line_in_frustum(a, b), Some((0.0, 1.0)));
    }

    #[test]
    fn line_clip_interval_is_ordered_and_lands_inside() {
        let cases = [
            (Vec4::new(-3.0, 0.0, 0.5, 1.0), Vec4::new(3.0, 0.0, 0.5, 1.0)),
            (Vec4::new(0.0, -2.0, 0.1, 1.0), Vec4::new(0.0, 2.0, 0.9, 1.0)),
            (Vec4::new(0.0, 0.0, -1.0, 1.0), Vec4::new(0.0, 0.0, 2.0, 1.0)),
            (Vec4::new(-1.0, -1.0, 0.0, 0.5), Vec4::new(4.0, 4.0, 4.0, 4.0)),
        ];
        for (a, b) in cases {
            let (t0, t1) = line_in_frustum(a, b).unwrap();
            assert!((0.0..=1.0).contains(&t0));
            assert!((0.0..=1.0).contains(&t1));
            assert!(t0 <= t1);
            assert!(inside_frustum_after(a, b, t0));
            assert!(inside_frustum_after(a, b, t1));
        }
    }

    #[test]
    fn line_outside_is_rejected() {
        // Entirely to the right of the frustum.
        assert_eq!(
            line_in_frustum(Vec4::new(2.0, 0.0, 0.5, 1.0), Vec4::new(3.0, 0.0, 0.5, 1.0)),
            None,
        );
        // Both endpoints behind the eye.
        assert_eq!(
            line_in_frustum(
                Vec4::new(0.0, 0.0, 0.0, -1.0),
                Vec4::new(0.1, 0.0, 0.0, -2.0),
            ),
            None,
        );
        // Degenerate endpoint.
        assert_eq!(
            line_in_frustum(Vec4::broadcast(0.0), Vec4::new(0.0, 0.0, 0.5, 1.0)),
            None,
        );
    }

    #[test]
    fn bounds_line_clip() {
        let bounds = SCREEN_BOUNDS;
        let (t0, t1) =
            line_in_bounds(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), bounds).unwrap();
        assert_eq!((t0, t1), (0.25, 0.75));
        assert_eq!(
            line_in_bounds(Vec2::new(-2.0, 2.0), Vec2::new(-2.0, -2.0), bounds),
            None,
        );
    }

    fn drain<V: Varying>(queues: &mut ClipQueues<V>) -> alloc::vec::Vec<[Vec4<f32>; 3]> {
        let mut out = alloc::vec::Vec::new();
        while let Some((pos, _)) = queues.pop() {
            out.push(pos);
        }
        out
    }

    #[test]
    fn triangle_inside_survives_unchanged() {
        let mut buffers = ClipBuffers::new();
        let tri = [
            Vec4::new(-0.5, -0.5, 0.5, 1.0),
            Vec4::new(0.5, -0.5, 0.5, 1.0),
            Vec4::new(0.0, 0.5, 0.5, 1.0),
        ];
        assert!(clip_triangle_to_frustum(
            &mut buffers,
            tri,
            [Empty, Empty, Empty],
        ));
        let triplets = drain(&mut buffers.frustum);
        assert_eq!(triplets, alloc::vec![tri]);
    }

    #[test]
    fn triangle_outside_is_dropped() {
        let mut buffers = ClipBuffers::new();
        let tri = [
            Vec4::new(2.0, 0.0, 0.5, 1.0),
            Vec4::new(3.0, 0.0, 0.5, 1.0),
            Vec4::new(2.5, 1.0, 0.5, 1.0),
        ];
        assert!(!clip_triangle_to_frustum(
            &mut buffers,
            tri,
            [Empty, Empty, Empty],
        ));
    }

    #[test]
    fn clipped_triangles_stay_inside_every_plane() {
        let mut buffers = ClipBuffers::new();
        // Pokes out of the right and top planes; the result must be a fan of triplets that
        // all satisfy every plane's inside predicate.
        let tri = [
            Vec4::new(-0.5, -0.5, 0.5, 1.0),
            Vec4::new(2.5, 0.0, 0.5, 1.0),
            Vec4::new(0.0, 2.5, 0.5, 1.0),
        ];
        assert!(clip_triangle_to_frustum(
            &mut buffers,
            tri,
            [Empty, Empty, Empty],
        ));
        let triplets = drain(&mut buffers.frustum);
        assert!(triplets.len() >= 2);
        for triplet in triplets {
            for p in triplet {
                for plane in FRUSTUM_PLANES {
                    assert!(
                        plane.distance(p) >= -1e-5,
                        "{:?} leaks {:?} by {}",
                        p,
                        plane,
                        -plane.distance(p),
                    );
                }
            }
        }
    }

    #[test]
    fn screen_clip_is_perspective_correct() {
        let mut buffers = ClipBuffers::new();
        // An edge from z_inv = 1 to z_inv = 0.1, cut at the screen's right side, which is the
        // screen-space midpoint. The attribute must land at the perspective-correct value,
        // not the affine average.
        let a = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let b = Vec4::new(2.0, 0.0, 0.0, 0.1);
        let c = Vec4::new(0.0, -2.0, 0.0, 1.0);
        assert!(clip_triangle_to_bounds(
            &mut buffers,
            SCREEN_BOUNDS,
            [a, b, c],
            [0.0f32, 1.0, 0.0],
        ));
        let mut cut_attr = None;
        while let Some((pos, attrs)) = buffers.screen.pop() {
            for (p, a) in Iterator::zip(pos.iter(), attrs.iter()) {
                assert!(p.x <= 1.0 + 1e-6);
                if (p.x - 1.0).abs() < 1e-6 && p.y.abs() < 1e-6 {
                    cut_attr = Some(*a);
                }
            }
        }
        let expected = (0.5 * 0.1) / (0.5 * 1.0 + 0.5 * 0.1);
        let cut = cut_attr.expect("no vertex on the clip boundary");
        assert!((cut - expected).abs() < 1e-6, "{} vs {}", cut, expected);
    }
}
