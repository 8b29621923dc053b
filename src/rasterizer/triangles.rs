use crate::fragment::ProjectedFragment;
use crate::math::{cross2, Varying};
use crate::renderer::FillBias;
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// Rasterize a window-space triangle, one fragment per covered pixel, rows ascending and
/// columns ascending within a row.
///
/// The triangle must wind positively (`cross(v0->v1, v0->v2) > 0`); the caller is expected to
/// have swapped vertices already. Degenerate triangles emit nothing.
pub fn triangle<V, F>(verts: &[ProjectedFragment<V>; 3], bias: FillBias, mut emit: F)
where
    V: Varying,
    F: FnMut(ProjectedFragment<V>),
{
    let tri = match Setup::new(verts, bias) {
        Some(tri) => tri,
        None => return,
    };
    for y in tri.y0..tri.y1 {
        let mut w = tri.row(y);
        for x in tri.x0..tri.x1 {
            if tri.covered(w) {
                emit(tri.fragment(x, y, w));
            }
            tri.step_x(&mut w);
        }
    }
}

/// Rasterize a window-space triangle in aligned 2x2 quads.
///
/// Every quad containing at least one covered pixel is emitted whole, slots laid out
/// `[(x, y), (x+1, y), (x, y+1), (x+1, y+1)]` with a coverage mask. Uncovered slots carry
/// extrapolated fragments for the neighbouring covered pixels' derivatives and must run as
/// helper invocations.
pub fn triangle_quads<V, F>(verts: &[ProjectedFragment<V>; 3], bias: FillBias, mut emit: F)
where
    V: Varying,
    F: FnMut([(ProjectedFragment<V>, bool); 4]),
{
    let tri = match Setup::new(verts, bias) {
        Some(tri) => tri,
        None => return,
    };
    // Quads align to even coordinates so that a pixel's derivative neighbours do not depend
    // on the triangle's bounding box.
    let x0 = tri.x0 & !1;
    let y0 = tri.y0 & !1;
    for y in (y0..tri.y1).step_by(2) {
        let mut top = tri.row_from(x0, y);
        let mut bottom = tri.row_from(x0, y + 1);
        for x in (x0..tri.x1).step_by(2) {
            let (mut w10, mut w11) = (top, bottom);
            tri.step_x(&mut w10);
            tri.step_x(&mut w11);
            let quad = [(top, x, y), (w10, x + 1, y), (bottom, x, y + 1), (w11, x + 1, y + 1)];
            if quad.iter().any(|(w, _, _)| tri.covered(*w)) {
                let [a, b, c, d] =
                    quad.map(|(w, x, y)| (tri.fragment(x, y, w), tri.covered(w)));
                emit([a, b, c, d]);
            }
            top = w10;
            bottom = w11;
            tri.step_x(&mut top);
            tri.step_x(&mut bottom);
        }
    }
}

struct Setup<'a, V> {
    verts: &'a [ProjectedFragment<V>; 3],
    /// Edge vectors, edge `k` lying opposite vertex `k`.
    e: [Vec2<f32>; 3],
    /// Whether a pixel exactly on edge `k` counts as covered (the fill-rule bias).
    inclusive: [bool; 3],
    inv_area: f32,
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
    /// Edge function values at the pixel center of `(x0, y0)`.
    w_origin: [f32; 3],
}

impl<'a, V: Varying> Setup<'a, V> {
    fn new(verts: &'a [ProjectedFragment<V>; 3], bias: FillBias) -> Option<Self> {
        let p = [verts[0].pos, verts[1].pos, verts[2].pos];
        let area2 = cross2(p[1] - p[0], p[2] - p[0]);
        if !(area2 > 0.0) {
            return None;
        }

        let e = [p[2] - p[1], p[0] - p[2], p[1] - p[0]];
        let base = [p[1], p[2], p[0]];
        let inclusive = [
            edge_inclusive(e[0], bias),
            edge_inclusive(e[1], bias),
            edge_inclusive(e[2], bias),
        ];

        let min = p[0].map2(p[1], f32::min).map2(p[2], f32::min);
        let max = p[0].map2(p[1], f32::max).map2(p[2], f32::max);
        let x0 = (min.x.floor() as i32).max(0);
        let y0 = (min.y.floor() as i32).max(0);
        let (x1, y1) = (max.x.ceil() as i32, max.y.ceil() as i32);

        let center0 = Vec2::new(x0 as f32 + 0.5, y0 as f32 + 0.5);
        let w_origin = [
            cross2(e[0], center0 - base[0]),
            cross2(e[1], center0 - base[1]),
            cross2(e[2], center0 - base[2]),
        ];

        Some(Self {
            verts,
            e,
            inclusive,
            inv_area: 1.0 / area2,
            x0,
            x1,
            y0,
            y1,
            w_origin,
        })
    }

    /// Edge function values at the pixel center of `(self.x0, y)`.
    #[inline]
    fn row(&self, y: i32) -> [f32; 3] {
        self.row_from(self.x0, y)
    }

    /// Edge function values at the pixel center of `(x, y)`.
    #[inline]
    fn row_from(&self, x: i32, y: i32) -> [f32; 3] {
        let (dx, dy) = ((x - self.x0) as f32, (y - self.y0) as f32);
        [
            self.w_origin[0] + dy * self.e[0].x - dx * self.e[0].y,
            self.w_origin[1] + dy * self.e[1].x - dx * self.e[1].y,
            self.w_origin[2] + dy * self.e[2].x - dx * self.e[2].y,
        ]
    }

    /// Advance edge function values one pixel along +x.
    #[inline]
    fn step_x(&self, w: &mut [f32; 3]) {
        w[0] -= self.e[0].y;
        w[1] -= self.e[1].y;
        w[2] -= self.e[2].y;
    }

    /// The fill rule: strictly positive edge functions are always in; a pixel exactly on an
    /// edge is in only if the edge is inclusive.
    #[inline]
    fn covered(&self, w: [f32; 3]) -> bool {
        (0..3).all(|k| w[k] > 0.0 || (w[k] == 0.0 && self.inclusive[k]))
    }

    /// Interpolate a fragment at pixel `(x, y)` from its (possibly extrapolated) barycentric
    /// weights.
    fn fragment(&self, x: i32, y: i32, w: [f32; 3]) -> ProjectedFragment<V> {
        let [v0, v1, v2] = self.verts;
        let wt = [w[0] * self.inv_area, w[1] * self.inv_area, w[2] * self.inv_area];
        let z_inv = wt[0] * v0.z_inv + wt[1] * v1.z_inv + wt[2] * v2.z_inv;
        let depth = wt[0] * v0.depth + wt[1] * v1.depth + wt[2] * v2.depth;
        let norm = 1.0 / z_inv;
        let attrs = V::weighted_sum3(
            v0.attrs.clone(),
            v1.attrs.clone(),
            v2.attrs.clone(),
            wt[0] * v0.z_inv * norm,
            wt[1] * v1.z_inv * norm,
            wt[2] * v2.z_inv * norm,
        );
        ProjectedFragment {
            pos: Vec2::new(x as f32, y as f32),
            depth,
            z_inv,
            attrs,
        }
    }
}

/// Whether pixels exactly on an edge belong to this triangle.
///
/// Under the top-left rule an edge is inclusive iff it points rightward horizontally or
/// upward; `BottomRight` flips that, and `Neither` makes every edge inclusive.
#[inline]
fn edge_inclusive(e: Vec2<f32>, bias: FillBias) -> bool {
    match bias {
        FillBias::TopLeft => e.y > 0.0 || (e.y == 0.0 && e.x > 0.0),
        FillBias::BottomRight => e.y < 0.0 || (e.y == 0.0 && e.x < 0.0),
        FillBias::Neither => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn vert(x: f32, y: f32) -> ProjectedFragment<f32> {
        ProjectedFragment {
            pos: Vec2::new(x, y),
            depth: 0.0,
            z_inv: 1.0,
            attrs: 0.0,
        }
    }

    fn vert_a(x: f32, y: f32, z_inv: f32, attr: f32) -> ProjectedFragment<f32> {
        ProjectedFragment {
            pos: Vec2::new(x, y),
            depth: 0.0,
            z_inv,
            attrs: attr,
        }
    }

    fn cover(verts: &[ProjectedFragment<f32>; 3]) -> Vec<Vec2<i32>> {
        let mut out = Vec::new();
        triangle(verts, FillBias::TopLeft, |f| {
            out.push(f.pos.map(|e| e as i32));
        });
        out
    }

    #[test]
    fn shared_edge_pixels_are_covered_exactly_once() {
        // A quad split along its diagonal; both triangles wind positively.
        let (a, b, c, d) = (
            vert(0.0, 0.0),
            vert(8.0, 0.0),
            vert(8.0, 8.0),
            vert(0.0, 8.0),
        );
        let lower = cover(&[a.clone(), b.clone(), c.clone()]);
        let upper = cover(&[a, c, d]);
        let mut all = lower;
        all.extend(upper);
        let count = all.len();
        all.sort_by_key(|p| (p.y, p.x));
        all.dedup();
        assert_eq!(count, all.len(), "a pixel was covered twice");
        assert_eq!(count, 64, "the quad must be covered completely");
    }

    #[test]
    fn barycentric_weights_are_normalised()  {
        let verts = [vert_a(0.0, 0.0, 1.0, 0.0), vert_a(9.0, 0.0, 1.0, 0.0), vert_a(0.0, 9.0, 1.0, 0.0)];
        triangle(&verts, FillBias::TopLeft, |f| {
            // With unit z_inv everywhere, interpolated z_inv is exactly the weight sum.
            assert!((f.z_inv - 1.0).abs() < 1e-5);
        });
    }

    #[test]
    fn degenerate_triangles_emit_nothing() {
        // Collinear.
        let verts = [vert(0.0, 0.0), vert(4.0, 4.0), vert(8.0, 8.0)];
        assert_eq!(cover(&verts).len(), 0);
        // Negatively wound.
        let verts = [vert(0.0, 0.0), vert(0.0, 8.0), vert(8.0, 0.0)];
        assert_eq!(cover(&verts).len(), 0);
    }

    #[test]
    fn perspective_correct_attribute_at_the_centroid() {
        // Two vertices at w = 1, one at w = 10, attribute 1 on the far vertex. At the
        // screen-space centroid all weights are 1/3 and the perspective-correct value is
        // (1/3 * 0.1) / (1/3 * (1 + 1 + 0.1)), well below the affine 1/3.
        let verts = [
            vert_a(0.0, 0.0, 1.0, 0.0),
            vert_a(12.0, 0.0, 1.0, 0.0),
            vert_a(6.0, 12.0, 0.1, 1.0),
        ];
        let centroid = Vec2::new(6.0f32, 4.0);
        let mut hit = None;
        triangle(&verts, FillBias::TopLeft, |f| {
            if f.pos == centroid {
                hit = Some(f.attrs);
            }
        });
        let expected = 0.1 / 2.1;
        let got = hit.expect("centroid pixel not covered");
        assert!((got - expected).abs() < 2e-2, "{} vs {}", got, expected);
        assert!(got < 0.3333 - 2e-2, "interpolation must not be affine");
    }

    #[test]
    fn quads_align_and_mask_coverage() {
        let verts = [vert(1.0, 1.0), vert(6.0, 1.0), vert(1.0, 6.0)];
        let mut covered_in_quads = 0;
        let mut plain = 0;
        triangle_quads(&verts, FillBias::TopLeft, |quad| {
            // Aligned to even coordinates.
            assert_eq!(quad[0].0.pos.x as i32 % 2, 0);
            assert_eq!(quad[0].0.pos.y as i32 % 2, 0);
            // Slot layout: right and down from slot 0.
            assert_eq!(quad[1].0.pos, quad[0].0.pos + Vec2::new(1.0, 0.0));
            assert_eq!(quad[2].0.pos, quad[0].0.pos + Vec2::new(0.0, 1.0));
            assert_eq!(quad[3].0.pos, quad[0].0.pos + Vec2::new(1.0, 1.0));
            covered_in_quads += quad.iter().filter(|(_, c)| *c).count();
        });
        triangle(&verts, FillBias::TopLeft, |_| plain += 1);
        assert!(plain > 0);
        assert_eq!(covered_in_quads, plain);
    }
}
