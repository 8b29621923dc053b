use crate::fragment::{lerp_projected_attrs, ProjectedFragment};
use crate::math::Varying;
use crate::renderer::{LineDirection, LineEnds};
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// Rasterize a window-space line with a DDA walk, one fragment per step.
///
/// The walk advances one pixel per step along the dominant axis. `ends` decides whether the
/// first and last step emit; `direction` normalizes which endpoint the walk starts from, so
/// that a line and its reverse cover the same pixels.
pub fn line<V, F>(
    a: ProjectedFragment<V>,
    b: ProjectedFragment<V>,
    direction: LineDirection,
    ends: LineEnds,
    mut emit: F,
) where
    V: Varying,
    F: FnMut(ProjectedFragment<V>),
{
    if let Some(steps) = DdaSteps::new(a, b, direction, ends, false) {
        for (_, frag) in steps {
            emit(frag);
        }
    }
}

/// Rasterize a window-space line, emitting each fragment together with its successor.
///
/// Every call receives `[current, next]` with a mask telling whether each element lies on the
/// rasterized span; the second element is always a lookahead (one step past `current`) meant
/// to run as a helper invocation, never to be committed.
pub fn line_pairs<V, F>(
    a: ProjectedFragment<V>,
    b: ProjectedFragment<V>,
    direction: LineDirection,
    ends: LineEnds,
    mut emit: F,
) where
    V: Varying,
    F: FnMut([(ProjectedFragment<V>, bool); 2]),
{
    let mut steps = match DdaSteps::new(a, b, direction, ends, true) {
        Some(steps) => steps,
        None => return,
    };
    let last = steps.stop;
    let mut cur = match steps.next() {
        Some(cur) => cur,
        None => return,
    };
    while cur.0 <= last {
        let next = match steps.next() {
            Some(next) => next,
            None => break,
        };
        emit([(cur.1, true), (next.1.clone(), next.0 <= last)]);
        cur = next;
    }
}

/// The running state of one DDA walk: position, depth, `1/w` and the line parameter all
/// advance by constant increments per step.
struct DdaSteps<V> {
    pos: Vec2<f32>,
    pos_step: Vec2<f32>,
    depth: f32,
    depth_step: f32,
    z_inv: f32,
    z_inv_step: f32,
    t: f32,
    t_step: f32,
    i: i64,
    /// Last step index that is part of the rasterized span.
    stop: i64,
    /// With lookahead, iteration continues one step past `stop`.
    lookahead: bool,
    a_attrs: V,
    b_attrs: V,
    a_z_inv: f32,
    b_z_inv: f32,
}

impl<V: Varying> DdaSteps<V> {
    fn new(
        a: ProjectedFragment<V>,
        b: ProjectedFragment<V>,
        direction: LineDirection,
        ends: LineEnds,
        lookahead: bool,
    ) -> Option<Self> {
        let delta = b.pos - a.pos;
        let swap = match direction {
            LineDirection::Right => delta.x < 0.0,
            LineDirection::Left => delta.x > 0.0,
            LineDirection::Up => delta.y < 0.0,
            LineDirection::Down => delta.y > 0.0,
        };
        let (a, b) = if swap { (b, a) } else { (a, b) };

        let delta = b.pos - a.pos;
        let len = delta.x.abs().max(delta.y.abs());
        if len.round() == 0.0 {
            return None;
        }

        let n = len.floor() as i64;
        let start = if ends.includes_start() { 0 } else { 1 };
        let stop = if ends.includes_end() { n } else { n - 1 };
        if start > stop {
            return None;
        }

        let inv = 1.0 / len;
        let mut steps = Self {
            pos: a.pos,
            pos_step: delta * inv,
            depth: a.depth,
            depth_step: (b.depth - a.depth) * inv,
            z_inv: a.z_inv,
            z_inv_step: (b.z_inv - a.z_inv) * inv,
            t: 0.0,
            t_step: inv,
            i: 0,
            stop,
            lookahead,
            a_z_inv: a.z_inv,
            b_z_inv: b.z_inv,
            a_attrs: a.attrs,
            b_attrs: b.attrs,
        };
        for _ in 0..start {
            steps.advance();
        }
        Some(steps)
    }

    fn advance(&mut self) {
        self.i += 1;
        self.pos += self.pos_step;
        self.depth += self.depth_step;
        self.z_inv += self.z_inv_step;
        self.t += self.t_step;
    }
}

impl<V: Varying> Iterator for DdaSteps<V> {
    type Item = (i64, ProjectedFragment<V>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.i > self.stop + self.lookahead as i64 {
            return None;
        }
        let frag = ProjectedFragment {
            pos: self.pos.map(|e| e.floor()),
            depth: self.depth,
            z_inv: self.z_inv,
            attrs: lerp_projected_attrs(
                &self.a_attrs,
                &self.b_attrs,
                self.t,
                self.a_z_inv,
                self.b_z_inv,
                self.z_inv,
            ),
        };
        let i = self.i;
        self.advance();
        Some((i, frag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn frag(x: f32, y: f32, attr: f32) -> ProjectedFragment<f32> {
        ProjectedFragment {
            pos: Vec2::new(x, y),
            depth: 0.0,
            z_inv: 1.0,
            attrs: attr,
        }
    }

    fn pixels(
        a: ProjectedFragment<f32>,
        b: ProjectedFragment<f32>,
        ends: LineEnds,
    ) -> Vec<ProjectedFragment<f32>> {
        let mut out = Vec::new();
        line(a, b, LineDirection::Right, ends, |f| out.push(f));
        out
    }

    #[test]
    fn step_count_follows_the_ends_policy() {
        let (a, b) = (frag(0.0, 0.0, 0.0), frag(10.0, 4.0, 1.0));
        assert_eq!(pixels(a.clone(), b.clone(), LineEnds::Both).len(), 11);
        assert_eq!(pixels(a.clone(), b.clone(), LineEnds::Start).len(), 10);
        assert_eq!(pixels(a.clone(), b.clone(), LineEnds::End).len(), 10);
        assert_eq!(pixels(a, b, LineEnds::None).len(), 9);
    }

    #[test]
    fn identical_endpoints_emit_nothing() {
        let (a, b) = (frag(3.0, 3.0, 0.0), frag(3.0, 3.0, 1.0));
        assert_eq!(pixels(a, b, LineEnds::Both).len(), 0);
    }

    #[test]
    fn diagonal_midpoint_attribute() {
        let out = pixels(frag(16.0, 16.0, 0.0), frag(48.0, 48.0, 1.0), LineEnds::Both);
        assert_eq!(out.len(), 33);
        let mid = &out[16];
        assert_eq!(mid.pos, Vec2::new(32.0, 32.0));
        assert!((mid.attrs - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reversed_endpoints_cover_the_same_pixels() {
        let (a, b) = (frag(0.0, 0.0, 0.0), frag(7.0, 3.0, 1.0));
        let fwd: Vec<_> = pixels(a.clone(), b.clone(), LineEnds::Both)
            .into_iter()
            .map(|f| f.pos)
            .collect();
        let rev: Vec<_> = pixels(b, a, LineEnds::Both)
            .into_iter()
            .map(|f| f.pos)
            .collect();
        assert_eq!(fwd, rev);
    }

    #[test]
    fn pairs_look_one_step_ahead() {
        let (a, b) = (frag(0.0, 0.0, 0.0), frag(4.0, 0.0, 1.0));
        let mut seen = Vec::new();
        line_pairs(a, b, LineDirection::Right, LineEnds::Both, |pair| {
            seen.push((pair[0].0.pos.x, pair[0].1, pair[1].0.pos.x, pair[1].1));
        });
        assert_eq!(seen.len(), 5);
        for (i, (x, cur_in, next_x, _)) in seen.iter().enumerate() {
            assert_eq!(*x, i as f32);
            assert!(*cur_in);
            assert_eq!(*next_x, i as f32 + 1.0);
        }
        // The lookahead of the final pair extrapolates past the endpoint.
        assert!(!seen.last().unwrap().3);
        assert!(seen[..4].iter().all(|s| s.3));
    }

    #[test]
    fn perspective_attribute_bias_along_a_line() {
        // z_inv halves across the span, so the world-space midpoint sits past the screen
        // midpoint.
        let a = ProjectedFragment {
            pos: Vec2::new(0.0, 0.0),
            depth: 0.0,
            z_inv: 1.0,
            attrs: 0.0f32,
        };
        let b = ProjectedFragment {
            pos: Vec2::new(8.0, 0.0),
            depth: 0.0,
            z_inv: 0.5,
            attrs: 1.0f32,
        };
        let mut out = Vec::new();
        line(a, b, LineDirection::Right, LineEnds::Both, |f| out.push(f));
        let mid = &out[4];
        let expected = (0.5 * 0.5) / (0.5 * 1.0 + 0.5 * 0.5);
        assert!((mid.attrs - expected).abs() < 1e-6);
    }
}
