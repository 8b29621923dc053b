use crate::clip::{
    clip_triangle_to_bounds, clip_triangle_to_frustum, line_in_bounds, line_in_frustum,
    point_in_bounds, point_in_frustum, ClipBuffers, SCREEN_BOUNDS,
};
use crate::fragment::{Fragment, ProjectedFragment};
use crate::framebuffer::Framebuffer;
use crate::math::{cross2, rect_to_rect, transform_point2};
use crate::primitives::{
    assemble, IndexedVertexBuffer, Primitive, PrimitiveTopology, VertexBuffer,
};
use crate::program::{FragmentContext, GroupKind, Program, QuadSlots, Token};
use crate::rasterizer;
use core::mem;
use vek::*;

#[cfg(feature = "micromath")]
use micromath_::F32Ext;

/// Which triangle orientation, seen in window space, is kept.
///
/// The opposite orientation is treated as backfacing and culled. `Neither` draws both.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WindingOrder {
    Clockwise,
    CounterClockwise,
    Neither,
}

/// Which triangle edges claim the pixels that sit exactly on them.
///
/// With `TopLeft`, the top and left edges are inclusive and the others exclusive, so two
/// triangles sharing an edge cover each of its pixels exactly once. `BottomRight` is the
/// mirrored convention; `Neither` makes every edge inclusive (shared pixels are drawn twice).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FillBias {
    TopLeft,
    BottomRight,
    Neither,
}

/// The direction a rasterized line walks in, used to normalize endpoint order so that a line
/// and its reverse cover identical pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LineDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Which endpoints of a line emit a fragment.
///
/// Strip-like topologies may want `Start` or `End` so that interior joints are not plotted by
/// both of their lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LineEnds {
    None,
    Start,
    End,
    Both,
}

impl LineEnds {
    #[inline]
    pub fn includes_start(self) -> bool {
        matches!(self, LineEnds::Start | LineEnds::Both)
    }

    #[inline]
    pub fn includes_end(self) -> bool {
        matches!(self, LineEnds::End | LineEnds::Both)
    }
}

/// Per-draw rendering options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawOptions {
    pub winding_order: WindingOrder,
    pub fill_bias: FillBias,
    pub line_direction: LineDirection,
    pub line_ends: LineEnds,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            winding_order: WindingOrder::Neither,
            fill_bias: FillBias::TopLeft,
            line_direction: LineDirection::Right,
            line_ends: LineEnds::Both,
        }
    }
}

/// The draw-call driver.
///
/// A renderer holds no per-draw state beyond its viewport; every [`Renderer::draw`] call is
/// self-contained, borrowing the framebuffer exclusively for its duration and reading
/// everything else.
pub struct Renderer {
    viewport: Aabr<f32>,
    screen_to_viewport: Option<Mat3<f32>>,
    requires_screen_clipping: bool,
}

impl Renderer {
    /// A renderer drawing to the whole screen.
    pub fn new() -> Self {
        Self {
            viewport: SCREEN_BOUNDS,
            screen_to_viewport: None,
            requires_screen_clipping: false,
        }
    }

    /// A renderer whose output is scaled into the given region of screen space.
    ///
    /// If the viewport sticks out of the screen rectangle, geometry is clipped a second time
    /// in screen space after the viewport scale.
    pub fn with_viewport(viewport: Aabr<f32>) -> Self {
        let contained = SCREEN_BOUNDS.min.x <= viewport.min.x
            && viewport.max.x <= SCREEN_BOUNDS.max.x
            && SCREEN_BOUNDS.min.y <= viewport.min.y
            && viewport.max.y <= SCREEN_BOUNDS.max.y;
        Self {
            viewport,
            screen_to_viewport: (viewport != SCREEN_BOUNDS)
                .then(|| rect_to_rect(SCREEN_BOUNDS, viewport)),
            requires_screen_clipping: !contained,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Aabr<f32> {
        self.viewport
    }

    /// Draw a vertex stream.
    pub fn draw<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        buffer: &VertexBuffer<P::Vertex>,
        framebuffer: &mut F,
        options: DrawOptions,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        self.draw_with_buffers(
            program,
            uniform,
            buffer,
            framebuffer,
            options,
            &mut ClipBuffers::new(),
        );
    }

    /// As [`Renderer::draw`], reusing caller-owned clip queues across draws.
    pub fn draw_with_buffers<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        buffer: &VertexBuffer<P::Vertex>,
        framebuffer: &mut F,
        options: DrawOptions,
        clip_buffers: &mut ClipBuffers<P::Varying>,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        self.draw_stream(
            program,
            uniform,
            &buffer.vertices,
            None,
            buffer.topology,
            framebuffer,
            options,
            clip_buffers,
        );
    }

    /// Draw an indexed vertex stream.
    pub fn draw_indexed<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        buffer: &IndexedVertexBuffer<P::Vertex>,
        framebuffer: &mut F,
        options: DrawOptions,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        self.draw_indexed_with_buffers(
            program,
            uniform,
            buffer,
            framebuffer,
            options,
            &mut ClipBuffers::new(),
        );
    }

    /// As [`Renderer::draw_indexed`], reusing caller-owned clip queues across draws.
    pub fn draw_indexed_with_buffers<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        buffer: &IndexedVertexBuffer<P::Vertex>,
        framebuffer: &mut F,
        options: DrawOptions,
        clip_buffers: &mut ClipBuffers<P::Varying>,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        self.draw_stream(
            program,
            uniform,
            &buffer.vertices,
            Some(&buffer.indices),
            buffer.topology,
            framebuffer,
            options,
            clip_buffers,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_stream<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        vertices: &[P::Vertex],
        indices: Option<&[usize]>,
        topology: PrimitiveTopology,
        framebuffer: &mut F,
        options: DrawOptions,
        clip_buffers: &mut ClipBuffers<P::Varying>,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        if let Some(indices) = indices {
            for &i in indices {
                assert!(
                    i < vertices.len(),
                    "vertex index {} out of bounds for a buffer of {} vertices",
                    i,
                    vertices.len(),
                );
            }
        }
        let count = indices.map_or(vertices.len(), <[usize]>::len);
        let to_window = framebuffer.screen_to_window();
        let shade = |slot: usize| {
            let i = indices.map_or(slot, |indices| indices[slot]);
            program.vertex(uniform, &vertices[i])
        };

        for primitive in assemble(topology, count) {
            match primitive {
                Primitive::Point(a) => {
                    self.draw_point(program, uniform, shade(a), framebuffer, to_window)
                }
                Primitive::Line([a, b]) => self.draw_line(
                    program,
                    uniform,
                    shade(a),
                    shade(b),
                    framebuffer,
                    to_window,
                    options,
                ),
                Primitive::Triangle([a, b, c]) => self.draw_triangle(
                    program,
                    uniform,
                    [shade(a), shade(b), shade(c)],
                    framebuffer,
                    to_window,
                    options,
                    clip_buffers,
                ),
            }
        }
    }

    fn draw_point<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        frag: Fragment<P::Varying>,
        framebuffer: &mut F,
        to_window: Mat3<f32>,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        if !point_in_frustum(frag.pos) {
            return;
        }
        let mut frag = frag.project();
        if let Some(viewport) = self.screen_to_viewport {
            frag.pos = transform_point2(viewport, frag.pos);
        }
        if self.requires_screen_clipping && !point_in_bounds(frag.pos, SCREEN_BOUNDS) {
            return;
        }
        frag.pos = snap(transform_point2(to_window, frag.pos));
        run_group(
            program,
            uniform,
            GroupKind::Point,
            [Some((frag, false)), None, None, None],
            framebuffer,
        );
    }

    fn draw_line<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        a: Fragment<P::Varying>,
        b: Fragment<P::Varying>,
        framebuffer: &mut F,
        to_window: Mat3<f32>,
        options: DrawOptions,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        let (t0, t1) = match line_in_frustum(a.pos, b.pos) {
            Some(interval) => interval,
            None => return,
        };
        let mut p0 = Fragment::lerp(&a, &b, t0).project();
        let mut p1 = Fragment::lerp(&a, &b, t1).project();
        if let Some(viewport) = self.screen_to_viewport {
            p0.pos = transform_point2(viewport, p0.pos);
            p1.pos = transform_point2(viewport, p1.pos);
        }
        if self.requires_screen_clipping {
            match line_in_bounds(p0.pos, p1.pos, SCREEN_BOUNDS) {
                Some((s0, s1)) => {
                    let c0 = ProjectedFragment::lerp(&p0, &p1, s0);
                    let c1 = ProjectedFragment::lerp(&p0, &p1, s1);
                    p0 = c0;
                    p1 = c1;
                }
                None => return,
            }
        }
        p0.pos = snap(transform_point2(to_window, p0.pos));
        p1.pos = snap(transform_point2(to_window, p1.pos));
        rasterizer::line_pairs(
            p0,
            p1,
            options.line_direction,
            options.line_ends,
            |[(current, _), (next, _)]| {
                // The lookahead exists only to give `current` a derivative neighbour.
                run_group(
                    program,
                    uniform,
                    GroupKind::Line,
                    [Some((current, false)), Some((next, true)), None, None],
                    framebuffer,
                );
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_triangle<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        frags: [Fragment<P::Varying>; 3],
        framebuffer: &mut F,
        to_window: Mat3<f32>,
        options: DrawOptions,
        clip_buffers: &mut ClipBuffers<P::Varying>,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        let zero = Vec4::broadcast(0.0);
        if frags.iter().any(|f| f.pos == zero) {
            return;
        }
        let [f0, f1, f2] = frags;
        if !clip_triangle_to_frustum(
            clip_buffers,
            [f0.pos, f1.pos, f2.pos],
            [f0.attrs, f1.attrs, f2.attrs],
        ) {
            return;
        }

        while let Some((pos, attrs)) = clip_buffers.frustum.pop() {
            let [a0, a1, a2] = attrs;
            let mut tri = [
                Fragment::new(pos[0], a0).project(),
                Fragment::new(pos[1], a1).project(),
                Fragment::new(pos[2], a2).project(),
            ];
            if let Some(viewport) = self.screen_to_viewport {
                for frag in &mut tri {
                    frag.pos = transform_point2(viewport, frag.pos);
                }
            }

            if self.requires_screen_clipping {
                // Re-enter the clipping machinery with the screen-pass queues, packing each
                // projected vertex as (x, y, depth, z_inv).
                let [t0, t1, t2] = tri;
                let packed = [
                    Vec4::new(t0.pos.x, t0.pos.y, t0.depth, t0.z_inv),
                    Vec4::new(t1.pos.x, t1.pos.y, t1.depth, t1.z_inv),
                    Vec4::new(t2.pos.x, t2.pos.y, t2.depth, t2.z_inv),
                ];
                if !clip_triangle_to_bounds(
                    clip_buffers,
                    SCREEN_BOUNDS,
                    packed,
                    [t0.attrs, t1.attrs, t2.attrs],
                ) {
                    continue;
                }
                while let Some((pos, attrs)) = clip_buffers.screen.pop() {
                    let [a0, a1, a2] = attrs;
                    let unpack = |p: Vec4<f32>, attrs| ProjectedFragment {
                        pos: Vec2::new(p.x, p.y),
                        depth: p.z,
                        z_inv: p.w,
                        attrs,
                    };
                    let sub = [
                        unpack(pos[0], a0),
                        unpack(pos[1], a1),
                        unpack(pos[2], a2),
                    ];
                    self.emit_triangle(program, uniform, sub, framebuffer, to_window, options);
                }
            } else {
                self.emit_triangle(program, uniform, tri, framebuffer, to_window, options);
            }
        }
    }

    fn emit_triangle<P, F>(
        &self,
        program: &P,
        uniform: &P::Uniform,
        mut tri: [ProjectedFragment<P::Varying>; 3],
        framebuffer: &mut F,
        to_window: Mat3<f32>,
        options: DrawOptions,
    ) where
        P: Program,
        F: Framebuffer<P::Targets>,
    {
        for frag in &mut tri {
            frag.pos = snap(transform_point2(to_window, frag.pos));
        }

        // Backface culling happens in window space, after every transform.
        let area2 = cross2(tri[2].pos - tri[0].pos, tri[1].pos - tri[0].pos);
        match options.winding_order {
            WindingOrder::Clockwise if area2 > 0.0 => return,
            WindingOrder::CounterClockwise if area2 < 0.0 => return,
            _ => {}
        }
        // The rasterizer wants cross(v0->v1, v0->v2) positive, which is -area2; swap the
        // other orientation rather than culling it.
        let tri = if area2 > 0.0 {
            let [v0, v1, v2] = tri;
            [v0, v2, v1]
        } else {
            tri
        };

        rasterizer::triangle_quads(&tri, options.fill_bias, |quad| {
            let members = quad.map(|(frag, covered)| Some((frag, !covered)));
            run_group(program, uniform, GroupKind::Filled, members, framebuffer);
        });
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Round a window-space position to the center of the pixel containing it.
#[inline]
fn snap(pos: Vec2<f32>) -> Vec2<f32> {
    pos.map(|e| (e + 0.5).floor())
}

/// Run the fragment shader for one group of neighbouring invocations in lock-step, then
/// commit the survivors.
///
/// Each member is `(fragment, is_helper)`. All live members advance one token per round; a
/// round in which some but not all live members yield [`Token::Synchronize`] is a programmer
/// error in the shader and panics. After the shader runs, non-helper, non-discarded members
/// are depth-tested and plotted in slot order.
fn run_group<P, F>(
    program: &P,
    uniform: &P::Uniform,
    kind: GroupKind,
    members: [Option<(ProjectedFragment<P::Varying>, bool)>; 4],
    framebuffer: &mut F,
) where
    P: Program,
    F: Framebuffer<P::Targets>,
{
    let mut meta: [Option<(Vec2<i32>, f32, bool)>; 4] = [None; 4];
    for (slot, member) in members.iter().enumerate() {
        if let Some((frag, helper)) = member {
            meta[slot] = Some((frag.pos.map(|e| e as i32), frag.depth, *helper));
        }
    }

    let slots = QuadSlots::<P::SlotValue>::new();
    let mut outputs: [P::Targets; 4] = Default::default();
    let mut discarded = [false; 4];
    {
        let [m0, m1, m2, m3] = members;
        let [o0, o1, o2, o3] = &mut outputs;
        let mut runs = [
            m0.map(|(frag, helper)| {
                program.fragment(FragmentContext::new(0, kind, helper, &slots), uniform, frag, o0)
            }),
            m1.map(|(frag, helper)| {
                program.fragment(FragmentContext::new(1, kind, helper, &slots), uniform, frag, o1)
            }),
            m2.map(|(frag, helper)| {
                program.fragment(FragmentContext::new(2, kind, helper, &slots), uniform, frag, o2)
            }),
            m3.map(|(frag, helper)| {
                program.fragment(FragmentContext::new(3, kind, helper, &slots), uniform, frag, o3)
            }),
        ];

        let mut live = runs.iter().filter(|r| r.is_some()).count();
        while live > 0 {
            let live_at_start = live;
            let mut syncs = 0;
            for (slot, run) in runs.iter_mut().enumerate() {
                if let Some(tokens) = run {
                    match tokens.next() {
                        Some(Token::Synchronize) => syncs += 1,
                        Some(Token::Discard) => discarded[slot] = true,
                        Some(Token::Keep) => {}
                        None => {
                            *run = None;
                            live -= 1;
                        }
                    }
                }
            }
            if syncs > 0 {
                assert!(
                    syncs == live_at_start,
                    "fragment shader group lost lock-step: {} of {} members yielded a \
                     synchronize token at the same step",
                    syncs,
                    live_at_start,
                );
                slots.mark_synced();
            }
        }
    }

    for (slot, member) in meta.into_iter().enumerate() {
        if let Some((pos, depth, helper)) = member {
            if helper || discarded[slot] {
                continue;
            }
            if framebuffer.test_and_set_depth(pos, depth) {
                framebuffer.plot(pos, mem::take(&mut outputs[slot]));
            }
        }
    }
}
