use crate::fragment::{Fragment, ProjectedFragment};
use crate::math::Varying;
use core::cell::Cell;
use core::ops::Sub;

/// A step yielded by a fragment shader.
///
/// The fragment shader is a lazily-evaluated sequence of tokens; the renderer advances every
/// member of a primitive group in lock-step, one token per member per round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// Carry on; the fragment is still live.
    Keep,
    /// Drop this member's final output. The member keeps executing so that its neighbours can
    /// still read its shared values.
    Discard,
    /// A group-wide barrier. Every live member must yield `Synchronize` at the same step;
    /// afterwards the values shared via [`FragmentContext::share`] are visible to all members
    /// and derivative queries become legal.
    Synchronize,
}

/// The kind of primitive a fragment group belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// A lone fragment; no derivatives are available.
    Point,
    /// A pair along a line; [`FragmentContext::dfdv`] is available.
    Line,
    /// A 2x2 quad of a filled triangle; [`FragmentContext::dfdx`] and
    /// [`FragmentContext::dfdy`] are available.
    Filled,
}

/// The slot array shared by the members of one fragment group.
///
/// Slots are `Cell`s so that each member can publish into its own slot while its peers hold
/// borrows of the same array.
pub(crate) struct QuadSlots<T> {
    values: [Cell<T>; 4],
    synced: Cell<bool>,
}

impl<T: Copy + Default> QuadSlots<T> {
    pub(crate) fn new() -> Self {
        Self {
            values: Default::default(),
            synced: Cell::new(false),
        }
    }

    pub(crate) fn mark_synced(&self) {
        self.synced.set(true);
    }
}

/// The identity of one fragment-shader invocation within its group.
///
/// Groups have 1 member for points, 2 for lines (the second being a lookahead helper) and 4
/// for filled triangles (a 2x2 quad, with ids laid out `0 1` over `2 3`, x to the right and y
/// downward a row).
pub struct FragmentContext<'g, T> {
    id: usize,
    kind: GroupKind,
    helper: bool,
    slots: &'g QuadSlots<T>,
}

impl<'g, T: Copy + Default> FragmentContext<'g, T> {
    pub(crate) fn new(id: usize, kind: GroupKind, helper: bool, slots: &'g QuadSlots<T>) -> Self {
        Self {
            id,
            kind,
            helper,
            slots,
        }
    }

    /// This invocation's slot index within its group.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The kind of primitive group this invocation belongs to.
    #[inline]
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Whether this invocation exists only to supply neighbour values for derivatives. Helper
    /// results are never written to the framebuffer.
    #[inline]
    pub fn is_helper_invocation(&self) -> bool {
        self.helper
    }

    /// Publish a value into this invocation's slot.
    ///
    /// The shader must yield [`Token::Synchronize`] directly after sharing, so that every peer
    /// reaches the barrier before anyone reads.
    #[inline]
    pub fn share(&self, value: T) {
        self.slots.values[self.id].set(value);
    }

    /// Read the value peer `id` shared before the barrier.
    #[inline]
    pub fn peer(&self, id: usize) -> T {
        assert!(
            self.slots.synced.get(),
            "fragment group values read before a synchronize barrier",
        );
        self.slots.values[id].get()
    }
}

impl<'g, T: Copy + Default + Sub<Output = T>> FragmentContext<'g, T> {
    #[inline]
    fn quad(&self) -> [T; 4] {
        assert!(
            self.slots.synced.get(),
            "fragment derivatives read before a synchronize barrier",
        );
        [
            self.slots.values[0].get(),
            self.slots.values[1].get(),
            self.slots.values[2].get(),
            self.slots.values[3].get(),
        ]
    }

    /// The horizontal finite difference of the shared value across this invocation's quad row.
    /// Only meaningful for [`GroupKind::Filled`] groups.
    #[inline]
    pub fn dfdx(&self) -> T {
        debug_assert!(self.kind == GroupKind::Filled);
        let [v0, v1, v2, v3] = self.quad();
        match self.id {
            0 | 1 => v1 - v0,
            _ => v3 - v2,
        }
    }

    /// The vertical finite difference of the shared value across this invocation's quad
    /// column. Only meaningful for [`GroupKind::Filled`] groups.
    #[inline]
    pub fn dfdy(&self) -> T {
        debug_assert!(self.kind == GroupKind::Filled);
        let [v0, v1, v2, v3] = self.quad();
        match self.id {
            0 | 2 => v2 - v0,
            _ => v3 - v1,
        }
    }

    /// The finite difference of the shared value along the line being rasterized. Only
    /// meaningful for [`GroupKind::Line`] groups.
    #[inline]
    pub fn dfdv(&self) -> T {
        debug_assert!(self.kind == GroupKind::Line);
        let [v0, v1, ..] = self.quad();
        v1 - v0
    }
}

/// A complete shader program: the per-vertex and per-fragment stages of a draw call, plus the
/// types they communicate with.
///
/// The fragment stage returns an iterator of [`Token`]s rather than a plain value: this is
/// what lets the renderer suspend a whole group of neighbouring invocations at a
/// [`Token::Synchronize`] barrier so they can exchange values for derivatives. Shaders with no
/// barrier needs simply write their output and return
/// `core::iter::once(Token::Keep)`.
pub trait Program {
    /// Draw-constant data available to both stages: transforms, lookup tables, textures.
    type Uniform;
    /// The vertex stream element consumed by [`Program::vertex`].
    type Vertex;
    /// Per-vertex attributes interpolated across primitives.
    type Varying: Varying;
    /// The value exchanged between group members via [`FragmentContext::share`].
    type SlotValue: Copy + Default;
    /// What a fragment writes to the framebuffer.
    type Targets: Clone + Default;
    /// The fragment stage's token sequence.
    type Tokens<'a>: Iterator<Item = Token> + 'a
    where
        Self: 'a;

    /// Transform one vertex into homogeneous clip space. Must be pure and deterministic.
    fn vertex(&self, uniform: &Self::Uniform, vertex: &Self::Vertex) -> Fragment<Self::Varying>;

    /// Shade one fragment.
    ///
    /// Whatever the shader last wrote through `output` when its token sequence ends is the
    /// invocation's result, unless it yielded [`Token::Discard`] along the way.
    fn fragment<'a>(
        &'a self,
        ctx: FragmentContext<'a, Self::SlotValue>,
        uniform: &'a Self::Uniform,
        input: ProjectedFragment<Self::Varying>,
        output: &'a mut Self::Targets,
    ) -> Self::Tokens<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_derivatives() {
        let slots = QuadSlots::<f32>::new();
        for (id, v) in [1.0f32, 2.0, 4.0, 8.0].into_iter().enumerate() {
            FragmentContext::new(id, GroupKind::Filled, false, &slots).share(v);
        }
        slots.mark_synced();

        let ctx = |id| FragmentContext::new(id, GroupKind::Filled, false, &slots);
        assert_eq!(ctx(0).dfdx(), 1.0);
        assert_eq!(ctx(1).dfdx(), 1.0);
        assert_eq!(ctx(2).dfdx(), 4.0);
        assert_eq!(ctx(3).dfdx(), 4.0);
        assert_eq!(ctx(0).dfdy(), 3.0);
        assert_eq!(ctx(2).dfdy(), 3.0);
        assert_eq!(ctx(1).dfdy(), 6.0);
        assert_eq!(ctx(3).dfdy(), 6.0);
        assert_eq!(ctx(0).peer(3), 8.0);
    }

    #[test]
    fn pair_derivative() {
        let slots = QuadSlots::<f32>::new();
        FragmentContext::new(0, GroupKind::Line, false, &slots).share(3.0);
        FragmentContext::new(1, GroupKind::Line, true, &slots).share(5.0);
        slots.mark_synced();
        assert_eq!(
            FragmentContext::new(0, GroupKind::Line, false, &slots).dfdv(),
            2.0,
        );
    }

    #[test]
    #[should_panic(expected = "synchronize barrier")]
    fn reading_before_the_barrier_panics() {
        let slots = QuadSlots::<f32>::new();
        let ctx = FragmentContext::new(0, GroupKind::Filled, false, &slots);
        ctx.share(1.0);
        let _ = ctx.dfdx();
    }
}
