//! A programmable software rasterizer.
//!
//! `softras` turns a stream of user vertices into shaded pixels on a user framebuffer,
//! driving a user-written shader [`Program`] through the classic pipeline:
//!
//! - the vertex stage maps vertices into homogeneous clip space
//! - points, lines and triangles are clipped against the view frustum (and, when a viewport
//!   leaves the screen, against screen space)
//! - the perspective divide and the viewport/window transforms place fragments on the pixel
//!   grid
//! - lines are walked with a DDA, triangles scanned with edge functions under a top-left fill
//!   rule, both with perspective-correct attribute interpolation
//! - the fragment stage runs in cooperating groups (2x2 quads for triangles, pairs for
//!   lines) so shaders can take screen-space derivatives and select texture mip levels, and
//!   may discard fragments
//! - survivors are depth-tested and plotted
//!
//! Every draw call is self-contained: there is no hidden rendering state beyond the
//! [`Renderer`]'s viewport.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod buffer;
pub mod clip;
pub mod fragment;
pub mod framebuffer;
pub mod math;
pub mod primitives;
pub mod program;
pub mod rasterizer;
pub mod renderer;
pub mod sampler;
pub mod texture;

// Reexports
pub use self::{
    buffer::Buffer2d,
    clip::{ClipBuffers, DEPTH_CLEAR, DEPTH_MAX, DEPTH_MIN, SCREEN_BOUNDS},
    fragment::{Fragment, ProjectedFragment},
    framebuffer::{Framebuffer, RenderBuffer},
    math::{Empty, Varying},
    primitives::{IndexedVertexBuffer, PrimitiveTopology, VertexBuffer},
    program::{FragmentContext, GroupKind, Program, Token},
    renderer::{DrawOptions, FillBias, LineDirection, LineEnds, Renderer, WindingOrder},
    sampler::{Filter, Sampler, WrapMode},
    texture::Texture,
};

#[cfg(feature = "image")]
pub use self::texture::TextureError;
