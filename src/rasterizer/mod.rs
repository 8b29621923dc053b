//! Scanline rasterizers operating on window-space fragments.
//!
//! Both rasterizers come in two flavours: a plain one that hands over one fragment at a time,
//! and a grouped one that emits fragments together with their neighbours (pairs along a line,
//! aligned 2x2 quads for triangles) so that the fragment shader can take finite-difference
//! derivatives. In the grouped flavours, fragments outside the primitive are still produced --
//! flagged off in the coverage mask -- because their extrapolated values are exactly what the
//! neighbouring real fragments need.

pub mod lines;
pub mod triangles;

pub use self::lines::{line, line_pairs};
pub use self::triangles::{triangle, triangle_quads};
