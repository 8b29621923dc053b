//! Renders a colour-interpolated triangle and writes it to `triangle.png`.

use softras::{
    DrawOptions, Fragment, FragmentContext, PrimitiveTopology, Program, ProjectedFragment,
    RenderBuffer, Renderer, Token, VertexBuffer,
};
use vek::*;

struct Triangle;

impl Program for Triangle {
    type Uniform = ();
    type Vertex = (Vec4<f32>, Vec3<f32>);
    type Varying = Vec3<f32>;
    type SlotValue = f32;
    type Targets = u32;
    type Tokens<'a> = core::iter::Once<Token> where Self: 'a;

    #[inline(always)]
    fn vertex(&self, _: &(), (pos, color): &Self::Vertex) -> Fragment<Vec3<f32>> {
        Fragment::new(*pos, *color)
    }

    #[inline(always)]
    fn fragment<'a>(
        &'a self,
        _: FragmentContext<'a, f32>,
        _: &'a (),
        input: ProjectedFragment<Vec3<f32>>,
        output: &'a mut u32,
    ) -> Self::Tokens<'a> {
        let rgb = input.attrs.map(|e| (e.clamped(0.0, 1.0) * 255.0) as u8);
        *output = u32::from_le_bytes([rgb.x, rgb.y, rgb.z, 255]);
        core::iter::once(Token::Keep)
    }
}

const W: usize = 640;
const H: usize = 480;

fn main() {
    let mut fb = RenderBuffer::new([W, H], 0xff000000u32);
    let buffer = VertexBuffer::new(
        PrimitiveTopology::Triangles,
        vec![
            (Vec4::new(-0.8, -0.8, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
            (Vec4::new(0.8, -0.8, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
            (Vec4::new(0.0, 0.8, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)),
        ],
    );

    Renderer::new().draw(&Triangle, &(), &buffer, &mut fb, DrawOptions::default());

    // The framebuffer's origin is bottom-left; image files want rows top-down.
    let mut bytes = Vec::with_capacity(W * H * 4);
    for y in (0..H).rev() {
        for x in 0..W {
            bytes.extend_from_slice(&fb.color().get([x, y]).to_le_bytes());
        }
    }
    image_::save_buffer(
        "triangle.png",
        &bytes,
        W as u32,
        H as u32,
        image_::ColorType::Rgba8,
    )
    .unwrap();
    println!("wrote triangle.png");
}
