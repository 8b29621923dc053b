//! Renders a depth-tested cube wireframe with line loops and writes it to `wireframe.png`.

use softras::{
    DrawOptions, Fragment, FragmentContext, LineEnds, PrimitiveTopology, Program,
    ProjectedFragment, RenderBuffer, Renderer, Token, VertexBuffer,
};
use vek::*;

struct Wireframe {
    color: Vec3<f32>,
}

impl Program for Wireframe {
    type Uniform = Mat4<f32>;
    type Vertex = Vec3<f32>;
    type Varying = f32;
    type SlotValue = f32;
    type Targets = u32;
    type Tokens<'a> = core::iter::Once<Token> where Self: 'a;

    #[inline(always)]
    fn vertex(&self, mvp: &Mat4<f32>, pos: &Self::Vertex) -> Fragment<f32> {
        // The zo projection maps the near plane to depth 0, and the strictly-less depth test
        // keeps the smallest depth, so the nearer line survives at crossings.
        Fragment::new(*mvp * Vec4::from_point(*pos), 1.0 - pos.z * 0.25)
    }

    #[inline(always)]
    fn fragment<'a>(
        &'a self,
        _: FragmentContext<'a, f32>,
        _: &'a Mat4<f32>,
        input: ProjectedFragment<f32>,
        output: &'a mut u32,
    ) -> Self::Tokens<'a> {
        let rgb = (self.color * input.attrs).map(|e| (e.clamped(0.0, 1.0) * 255.0) as u8);
        *output = u32::from_le_bytes([rgb.x, rgb.y, rgb.z, 255]);
        core::iter::once(Token::Keep)
    }
}

const W: usize = 640;
const H: usize = 480;

fn main() {
    let mut fb = RenderBuffer::new([W, H], 0xff101010u32);
    let renderer = Renderer::new();

    let p = Mat4::perspective_fov_lh_zo(1.1, W as f32, H as f32, 0.1, 20.0);
    let v = Mat4::<f32>::translation_3d(Vec3::new(0.0, 0.0, 4.0));
    let m = Mat4::rotation_x(0.5) * Mat4::rotation_y(0.7);
    let mvp = p * v * m;

    let ring = |z: f32| {
        VertexBuffer::new(
            PrimitiveTopology::LineLoop,
            vec![
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ],
        )
    };
    let struts = VertexBuffer::new(
        PrimitiveTopology::Lines,
        vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
    );

    // Interior loop joints are plotted once by excluding line starts.
    let options = DrawOptions {
        line_ends: LineEnds::End,
        ..DrawOptions::default()
    };
    let front = Wireframe {
        color: Vec3::new(0.95, 0.85, 0.4),
    };
    renderer.draw(&front, &mvp, &ring(-1.0), &mut fb, options);
    renderer.draw(&front, &mvp, &ring(1.0), &mut fb, options);
    renderer.draw(&front, &mvp, &struts, &mut fb, DrawOptions::default());

    let mut bytes = Vec::with_capacity(W * H * 4);
    for y in (0..H).rev() {
        for x in 0..W {
            bytes.extend_from_slice(&fb.color().get([x, y]).to_le_bytes());
        }
    }
    image_::save_buffer(
        "wireframe.png",
        &bytes,
        W as u32,
        H as u32,
        image_::ColorType::Rgba8,
    )
    .unwrap();
    println!("wrote wireframe.png");
}
