//! Renders a perspective-tilted, checker-textured quad -- mip level selection included --
//! and writes it to `texture_mapping.png`.

use softras::{
    sampler, DrawOptions, Filter, Fragment, FragmentContext, PrimitiveTopology, Program,
    ProjectedFragment, RenderBuffer, Renderer, Sampler, Texture, Token, VertexBuffer, WrapMode,
};
use vek::*;

struct Textured;

struct TexturedRun<'a> {
    stage: u8,
    ctx: FragmentContext<'a, Vec2<f32>>,
    uniform: &'a (Texture, Sampler),
    output: &'a mut u32,
    uv: Vec2<f32>,
}

impl<'a> Iterator for TexturedRun<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.stage += 1;
        match self.stage {
            // Share the texel coordinate with the quad, then cross the barrier so that
            // derivatives (and with them the mip level) are available.
            1 => Some(sampler::prepare(&self.ctx, &self.uniform.0, self.uv)),
            2 => {
                let c = sampler::sample(&self.ctx, &self.uniform.1, &self.uniform.0, self.uv);
                let rgba = c.map(|e| (e.clamped(0.0, 1.0) * 255.0) as u8);
                *self.output = u32::from_le_bytes([rgba.r, rgba.g, rgba.b, rgba.a]);
                Some(Token::Keep)
            }
            _ => None,
        }
    }
}

impl Program for Textured {
    type Uniform = (Texture, Sampler);
    type Vertex = (Vec4<f32>, Vec2<f32>);
    type Varying = Vec2<f32>;
    type SlotValue = Vec2<f32>;
    type Targets = u32;
    type Tokens<'a> = TexturedRun<'a> where Self: 'a;

    fn vertex(&self, _: &Self::Uniform, (pos, uv): &Self::Vertex) -> Fragment<Vec2<f32>> {
        Fragment::new(*pos, *uv)
    }

    fn fragment<'a>(
        &'a self,
        ctx: FragmentContext<'a, Vec2<f32>>,
        uniform: &'a Self::Uniform,
        input: ProjectedFragment<Vec2<f32>>,
        output: &'a mut u32,
    ) -> Self::Tokens<'a> {
        TexturedRun {
            stage: 0,
            ctx,
            uniform,
            output,
            uv: input.attrs,
        }
    }
}

fn checkerboard() -> Texture {
    let size = 64;
    let texels = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size / 8, i / size / 8);
            if (x + y) % 2 == 0 {
                Rgba::new(240, 220, 180, 255)
            } else {
                Rgba::new(60, 40, 40, 255)
            }
        })
        .collect();
    Texture::from_rgba8([size, size], texels)
}

const W: usize = 640;
const H: usize = 480;

fn main() {
    let uniform = (
        checkerboard(),
        Sampler {
            wrap: WrapMode::Repeat,
            filter: Filter::Linear,
            mip_filter: Filter::Nearest,
        },
    );

    // A ground plane receding towards the horizon: the far corners sit at much larger w, so
    // both the perspective-corrected uvs and the mip selection are visible in the output.
    let quad = |x: f32, z: f32, u: f32, v: f32| {
        let eye = Vec4::new(x, -0.4, z, 1.0);
        let p = Mat4::perspective_fov_lh_zo(1.2, W as f32, H as f32, 0.1, 50.0);
        ((p * eye), Vec2::new(u, v) * 8.0)
    };
    let (a, b, c, d) = (
        quad(-4.0, 0.5, 0.0, 0.0),
        quad(4.0, 0.5, 1.0, 0.0),
        quad(4.0, 20.0, 1.0, 1.0),
        quad(-4.0, 20.0, 0.0, 1.0),
    );
    let buffer = VertexBuffer::new(PrimitiveTopology::Triangles, vec![a, b, c, a, c, d]);

    let mut fb = RenderBuffer::new([W, H], 0xff604020u32);
    Renderer::new().draw(&Textured, &uniform, &buffer, &mut fb, DrawOptions::default());

    let mut bytes = Vec::with_capacity(W * H * 4);
    for y in (0..H).rev() {
        for x in 0..W {
            bytes.extend_from_slice(&fb.color().get([x, y]).to_le_bytes());
        }
    }
    image_::save_buffer(
        "texture_mapping.png",
        &bytes,
        W as u32,
        H as u32,
        image_::ColorType::Rgba8,
    )
    .unwrap();
    println!("wrote texture_mapping.png");
}
