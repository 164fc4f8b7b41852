#![allow(dead_code)]

use cgmath::Vector3;
use parallax_ngin::{
    data_structures::light::{LightAnimation, LightKind},
    scene::description::{LightDesc, SceneDescription, ShadowDesc},
};

/// A scene with nothing to load from disk: no entities, one spot light
/// casting the shadow and the demo portal.
pub(crate) fn bare_scene(background: wgpu::Color) -> SceneDescription {
    SceneDescription {
        entities: Vec::new(),
        lights: vec![LightDesc {
            kind: LightKind::Spot {
                cone: cgmath::Rad(0.52),
            },
            colour: Vector3::new(1.0, 1.0, 1.0),
            intensity: 50.0,
            direction: Vector3::new(0.0, -1.0, 0.0),
            model: None,
            animation: LightAnimation::None,
        }],
        background,
        shadow: Some(ShadowDesc {
            light: 0,
            size: 512,
            cone: cgmath::Deg(90.0).into(),
            near_clip: 0.1,
            far_clip: 1000.0,
        }),
        ..Default::default()
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) mod gpu {
    use instant::Duration;
    use parallax_ngin::{context::InitContext, data_structures::texture::Texture};

    pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    // Rows of the readback buffer must be 256 byte aligned
    pub(crate) const TARGET_SIZE: u32 = 256;

    pub(crate) async fn headless() -> InitContext {
        InitContext::headless(TARGET_FORMAT)
            .await
            .expect("Integration tests need a graphics adapter")
    }

    pub(crate) struct RenderTarget {
        pub(crate) colour: wgpu::Texture,
        pub(crate) colour_view: wgpu::TextureView,
        pub(crate) depth: Texture,
    }

    impl RenderTarget {
        pub(crate) fn new(gpu: &InitContext) -> Self {
            let colour = gpu.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Test Output Texture"),
                size: extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let colour_view = colour.create_view(&wgpu::TextureViewDescriptor::default());
            let depth =
                Texture::create_depth_texture(&gpu.device, [TARGET_SIZE, TARGET_SIZE], "Test Depth");
            Self {
                colour,
                colour_view,
                depth,
            }
        }

        pub(crate) async fn read_pixels(
            &self,
            gpu: &InitContext,
        ) -> image::ImageBuffer<image::Rgba<u8>, Vec<u8>> {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * TARGET_SIZE * TARGET_SIZE) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Test Output Buffer"),
                mapped_at_creation: false,
            });
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Readback Encoder"),
                });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &self.colour,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * TARGET_SIZE),
                        rows_per_image: Some(TARGET_SIZE),
                    },
                },
                extent(),
            );
            gpu.queue.submit(std::iter::once(encoder.finish()));

            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).unwrap();
            });
            gpu.device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: Some(Duration::from_secs(3)),
                })
                .unwrap();
            rx.receive().await.unwrap().unwrap();
            let data = buffer_slice.get_mapped_range().to_vec();
            image::ImageBuffer::from_raw(TARGET_SIZE, TARGET_SIZE, data).unwrap()
        }
    }

    fn extent() -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: TARGET_SIZE,
            height: TARGET_SIZE,
            depth_or_array_layers: 1,
        }
    }

    pub(crate) fn to_pixel(colour: wgpu::Color) -> image::Rgba<u8> {
        let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        image::Rgba([
            f_to_u8(colour.r),
            f_to_u8(colour.g),
            f_to_u8(colour.b),
            f_to_u8(colour.a),
        ])
    }

    /// A unit quad in the XY plane facing -Z, with texture coordinates.
    pub(crate) const QUAD_OBJ: &str = "\
o Quad
v -1.0 -1.0 0.0
v -1.0 1.0 0.0
v 1.0 1.0 0.0
v 1.0 -1.0 0.0
vn 0.0 0.0 -1.0
vt 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    /// Write a quad mesh and a plain `colour` texture into a fresh temporary
    /// folder and return their absolute paths.
    pub(crate) fn write_quad_assets(test_name: &str, colour: [u8; 4]) -> (String, String) {
        let dir = std::env::temp_dir().join(format!(
            "parallax-ngin-{}-{test_name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let mesh = dir.join("quad.obj");
        std::fs::write(&mesh, QUAD_OBJ).unwrap();
        let texture = dir.join("plain.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba(colour))
            .save(&texture)
            .unwrap();
        (
            mesh.to_string_lossy().into_owned(),
            texture.to_string_lossy().into_owned(),
        )
    }
}
