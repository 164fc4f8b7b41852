//! GPU textures: depth buffers, shadow maps, render targets and image maps.
//!
//! Every texture here is a single 2D level. Colour maps are sampled with
//! wrapping coordinates, depth textures with a depth comparison so the same
//! texture type serves as shadow map.

use anyhow::Context;
use image::GenericImageView;

/// A GPU texture with its default view and, for sampled textures, the
/// sampler shaders should use with it.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// Flat normal pointing out of the surface, with mid height in alpha.
const FLAT_NORMAL_TEXEL: [u8; 4] = [128, 128, 255, 128];

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment that can also be bound for comparison sampling.
    ///
    /// Zero sized requests are bumped to one texel.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let texture = new_2d(
            device,
            label,
            extent(size),
            Self::DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_max_clamp: 100.0,
            ..Default::default()
        });
        Self::with_sampler(texture, sampler)
    }

    /// Colour texture that is rendered into by one pass and sampled by a later one.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = new_2d(
            device,
            label,
            extent(size),
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        Self::with_sampler(texture, create_default_sampler(device))
    }

    /// Normal map standing in for models that have none.
    pub fn create_default_normal_map(
        width: u32,
        height: u32,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Texture {
        let texels: Vec<u8> = FLAT_NORMAL_TEXEL
            .iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .copied()
            .collect();
        Self::from_rgba(
            device,
            queue,
            &texels,
            [width, height],
            wgpu::TextureFormat::Rgba8Unorm,
            "Flat Normal Map",
        )
    }

    /// Decode an image file held in memory and upload it.
    ///
    /// # Arguments
    ///
    /// * `bytes` are the raw file contents; the image format is guessed
    ///   from them
    /// * `label` is used as a debug name for the GPU resource and in errors
    /// * `is_normal_map` keeps the texels linear instead of sRGB
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        is_normal_map: bool,
    ) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes)
            .with_context(|| format!("could not decode {label}"))?;
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(
            device,
            queue,
            &img.to_rgba8(),
            [width, height],
            format,
            label,
        ))
    }

    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = extent(size);
        let texture = new_2d(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        Self::with_sampler(texture, create_default_sampler(device))
    }

    fn with_sampler(texture: wgpu::Texture, sampler: wgpu::Sampler) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(sampler),
        }
    }

    pub fn sampler_or_default(&self, device: &wgpu::Device) -> wgpu::Sampler {
        self.sampler
            .clone()
            .unwrap_or_else(|| create_default_sampler(device))
    }
}

fn extent(size: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    }
}

fn new_2d(
    device: &wgpu::Device,
    label: &str,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Trilinear sampler with wrapping coordinates.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
