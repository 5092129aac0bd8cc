use crate::gpu::GpuContext;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A GPU texture that can be bound to the lightmap material group.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Linear: lightmaps are a handful of texels per surface.
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// A 1x1 opaque white texture.
    ///
    /// Bound in place of a missing lightmap (or diffuse map) so the shader's
    /// multiply leaves the other term unchanged.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &WHITE_PIXEL, 1, 1, "White Texture")
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let (data, width, height) = decode_rgba(path)?;
        Ok(Self::from_rgba(
            gpu,
            &data,
            width,
            height,
            &path.display().to_string(),
        ))
    }
}

pub(crate) const WHITE_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// Decodes an image file to tightly packed RGBA8.
pub(crate) fn decode_rgba(path: &Path) -> Result<(Vec<u8>, u32, u32), TextureError> {
    let img = image::open(path)
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok((img.into_raw(), width, height))
}
