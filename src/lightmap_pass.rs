//! Render pass for lightmapped meshes.
//!
//! [`LightmapPass`] owns the pipeline built from `shaders/lightmap.wgsl` and a
//! uniform buffer holding one [`TransformBlock`](crate::TransformBlock) per
//! draw.
//!
//! The clip adjustment writes `0.5 · w` to every depth, so there is no depth
//! attachment: draws land in the order they are submitted.
//!
//! # Bind Groups
//!
//! - **Group 0**: transform block at binding 0, bound with a dynamic offset
//!   per draw
//! - **Group 1**: diffuse texture and sampler (bindings 0, 1), lightmap
//!   texture and sampler (bindings 2, 3)
//!
//! # Usage
//!
//! ```ignore
//! let mut pass = LightmapPass::new(&gpu);
//! let material = pass.create_material(&gpu, Some(&diffuse), Some(&lightmap));
//!
//! let draws = [LightmapDraw { mesh: &mesh, transform, material: &material }];
//! pass.prepare(&gpu, &camera, &draws);
//! // inside a render pass with a single color attachment
//! pass.render(&mut render_pass, &draws);
//! ```

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::mesh::{LightmapVertex, Mesh, Transform};
use crate::shader::{
    DIFFUSE_SAMPLER_BINDING, DIFFUSE_TEXTURE_BINDING, FRAGMENT_ENTRY, LIGHTMAP_SAMPLER_BINDING,
    LIGHTMAP_TEXTURE_BINDING, LIGHTMAP_WGSL, MATERIAL_GROUP, TRANSFORM_BINDING, TRANSFORM_GROUP,
    VERTEX_ENTRY,
};
use crate::texture::Texture;
use crate::transform::TransformBlock;
use glam::{Mat4, Vec4};

const BLOCK_SIZE: u64 = std::mem::size_of::<TransformBlock>() as u64;
const INITIAL_CAPACITY: usize = 64;

/// A bound diffuse + lightmap texture pair.
pub struct Material {
    bind_group: wgpu::BindGroup,
}

/// One mesh instance to draw this frame.
pub struct LightmapDraw<'a> {
    pub mesh: &'a Mesh,
    pub transform: Transform,
    pub material: &'a Material,
}

/// Undoes the Y flip of the clip adjustment; wgpu's clip space is Y-up.
const Y_UP: Mat4 = Mat4::from_cols(Vec4::X, Vec4::NEG_Y, Vec4::Z, Vec4::W);

/// The transform block for one draw.
///
/// The projection is mirrored in Y so that, after the clip adjustment, world
/// up is screen up.
pub fn draw_block(camera: &Camera, aspect: f32, transform: &Transform) -> TransformBlock {
    TransformBlock::from_column_convention(
        transform.matrix(),
        camera.view_matrix(),
        Y_UP * camera.projection_matrix(aspect),
    )
}

/// Rounds the block size up to the device's dynamic offset alignment.
fn block_stride(alignment: u32) -> u64 {
    let alignment = u64::from(alignment.max(1));
    BLOCK_SIZE.div_ceil(alignment) * alignment
}

/// Lays blocks out `stride` bytes apart, zero-filling the gaps.
fn pack_blocks(blocks: &[TransformBlock], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; blocks.len() * stride];
    for (chunk, block) in bytes.chunks_exact_mut(stride).zip(blocks) {
        chunk[..BLOCK_SIZE as usize].copy_from_slice(bytemuck::bytes_of(block));
    }
    bytes
}

pub struct LightmapPass {
    pipeline: wgpu::RenderPipeline,
    transform_layout: wgpu::BindGroupLayout,
    transform_buffer: wgpu::Buffer,
    transform_bind_group: wgpu::BindGroup,
    capacity: usize,
    stride: u64,
    prepared: usize,
    material_layout: wgpu::BindGroupLayout,
    white: Texture,
}

impl LightmapPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lightmap Shader"),
            source: wgpu::ShaderSource::Wgsl(LIGHTMAP_WGSL.into()),
        });

        let stride = block_stride(device.limits().min_uniform_buffer_offset_alignment);

        let transform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: TRANSFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(BLOCK_SIZE),
                },
                count: None,
            }],
        });

        let (transform_buffer, transform_bind_group) =
            Self::create_transform_buffer(gpu, &transform_layout, INITIAL_CAPACITY, stride);

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lightmap Material Bind Group Layout"),
            entries: &[
                texture_entry(DIFFUSE_TEXTURE_BINDING),
                sampler_entry(DIFFUSE_SAMPLER_BINDING),
                texture_entry(LIGHTMAP_TEXTURE_BINDING),
                sampler_entry(LIGHTMAP_SAMPLER_BINDING),
            ],
        });

        // Slice order is group order: TRANSFORM_GROUP, then MATERIAL_GROUP.
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lightmap Pipeline Layout"),
            bind_group_layouts: &[&transform_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lightmap Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[LightmapVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let white = Texture::white(gpu);

        log::debug!("lightmap pass ready (block stride {} bytes)", stride);

        Self {
            pipeline,
            transform_layout,
            transform_buffer,
            transform_bind_group,
            capacity: INITIAL_CAPACITY,
            stride,
            prepared: 0,
            material_layout,
            white,
        }
    }

    fn create_transform_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
        stride: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Transform Blocks"),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: TRANSFORM_BINDING,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(BLOCK_SIZE),
                }),
            }],
        });

        (buffer, bind_group)
    }

    /// Binds a diffuse texture and a lightmap.
    ///
    /// A missing texture is replaced by white, so a material without a
    /// lightmap renders its diffuse texture unlit.
    pub fn create_material(
        &self,
        gpu: &GpuContext,
        diffuse: Option<&Texture>,
        lightmap: Option<&Texture>,
    ) -> Material {
        let diffuse = diffuse.unwrap_or(&self.white);
        let lightmap = lightmap.unwrap_or(&self.white);

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lightmap Material Bind Group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: DIFFUSE_TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: DIFFUSE_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: LIGHTMAP_TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&lightmap.view),
                },
                wgpu::BindGroupEntry {
                    binding: LIGHTMAP_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&lightmap.sampler),
                },
            ],
        });

        Material { bind_group }
    }

    /// Uploads one transform block per draw.
    ///
    /// Must be called before [`render`](Self::render) with the same draws.
    pub fn prepare(&mut self, gpu: &GpuContext, camera: &Camera, draws: &[LightmapDraw]) {
        if draws.len() > self.capacity {
            let capacity = draws.len().next_power_of_two();
            let (buffer, bind_group) =
                Self::create_transform_buffer(gpu, &self.transform_layout, capacity, self.stride);
            self.transform_buffer = buffer;
            self.transform_bind_group = bind_group;
            self.capacity = capacity;
            log::debug!("transform buffer grown to {} draws", capacity);
        }

        let aspect = gpu.aspect();
        let blocks: Vec<TransformBlock> = draws
            .iter()
            .map(|d| draw_block(camera, aspect, &d.transform))
            .collect();

        if !blocks.is_empty() {
            gpu.queue
                .write_buffer(&self.transform_buffer, 0, &pack_blocks(&blocks, self.stride));
        }
        self.prepared = blocks.len();
    }

    /// Records the draws into `render_pass`.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass, draws: &[LightmapDraw]) {
        if draws.len() > self.prepared {
            log::warn!(
                "{} draws submitted but only {} prepared; extra draws skipped",
                draws.len(),
                self.prepared
            );
        }

        render_pass.set_pipeline(&self.pipeline);

        for (i, draw) in draws.iter().take(self.prepared).enumerate() {
            let offset = (i as u64 * self.stride) as u32;
            render_pass.set_bind_group(TRANSFORM_GROUP, &self.transform_bind_group, &[offset]);
            render_pass.set_bind_group(MATERIAL_GROUP, &draw.material.bind_group, &[]);
            render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
    }
}
