//! Lightmapped vertices, GPU meshes and model transforms.
//!
//! - [`LightmapVertex`]: position plus a diffuse and a lightmap coordinate
//! - [`Mesh`]: GPU-resident vertex and index buffers
//! - [`Transform`]: position, rotation and scale of a model instance
//!
//! # Vertex Layout
//!
//! [`LightmapVertex`] uses the following GPU layout (28 bytes per vertex):
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | texcoord0 | Float32x2 | 12     | 2               |
//! | texcoord1 | Float32x2 | 20     | 3               |
//!
//! Location 1 is not bound by this layout.

use crate::gpu::GpuContext;
use crate::shader::{POSITION_LOCATION, TEXCOORD0_LOCATION, TEXCOORD1_LOCATION};
use crate::transform::VertexInput;
use glam::{Mat4, Quat, Vec2, Vec3};

/// A vertex carrying a diffuse and a lightmap texture coordinate.
///
/// # Example
///
/// ```
/// use lightmap_pass::LightmapVertex;
///
/// let v = LightmapVertex::new([0.0, 1.0, 0.0], [0.5, 0.5], [0.25, 0.75]);
/// assert_eq!(std::mem::size_of::<LightmapVertex>(), 28);
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightmapVertex {
    /// Model-space position.
    pub position: [f32; 3],
    /// Diffuse texture coordinate.
    pub texcoord0: [f32; 2],
    /// Lightmap texture coordinate.
    pub texcoord1: [f32; 2],
}

impl LightmapVertex {
    /// The wgpu vertex buffer layout for this vertex type.
    ///
    /// Stride 28, per-vertex step, attributes at locations 0, 2 and 3.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LightmapVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: POSITION_LOCATION,
                format: wgpu::VertexFormat::Float32x3,
            },
            // texcoord0
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: TEXCOORD0_LOCATION,
                format: wgpu::VertexFormat::Float32x2,
            },
            // texcoord1
            wgpu::VertexAttribute {
                offset: 20,
                shader_location: TEXCOORD1_LOCATION,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], texcoord0: [f32; 2], texcoord1: [f32; 2]) -> Self {
        Self {
            position,
            texcoord0,
            texcoord1,
        }
    }

    /// The attributes as the vertex stage sees them.
    pub fn input(&self) -> VertexInput {
        VertexInput::new(
            Vec3::from(self.position),
            Vec2::from(self.texcoord0),
            Vec2::from(self.texcoord1),
        )
    }
}

/// GPU-resident geometry with vertex and index buffers.
///
/// Immutable after creation.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Uploads vertices and `u32` triangle indices.
    pub fn new(gpu: &GpuContext, vertices: &[LightmapVertex], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Lightmap Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Lightmap Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

/// Position, rotation and scale of a model instance.
///
/// [`Transform::matrix`] composes scale, then rotation, then translation.
/// The result is a regular glam matrix (column-vector convention);
/// [`TransformBlock`](crate::TransformBlock) construction takes care of
/// handing it to the row-vector shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Rotates about an axis expressed in the model's own frame.
    pub fn rotate_local(&mut self, axis: Vec3, angle: f32) -> &mut Self {
        let axis = axis.normalize_or_zero();
        if axis != Vec3::ZERO {
            self.rotation = (self.rotation * Quat::from_axis_angle(axis, angle)).normalize();
        }
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
