//! The lightmap vertex transform stage.
//!
//! This module is the CPU reference for the `vs` entry point in
//! `shaders/lightmap.wgsl`. Both compute exactly the same thing:
//!
//! ```text
//! clip_position  = [position, 1] × model × view × proj × CLIP_ADJUST
//! out_texcoord_0 = in_texcoord_0
//! out_texcoord_1 = in_texcoord_1
//! ```
//!
//! # Row-Vector Convention
//!
//! The position is a *row* vector multiplied on the left of each matrix, and
//! the matrices are applied left-to-right. This is the transpose of glam's
//! usual `matrix * vector` convention. [`row_mul`] computes `v × M` the way
//! WGSL evaluates `vec4 * mat4x4`: component `j` of the result is the dot
//! product of `v` with column `j` of `M`.
//!
//! Matrices are uploaded with [`Mat4::to_cols_array_2d`], so the CPU and GPU
//! read the same bytes and agree on every component. Mixing conventions (for
//! example writing `proj * view * model * v` on one side only) silently
//! transposes the whole chain.
//!
//! # Example
//!
//! ```
//! use lightmap_pass::{TransformBlock, VertexInput, transform_vertex};
//! use glam::{Vec2, Vec3, Vec4};
//!
//! let block = TransformBlock::IDENTITY;
//! let input = VertexInput::new(Vec3::new(1.0, 2.0, 3.0), Vec2::ZERO, Vec2::ONE);
//! let out = transform_vertex(&block, &input);
//!
//! assert_eq!(out.clip_position, Vec4::new(1.0, -2.0, 0.5, 1.0));
//! assert_eq!(out.texcoord1, Vec2::ONE);
//! ```

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Constant applied after the model/view/projection chain.
///
/// Under the row-vector convention `[x, y, z, 1] × CLIP_ADJUST` is
/// `[x, -y, 0.5, 1]`: Y is flipped and depth is pinned to the middle of the
/// `[0, 1]` range. Written as rows, row `i` scaling input component `i`:
///
/// ```text
/// ( 1,  0,   0, 0)
/// ( 0, -1,   0, 0)
/// ( 0,  0,   0, 0)
/// ( 0,  0, 0.5, 1)
/// ```
///
/// glam stores columns, so the same matrix is built from its columns here.
/// `shaders/lightmap.wgsl` declares the identical constant.
pub const CLIP_ADJUST: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 0.5),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

const IDENTITY_COLS: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Model, view and projection matrices shared by every vertex of a draw.
///
/// Bound at group 0, binding 0 of the lightmap pipeline. The field order is
/// part of the GPU ABI and must not change. Each matrix is stored
/// column-major, as produced by [`Mat4::to_cols_array_2d`].
///
/// Each field is 64 bytes, so the block is 192 bytes with no padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformBlock {
    /// Object to world.
    pub model: [[f32; 4]; 4],
    /// World to camera.
    pub view: [[f32; 4]; 4],
    /// Camera to pre-adjust clip space.
    pub proj: [[f32; 4]; 4],
}

impl TransformBlock {
    /// All three matrices set to identity.
    pub const IDENTITY: Self = Self {
        model: IDENTITY_COLS,
        view: IDENTITY_COLS,
        proj: IDENTITY_COLS,
    };

    pub fn new(model: Mat4, view: Mat4, proj: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
        }
    }

    /// Builds a block from matrices written for glam's `matrix * vector`
    /// convention, such as [`Mat4::look_at_rh`] or [`Mat4::perspective_rh`].
    ///
    /// Each matrix is transposed so that the row-vector chain in the shader
    /// computes `proj * view * model * p`.
    pub fn from_column_convention(model: Mat4, view: Mat4, proj: Mat4) -> Self {
        Self::new(model.transpose(), view.transpose(), proj.transpose())
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.proj)
    }
}

impl Default for TransformBlock {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Per-vertex attributes consumed by the stage.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexInput {
    /// Object-space position (location 0).
    pub position: Vec3,
    /// Diffuse texture coordinate (location 2).
    pub texcoord0: Vec2,
    /// Lightmap texture coordinate (location 3).
    pub texcoord1: Vec2,
}

impl VertexInput {
    pub fn new(position: Vec3, texcoord0: Vec2, texcoord1: Vec2) -> Self {
        Self {
            position,
            texcoord0,
            texcoord1,
        }
    }
}

/// What the stage hands to the rasterizer and the fragment stage.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexOutput {
    /// Clip-space position, before perspective division.
    pub clip_position: Vec4,
    /// Forwarded diffuse coordinate (output location 0).
    pub texcoord0: Vec2,
    /// Forwarded lightmap coordinate (output location 1).
    pub texcoord1: Vec2,
}

/// Row vector times matrix: `v × m`.
///
/// Matches WGSL's `vec4<f32> * mat4x4<f32>`.
#[inline]
pub fn row_mul(v: Vec4, m: &Mat4) -> Vec4 {
    Vec4::new(
        v.dot(m.x_axis),
        v.dot(m.y_axis),
        v.dot(m.z_axis),
        v.dot(m.w_axis),
    )
}

/// Runs the vertex stage for one vertex.
///
/// Total and pure: no validation, no clamping. Singular or non-finite
/// matrices produce NaN/Inf in the clip position and nothing else.
pub fn transform_vertex(block: &TransformBlock, input: &VertexInput) -> VertexOutput {
    let p = input.position.extend(1.0);
    let p = row_mul(p, &block.model());
    let p = row_mul(p, &block.view());
    let p = row_mul(p, &block.proj());
    let clip_position = row_mul(p, &CLIP_ADJUST);

    VertexOutput {
        clip_position,
        texcoord0: input.texcoord0,
        texcoord1: input.texcoord1,
    }
}

/// Runs the stage over a batch of vertices sharing one transform block.
pub fn transform_vertices(block: &TransformBlock, inputs: &[VertexInput]) -> Vec<VertexOutput> {
    inputs.iter().map(|v| transform_vertex(block, v)).collect()
}
