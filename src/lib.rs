//! # Lightmap Pass
//!
//! **Vertex transform and draw pass for lightmapped static geometry.**
//!
//! Every vertex carries a position and two texture coordinate sets: one for
//! the diffuse texture and one for the baked lightmap. The vertex stage takes
//! it through model, view, projection and a fixed clip-space adjustment, and
//! passes both coordinate sets through untouched.
//!
//! The same transform runs on the CPU through [`transform_vertex`], so the
//! math can be checked without a GPU.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lightmap_pass::{ViewerConfig, run_viewer};
//!
//! fn main() {
//!     env_logger::init();
//!
//!     let config = ViewerConfig::new().title("Room").spin_speed(0.5);
//!     if let Err(e) = run_viewer(config, "models/room.pol") {
//!         eprintln!("{}", e);
//!     }
//! }
//! ```
//!
//! ## Layout
//!
//! - [`transform`](TransformBlock): the uniform block and the CPU vertex stage.
//! - [`shader`]: the WGSL source and its binding and location numbers.
//! - [`LightmapPass`]: the wgpu pipeline drawing [`Mesh`]es with a [`Material`].
//! - [`pol`]: the binary POL model reader.
//! - [`ModelScene`]: a loaded model split into one part per material.

mod app;
mod camera;
mod geometry;
mod gpu;
mod lightmap_pass;
mod material;
mod mesh;
pub mod pol;
mod scene;
pub mod shader;
mod texture;
mod transform;

pub use app::{ViewerConfig, ViewerError, run_viewer};
pub use camera::Camera;
pub use geometry::{GeometryError, RawGeometry};
pub use gpu::{GpuContext, GpuError};
pub use lightmap_pass::{LightmapDraw, LightmapPass, Material, draw_block};
pub use material::{MaterialDesc, MaterialKind, resolve_texture_path};
pub use mesh::{LightmapVertex, Mesh, Transform};
pub use scene::{ModelScene, ScenePart};
pub use texture::{Texture, TextureError};
pub use transform::{
    CLIP_ADJUST, TransformBlock, VertexInput, VertexOutput, row_mul, transform_vertex,
    transform_vertices,
};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
