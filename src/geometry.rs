//! CPU-side lightmapped geometry, built from POL materials.
//!
//! A POL mesh shares one vertex array between all of its materials. Each
//! material is drawn separately, so [`RawGeometry::from_pol_material`]
//! extracts just the vertices a material's triangles reference and renumbers
//! them in first-use order.
//!
//! ```
//! use lightmap_pass::RawGeometry;
//! use lightmap_pass::pol::{PolMaterial, PolMesh, PolVertex, VertexFormat};
//!
//! let vertex = |x: f32| PolVertex {
//!     position: [x, 0.0, 0.0],
//!     normal: None,
//!     texcoord: [x, 0.0],
//!     texcoord2: None,
//! };
//! let mesh = PolMesh {
//!     aabb_min: [0.0; 3],
//!     aabb_max: [3.0; 3],
//!     vertex_format: VertexFormat(0x11),
//!     vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0), vertex(3.0)],
//!     materials: vec![],
//! };
//! let material = PolMaterial {
//!     flags: 0,
//!     color: vec![],
//!     shininess: 0.0,
//!     texture_names: vec!["a.tga".into()],
//!     triangles: vec![[3, 1, 3]],
//! };
//!
//! let geometry = RawGeometry::from_pol_material(&mesh, &material)?;
//! assert_eq!(geometry.vertices.len(), 2);
//! assert_eq!(geometry.indices, vec![0, 1, 0]);
//! # Ok::<(), lightmap_pass::GeometryError>(())
//! ```

use crate::gpu::GpuContext;
use crate::mesh::{LightmapVertex, Mesh};
use crate::pol::{PolError, PolMaterial, PolMesh};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur when loading geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Unknown geometry format: '{0}'")]
    UnknownFormat(String),
    #[error("POL error: {0}")]
    Pol(#[from] PolError),
}

/// Geometry before GPU upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub vertices: Vec<LightmapVertex>,
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Builds the geometry drawn by one material of a POL mesh.
    ///
    /// The lightmap coordinate is the vertex's second texture coordinate;
    /// vertices without one reuse the diffuse coordinate.
    pub fn from_pol_material(
        mesh: &PolMesh,
        material: &PolMaterial,
    ) -> Result<Self, GeometryError> {
        let mut remap: HashMap<u16, u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut indices = Vec::with_capacity(material.triangles.len() * 3);

        for &index in material.triangles.iter().flatten() {
            let mapped = match remap.get(&index) {
                Some(&mapped) => mapped,
                None => {
                    let v = mesh.vertices.get(usize::from(index)).ok_or(
                        PolError::IndexOutOfRange {
                            index,
                            vertex_count: mesh.vertices.len() as u32,
                        },
                    )?;
                    let mapped = vertices.len() as u32;
                    vertices.push(LightmapVertex::new(
                        v.position,
                        v.texcoord,
                        v.texcoord2.unwrap_or(v.texcoord),
                    ));
                    remap.insert(index, mapped);
                    mapped
                }
            };
            indices.push(mapped);
        }

        Ok(Self { vertices, indices })
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}
