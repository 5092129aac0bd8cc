//! A loaded model, split into one drawable part per material.

use crate::geometry::{GeometryError, RawGeometry};
use crate::material::MaterialDesc;
use crate::mesh::Transform;
use crate::pol::PolFile;
use glam::Vec3;
use std::path::{Path, PathBuf};

/// Geometry, material and placement of one material's worth of triangles.
#[derive(Clone, Debug)]
pub struct ScenePart {
    pub geometry: RawGeometry,
    pub material: MaterialDesc,
    pub transform: Transform,
}

#[derive(Clone, Debug)]
pub struct ModelScene {
    pub path: PathBuf,
    pub parts: Vec<ScenePart>,
}

impl ModelScene {
    /// Loads a model file, choosing the reader from the extension.
    ///
    /// Every part starts translated by `offset`.
    pub fn load(path: impl AsRef<Path>, offset: Vec3) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pol" => {
                let pol = PolFile::open(path)?;
                let scene = Self::from_pol(path, &pol, offset)?;
                log::info!("loaded {:?}: {} parts", path, scene.parts.len());
                Ok(scene)
            }
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }

    /// Builds parts from an already parsed POL file.
    ///
    /// `path` is only used to resolve texture names. Materials without
    /// triangles are skipped.
    pub fn from_pol(path: &Path, pol: &PolFile, offset: Vec3) -> Result<Self, GeometryError> {
        let mut parts = Vec::new();

        for (mesh_index, mesh) in pol.meshes.iter().enumerate() {
            for material in &mesh.materials {
                let geometry = RawGeometry::from_pol_material(mesh, material)?;
                if geometry.is_empty() {
                    log::debug!("mesh {}: skipping material with no triangles", mesh_index);
                    continue;
                }

                parts.push(ScenePart {
                    geometry,
                    material: MaterialDesc::from_texture_names(path, &material.texture_names),
                    transform: Transform::from_position(offset),
                });
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            parts,
        })
    }

    /// Spins every part about its own Y axis.
    ///
    /// Positive `spin_speed` turns clockwise seen from above.
    pub fn update(&mut self, dt: f32, spin_speed: f32) {
        for part in &mut self.parts {
            part.transform.rotate_local(Vec3::Y, -spin_speed * dt);
        }
    }
}
