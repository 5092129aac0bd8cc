//! Material descriptions for lightmapped models.
//!
//! A model material names up to two textures. One texture makes a plain
//! diffuse surface, two make a lightmapped one (diffuse first, lightmap
//! second). Texture names are resolved next to the model file, preferring a
//! `.dds` sibling with the same stem.

use crate::gpu::GpuContext;
use crate::texture::Texture;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    Untextured,
    /// Diffuse only; the lightmap slot is bound to white.
    Simple,
    Lightmap,
}

impl MaterialKind {
    pub fn from_texture_count(count: usize) -> Self {
        match count {
            0 => Self::Untextured,
            1 => Self::Simple,
            _ => Self::Lightmap,
        }
    }
}

/// Where a material's textures live on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub kind: MaterialKind,
    pub diffuse: Option<PathBuf>,
    pub lightmap: Option<PathBuf>,
}

impl MaterialDesc {
    /// Resolves texture names relative to `model_path`.
    ///
    /// Names past the second are ignored.
    pub fn from_texture_names(model_path: &Path, names: &[String]) -> Self {
        let kind = MaterialKind::from_texture_count(names.len());
        let mut paths = names.iter().map(|n| resolve_texture_path(model_path, n));
        let diffuse = paths.next();
        let lightmap = paths.next();

        if names.len() > 2 {
            log::debug!("ignoring {} extra texture names", names.len() - 2);
        }

        Self {
            kind,
            diffuse,
            lightmap,
        }
    }

    /// Uploads the textures, falling back to `None` for any that fail.
    pub fn load(&self, gpu: &GpuContext) -> (Option<Texture>, Option<Texture>) {
        let load = |path: &Option<PathBuf>| {
            let path = path.as_ref()?;
            match Texture::from_file(gpu, path) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("{}; using white", e);
                    None
                }
            }
        };
        (load(&self.diffuse), load(&self.lightmap))
    }
}

/// Resolves a texture name found in a model file.
///
/// `wall.tga` next to `scene/room.pol` becomes `scene/wall.dds` if that file
/// exists, otherwise `scene/wall.tga`.
pub fn resolve_texture_path(model_path: &Path, name: &str) -> PathBuf {
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));

    let Some(stem) = name.split('.').next().filter(|s| !s.is_empty()) else {
        return PathBuf::from(name);
    };

    let dds = dir.join(format!("{}.dds", stem));
    if dds.exists() { dds } else { dir.join(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_texture_count() {
        assert_eq!(MaterialKind::from_texture_count(0), MaterialKind::Untextured);
        assert_eq!(MaterialKind::from_texture_count(1), MaterialKind::Simple);
        assert_eq!(MaterialKind::from_texture_count(2), MaterialKind::Lightmap);
        assert_eq!(MaterialKind::from_texture_count(3), MaterialKind::Lightmap);
    }

    #[test]
    fn prefers_dds_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("room.pol");
        std::fs::write(dir.path().join("wall.dds"), b"").unwrap();

        assert_eq!(
            resolve_texture_path(&model, "wall.tga"),
            dir.path().join("wall.dds")
        );
    }

    #[test]
    fn falls_back_to_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("room.pol");

        assert_eq!(
            resolve_texture_path(&model, "floor.bmp"),
            dir.path().join("floor.bmp")
        );
    }

    #[test]
    fn stem_stops_at_first_dot() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("room.pol");
        std::fs::write(dir.path().join("lm.dds"), b"").unwrap();

        assert_eq!(
            resolve_texture_path(&model, "lm.0.bmp"),
            dir.path().join("lm.dds")
        );
    }

    #[test]
    fn empty_name_is_left_alone() {
        assert_eq!(resolve_texture_path(Path::new("a/b.pol"), ""), PathBuf::new());
    }

    #[test]
    fn desc_splits_diffuse_and_lightmap() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("room.pol");
        let names = vec!["wall.tga".to_string(), "wall_lm.bmp".to_string()];

        let desc = MaterialDesc::from_texture_names(&model, &names);
        assert_eq!(desc.kind, MaterialKind::Lightmap);
        assert_eq!(desc.diffuse, Some(dir.path().join("wall.tga")));
        assert_eq!(desc.lightmap, Some(dir.path().join("wall_lm.bmp")));

        let simple = MaterialDesc::from_texture_names(&model, &names[..1]);
        assert_eq!(simple.kind, MaterialKind::Simple);
        assert_eq!(simple.lightmap, None);
    }
}
