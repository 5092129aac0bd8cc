//! Reader for `.pol` static scene models.
//!
//! POL files hold one or more meshes, each with its own vertex array and a
//! list of materials. Every material names its textures (a diffuse texture
//! and, for lightmapped surfaces, a lightmap) and owns its triangles.
//!
//! # Layout
//!
//! All values are little-endian.
//!
//! ```text
//! "POLY"                      magic
//! u32                         version
//! u32                         mesh count
//! [u8; 52] × mesh count       geometry node descriptors
//! if version > 100:
//!   u32                       node record count
//!   node records              [u8; 32], f32 × 16, u32, u32 len, [u8; len]
//! meshes × mesh count
//! ```
//!
//! A mesh is two `f32 × 3` bounds, an `i32` vertex format word, a vertex
//! count, the vertices, then a material count and the materials. See
//! [`VertexFormat`] for the vertex encoding.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const MAGIC: [u8; 4] = *b"POLY";
const NODE_DESC_SIZE: usize = 52;
const NODE_RECORD_HEADER_SIZE: usize = 32;
const MATERIAL_COLOR_SIZE: usize = 64;
const NAME_SIZE: usize = 64;
const MAX_SHININESS: f32 = 128.0;

/// Errors produced while reading a POL file.
#[derive(Debug, Error)]
pub enum PolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a POL file (magic {0:02x?})")]
    BadMagic([u8; 4]),
    #[error("vertex format {0:#x} has no {1}")]
    MissingAttribute(u32, &'static str),
    #[error("unsupported raw vertex format {0:#x}")]
    UnsupportedVertexFormat(i32),
    #[error("texture name is not valid UTF-8")]
    InvalidName(#[from] std::string::FromUtf8Error),
    #[error("triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: u32 },
}

/// Bit set describing which components a POL vertex carries.
///
/// Components are stored in bit order, lowest bit first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexFormat(pub u32);

impl VertexFormat {
    pub const POSITION: u32 = 0x1;
    pub const NORMAL: u32 = 0x2;
    pub const EXTRA_4: u32 = 0x4;
    pub const EXTRA_8: u32 = 0x8;
    pub const TEXCOORD: u32 = 0x10;
    pub const TEXCOORD2: u32 = 0x20;
    pub const EXTRA_40: u32 = 0x40;
    pub const EXTRA_80: u32 = 0x80;
    pub const EXTRA_100: u32 = 0x100;

    pub fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Size in bytes of one vertex with this format.
    pub fn stride(self) -> usize {
        const SIZES: [(u32, usize); 9] = [
            (VertexFormat::POSITION, 12),
            (VertexFormat::NORMAL, 12),
            (VertexFormat::EXTRA_4, 4),
            (VertexFormat::EXTRA_8, 4),
            (VertexFormat::TEXCOORD, 8),
            (VertexFormat::TEXCOORD2, 8),
            (VertexFormat::EXTRA_40, 8),
            (VertexFormat::EXTRA_80, 8),
            (VertexFormat::EXTRA_100, 16),
        ];

        SIZES
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, size)| size)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolVertex {
    pub position: [f32; 3],
    pub normal: Option<[f32; 3]>,
    pub texcoord: [f32; 2],
    pub texcoord2: Option<[f32; 2]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolMaterial {
    pub flags: u32,
    pub color: Vec<u8>,
    /// Specular exponent, clamped to `[0, 128]`.
    pub shininess: f32,
    /// Diffuse texture first, then the lightmap if any.
    pub texture_names: Vec<String>,
    pub triangles: Vec<[u16; 3]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolMesh {
    pub aabb_min: [f32; 3],
    pub aabb_max: [f32; 3],
    pub vertex_format: VertexFormat,
    pub vertices: Vec<PolVertex>,
    pub materials: Vec<PolMaterial>,
}

/// A scene-graph node record from version > 100 files.
#[derive(Clone, Debug, PartialEq)]
pub struct PolNode {
    pub header: Vec<u8>,
    pub matrix: [f32; 16],
    pub flags: u32,
    pub name: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolFile {
    pub version: u32,
    pub node_descs: Vec<Vec<u8>>,
    pub nodes: Vec<PolNode>,
    pub meshes: Vec<PolMesh>,
}

impl PolFile {
    /// Reads a POL file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PolError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let pol = Self::read(&mut std::io::BufReader::new(file))?;
        log::debug!(
            "read {:?}: version {}, {} meshes, {} nodes",
            path,
            pol.version,
            pol.meshes.len(),
            pol.nodes.len()
        );
        Ok(pol)
    }

    /// Reads a POL file from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PolError> {
        Self::read(&mut std::io::Cursor::new(bytes))
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, PolError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PolError::BadMagic(magic));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        let mesh_count = reader.read_u32::<LittleEndian>()?;

        let node_descs = (0..mesh_count)
            .map(|_| read_bytes(reader, NODE_DESC_SIZE))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::new();
        if version > 100 {
            let node_count = reader.read_u32::<LittleEndian>()?;
            for _ in 0..node_count {
                nodes.push(read_node(reader)?);
            }
        }

        let meshes = (0..mesh_count)
            .map(|_| read_mesh(reader))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version,
            node_descs,
            nodes,
            meshes,
        })
    }
}

/// Reads exactly `len` bytes without allocating them up front.
fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, PolError> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

fn read_f32s<R: Read, const N: usize>(reader: &mut R) -> Result<[f32; N], PolError> {
    let mut out = [0f32; N];
    reader.read_f32_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

fn read_node<R: Read>(reader: &mut R) -> Result<PolNode, PolError> {
    let header = read_bytes(reader, NODE_RECORD_HEADER_SIZE)?;
    let matrix = read_f32s::<_, 16>(reader)?;
    let flags = reader.read_u32::<LittleEndian>()?;
    let name_len = reader.read_u32::<LittleEndian>()?;
    let name = read_bytes(reader, name_len as usize)?;

    Ok(PolNode {
        header,
        matrix,
        flags,
        name,
    })
}

fn read_mesh<R: Read>(reader: &mut R) -> Result<PolMesh, PolError> {
    let aabb_min = read_f32s::<_, 3>(reader)?;
    let aabb_max = read_f32s::<_, 3>(reader)?;

    let raw_format = reader.read_i32::<LittleEndian>()?;
    if raw_format < 0 {
        return Err(PolError::UnsupportedVertexFormat(raw_format));
    }
    let vertex_format = VertexFormat(raw_format as u32);
    if !vertex_format.has(VertexFormat::POSITION) {
        return Err(PolError::MissingAttribute(vertex_format.0, "position"));
    }
    if !vertex_format.has(VertexFormat::TEXCOORD) {
        return Err(PolError::MissingAttribute(vertex_format.0, "texture coordinate"));
    }

    let vertex_count = reader.read_u32::<LittleEndian>()?;
    let vertices = (0..vertex_count)
        .map(|_| read_vertex(reader, vertex_format))
        .collect::<Result<Vec<_>, _>>()?;

    let material_count = reader.read_u32::<LittleEndian>()?;
    let materials = (0..material_count)
        .map(|_| read_material(reader, vertex_count))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "mesh: format {:#x} ({} bytes/vertex), {} vertices, {} materials",
        vertex_format.0,
        vertex_format.stride(),
        vertex_count,
        material_count
    );

    Ok(PolMesh {
        aabb_min,
        aabb_max,
        vertex_format,
        vertices,
        materials,
    })
}

fn read_vertex<R: Read>(reader: &mut R, format: VertexFormat) -> Result<PolVertex, PolError> {
    let position = read_f32s::<_, 3>(reader)?;

    let normal = if format.has(VertexFormat::NORMAL) {
        Some(read_f32s::<_, 3>(reader)?)
    } else {
        None
    };

    // Components nobody renders are still consumed to stay aligned.
    if format.has(VertexFormat::EXTRA_4) {
        read_f32s::<_, 1>(reader)?;
    }
    if format.has(VertexFormat::EXTRA_8) {
        read_f32s::<_, 1>(reader)?;
    }

    let texcoord = read_f32s::<_, 2>(reader)?;

    let texcoord2 = if format.has(VertexFormat::TEXCOORD2) {
        Some(read_f32s::<_, 2>(reader)?)
    } else {
        None
    };

    if format.has(VertexFormat::EXTRA_40) {
        read_f32s::<_, 2>(reader)?;
    }
    if format.has(VertexFormat::EXTRA_80) {
        read_f32s::<_, 2>(reader)?;
    }
    if format.has(VertexFormat::EXTRA_100) {
        read_f32s::<_, 4>(reader)?;
    }

    Ok(PolVertex {
        position,
        normal,
        texcoord,
        texcoord2,
    })
}

fn read_material<R: Read>(reader: &mut R, vertex_count: u32) -> Result<PolMaterial, PolError> {
    let flags = reader.read_u32::<LittleEndian>()?;
    let color = read_bytes(reader, MATERIAL_COLOR_SIZE)?;
    let shininess = reader
        .read_f32::<LittleEndian>()?
        .clamp(0.0, MAX_SHININESS);

    let texture_count = reader.read_u32::<LittleEndian>()?;
    let mut texture_names = Vec::new();
    for _ in 0..texture_count {
        let raw = read_bytes(reader, NAME_SIZE)?;
        let name: Vec<u8> = raw.into_iter().take_while(|&c| c != 0).collect();
        texture_names.push(String::from_utf8(name)?);
    }

    // Three reserved words.
    for _ in 0..3 {
        reader.read_u32::<LittleEndian>()?;
    }

    let triangle_count = reader.read_u32::<LittleEndian>()?;
    let mut triangles = Vec::new();
    for _ in 0..triangle_count {
        let mut tri = [0u16; 3];
        reader.read_u16_into::<LittleEndian>(&mut tri)?;
        if let Some(&index) = tri.iter().find(|&&i| u32::from(i) >= vertex_count) {
            return Err(PolError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        triangles.push(tri);
    }

    Ok(PolMaterial {
        flags,
        color,
        shininess,
        texture_names,
        triangles,
    })
}

/// Encoder for hand-built POL files in tests.
#[cfg(test)]
pub(crate) mod test_data {
    use byteorder::{LittleEndian, WriteBytesExt};

    pub struct MaterialDef<'a> {
        pub shininess: f32,
        pub textures: &'a [&'a str],
        pub triangles: &'a [[u16; 3]],
    }

    pub struct MeshDef<'a> {
        pub format: i32,
        /// position, texcoord, texcoord2 (written only if the format has it)
        pub vertices: &'a [([f32; 3], [f32; 2], [f32; 2])],
        pub materials: &'a [MaterialDef<'a>],
    }

    pub fn encode(version: u32, nodes: &[&str], meshes: &[MeshDef]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"POLY");
        out.write_u32::<LittleEndian>(version).unwrap();
        out.write_u32::<LittleEndian>(meshes.len() as u32).unwrap();
        for _ in meshes {
            out.extend_from_slice(&[0u8; 52]);
        }
        if version > 100 {
            out.write_u32::<LittleEndian>(nodes.len() as u32).unwrap();
            for name in nodes {
                out.extend_from_slice(&[7u8; 32]);
                for i in 0..16 {
                    out.write_f32::<LittleEndian>(if i % 5 == 0 { 1.0 } else { 0.0 })
                        .unwrap();
                }
                out.write_u32::<LittleEndian>(9).unwrap();
                out.write_u32::<LittleEndian>(name.len() as u32).unwrap();
                out.extend_from_slice(name.as_bytes());
            }
        }
        for mesh in meshes {
            for v in [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0] {
                out.write_f32::<LittleEndian>(v).unwrap();
            }
            out.write_i32::<LittleEndian>(mesh.format).unwrap();
            out.write_u32::<LittleEndian>(mesh.vertices.len() as u32).unwrap();
            let format = mesh.format as u32;
            for (pos, uv, uv2) in mesh.vertices {
                for f in pos {
                    out.write_f32::<LittleEndian>(*f).unwrap();
                }
                if format & 0x2 != 0 {
                    for f in [0.0f32, 1.0, 0.0] {
                        out.write_f32::<LittleEndian>(f).unwrap();
                    }
                }
                if format & 0x4 != 0 {
                    out.write_f32::<LittleEndian>(99.0).unwrap();
                }
                if format & 0x8 != 0 {
                    out.write_f32::<LittleEndian>(99.0).unwrap();
                }
                for f in uv {
                    out.write_f32::<LittleEndian>(*f).unwrap();
                }
                if format & 0x20 != 0 {
                    for f in uv2 {
                        out.write_f32::<LittleEndian>(*f).unwrap();
                    }
                }
                for (bit, n) in [(0x40, 2), (0x80, 2), (0x100, 4)] {
                    if format & bit != 0 {
                        for _ in 0..n {
                            out.write_f32::<LittleEndian>(-5.0).unwrap();
                        }
                    }
                }
            }
            out.write_u32::<LittleEndian>(mesh.materials.len() as u32).unwrap();
            for m in mesh.materials {
                out.write_u32::<LittleEndian>(0).unwrap();
                out.extend_from_slice(&[0xffu8; 64]);
                out.write_f32::<LittleEndian>(m.shininess).unwrap();
                out.write_u32::<LittleEndian>(m.textures.len() as u32).unwrap();
                for name in m.textures {
                    let mut buf = [0u8; 64];
                    buf[..name.len()].copy_from_slice(name.as_bytes());
                    out.extend_from_slice(&buf);
                }
                for _ in 0..3 {
                    out.write_u32::<LittleEndian>(0).unwrap();
                }
                out.write_u32::<LittleEndian>(m.triangles.len() as u32).unwrap();
                for tri in m.triangles {
                    for i in tri {
                        out.write_u16::<LittleEndian>(*i).unwrap();
                    }
                }
            }
        }
        out
    }

    /// One lightmapped quad: 4 vertices, 2 triangles, diffuse + lightmap.
    pub fn lightmapped_quad() -> Vec<u8> {
        encode(
            100,
            &[],
            &[MeshDef {
                format: 0x1 | 0x10 | 0x20,
                vertices: &[
                    ([0.0, 0.0, 0.0], [0.0, 0.0], [0.5, 0.5]),
                    ([1.0, 0.0, 0.0], [1.0, 0.0], [0.6, 0.5]),
                    ([1.0, 1.0, 0.0], [1.0, 1.0], [0.6, 0.6]),
                    ([0.0, 1.0, 0.0], [0.0, 1.0], [0.5, 0.6]),
                ],
                materials: &[MaterialDef {
                    shininess: 16.0,
                    textures: &["wall.tga", "wall_lm.bmp"],
                    triangles: &[[0, 1, 2], [2, 3, 0]],
                }],
            }],
        )
    }
}
