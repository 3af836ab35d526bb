//! Static mesh geometry: vertex layout and mesh construction from decoded parts.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

/// Uniform scale applied to decoded asset coordinates (and normals)
pub const ASSET_SCALE: f32 = 0.2;

/// Normal used when the asset provides fewer normals than positions
const DEFAULT_NORMAL: [f32; 3] = [0.5, 0.5, 0.5];

/// Texture coordinate used when the asset provides fewer than positions
const DEFAULT_TEX_COORD: [f32; 2] = [0.5, 0.5];

/// Vertex data (position + normal + colour + texture coordinate)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub colour: [f32; 4],
    pub tex_coord: [f32; 2],
}

/// Rejected mesh input
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("index count {0} is not a multiple of 3")]
    NotTriangulated(usize),
}

/// Triangulated mesh ready for upload (read-only after construction)
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Build vertices from decoded asset attributes.
    ///
    /// Positions and normals are scaled by `scale`; missing normals and
    /// texture coordinates fall back to fixed defaults; every vertex gets
    /// `colour`.
    pub fn from_parts(
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
        indices: Vec<u32>,
        colour: [f32; 4],
        scale: f32,
    ) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangulated(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: positions.len(),
            });
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let n = normals.get(i).copied().unwrap_or(DEFAULT_NORMAL);
                let tc = tex_coords.get(i).copied().unwrap_or(DEFAULT_TEX_COORD);
                Vertex {
                    position: [scale * p[0], scale * p[1], scale * p[2]],
                    normal: [scale * n[0], scale * n[1], scale * n[2]],
                    colour,
                    tex_coord: tc,
                }
            })
            .collect();

        Ok(Self { vertices, indices })
    }

    /// Axis-aligned box with per-face normals and texture coordinates.
    ///
    /// `half_extent` is in asset units and scaled by [`ASSET_SCALE`].
    pub fn cube(half_extent: f32, colour: [f32; 4]) -> Self {
        // (normal, u axis, v axis) with u × v = normal so faces wind CCW outward
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut tex_coords = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in corners {
                let p = (normal + u * su + v * sv) * half_extent;
                positions.push(p.to_array());
                normals.push(normal.to_array());
                tex_coords.push([(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::from_parts(&positions, &normals, &tex_coords, indices, colour, ASSET_SCALE)
            .unwrap_or_else(|_| Self {
                vertices: Vec::new(),
                indices: Vec::new(),
            })
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
