//! Surface geometry produced by the mesher: plain vertex/index buffers
//! ready for a renderer to upload. Nothing in here touches the GPU.

pub mod mesher;

pub use mesher::Mesher;

use glam::{Vec2, Vec3};

/// Texture coordinates shared by every face quad, in corner order.
pub const FACE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 0.0),
];

/// One mesh vertex: chunk-local position plus texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
}

/// Growable geometry buffers for one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Append one face: four corners with the shared UV quad, indexed as
    /// two triangles `i, i+3, i+1` and `i+1, i+3, i+2`.
    pub fn add_quad(&mut self, corners: [Vec3; 4]) {
        let i = self.vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(FACE_UVS) {
            self.vertices.push(Vertex { position: corner, uv });
        }
        self.indices
            .extend_from_slice(&[i, i + 3, i + 1, i + 1, i + 3, i + 2]);
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of face quads in the mesh.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_quad_appends_four_vertices_and_six_indices() {
        let mut mesh = ChunkMesh::new();
        mesh.add_quad([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 3, 1, 1, 3, 2]);
        assert_eq!(mesh.quad_count(), 1);

        mesh.add_quad([Vec3::ZERO; 4]);
        assert_eq!(mesh.indices[6..], [4, 7, 5, 5, 7, 6]);
    }

    #[test]
    fn every_quad_carries_the_shared_uvs() {
        let mut mesh = ChunkMesh::new();
        mesh.add_quad([Vec3::ZERO; 4]);
        let uvs: Vec<Vec2> = mesh.vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, FACE_UVS.to_vec());
    }

    #[test]
    fn clear_empties_both_buffers() {
        let mut mesh = ChunkMesh::new();
        mesh.add_quad([Vec3::ZERO; 4]);
        mesh.clear();
        assert!(mesh.is_empty());
        assert!(mesh.indices.is_empty());
    }
}
