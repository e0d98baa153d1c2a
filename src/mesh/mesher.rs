//! Face-culling surface extraction.
//!
//! Walks a chunk's volume and emits one quad per solid-voxel face that
//! borders empty space. Horizontal neighbors outside the chunk are
//! resolved through a world-space lookup; a neighbor that is missing or
//! not yet generated reads as empty, so boundary faces stay visible
//! rather than leaving holes at unloaded seams.

use crate::mesh::ChunkMesh;
use crate::world::position::{ChunkPos, Direction, VoxelPos};
use crate::world::voxel::{BlockId, VoxelVolume};
use glam::Vec3;

/// Cube corner offsets relative to a voxel position. The cube's bottom
/// face sits one unit below the voxel's y.
const CORNERS: [Vec3; 8] = [
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(0.0, -1.0, 1.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
];

/// Corner quad for each face direction, in emission order.
const FACE_CORNERS: [(Direction, [usize; 4]); 6] = [
    (Direction::Back, [0, 1, 2, 3]),
    (Direction::Forward, [4, 5, 6, 7]),
    (Direction::Left, [5, 0, 3, 6]),
    (Direction::Right, [1, 4, 7, 2]),
    (Direction::Up, [3, 2, 7, 6]),
    (Direction::Down, [5, 4, 1, 0]),
];

pub struct Mesher;

impl Mesher {
    /// Rebuild `mesh` from the chunk volume. Buffers are cleared first:
    /// regeneration replaces geometry, it never appends, so meshing an
    /// unchanged chunk twice yields identical buffers.
    ///
    /// `world_block` answers world-space voxel queries for boundary faces
    /// and must return [`BlockId::AIR`] for anything not loaded.
    pub fn build<F>(volume: &VoxelVolume, chunk_pos: ChunkPos, world_block: F, mesh: &mut ChunkMesh)
    where
        F: Fn(VoxelPos) -> BlockId,
    {
        mesh.clear();

        for x in 0..volume.width() {
            for z in 0..volume.depth() {
                for y in 0..volume.height() {
                    if volume.get(x, y, z).is_empty() {
                        continue;
                    }
                    let base = Vec3::new(x as f32, y as f32, z as f32);
                    for (dir, quad) in FACE_CORNERS {
                        if Self::face_open(volume, chunk_pos, &world_block, x, y, z, dir) {
                            mesh.add_quad([
                                base + CORNERS[quad[0]],
                                base + CORNERS[quad[1]],
                                base + CORNERS[quad[2]],
                                base + CORNERS[quad[3]],
                            ]);
                        }
                    }
                }
            }
        }
    }

    /// Whether the face of voxel (x, y, z) pointing at `dir` borders empty
    /// space.
    fn face_open<F>(
        volume: &VoxelVolume,
        chunk_pos: ChunkPos,
        world_block: &F,
        x: i32,
        y: i32,
        z: i32,
        dir: Direction,
    ) -> bool
    where
        F: Fn(VoxelPos) -> BlockId,
    {
        let (dx, dy, dz) = dir.offset();
        let (nx, ny, nz) = (x + dx, y + dy, z + dz);
        match dir {
            // Chunks do not stack vertically: above the top layer is open
            // sky, below the bottom layer is open void.
            Direction::Up | Direction::Down => {
                ny < 0 || ny >= volume.height() || volume.get(nx, ny, nz).is_empty()
            }
            _ => {
                if nx >= 0 && nx < volume.width() && nz >= 0 && nz < volume.depth() {
                    volume.get(nx, ny, nz).is_empty()
                } else {
                    // Crosses the chunk boundary; resolve the neighbor in
                    // world space, possibly landing in another sector.
                    let world = VoxelPos::from_chunk(
                        chunk_pos,
                        VoxelPos::new(nx, ny, nz),
                        volume.width(),
                    );
                    world_block(world).is_empty()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_NEIGHBORS: fn(VoxelPos) -> BlockId = |_| BlockId::AIR;

    fn build(volume: &VoxelVolume) -> ChunkMesh {
        let mut mesh = ChunkMesh::new();
        Mesher::build(volume, ChunkPos::new(0, 0), NO_NEIGHBORS, &mut mesh);
        mesh
    }

    /// Quads whose four corners all lie on the plane `axis == value`.
    fn quads_in_plane_x(mesh: &ChunkMesh, value: f32) -> usize {
        mesh.vertices
            .chunks(4)
            .filter(|quad| quad.iter().all(|v| v.position.x == value))
            .count()
    }

    #[test]
    fn empty_chunk_meshes_to_nothing() {
        let volume = VoxelVolume::new(4, 8, 4);
        let mesh = build(&volume);
        assert!(mesh.is_empty());
        assert_eq!(mesh.indices.len(), 0);
    }

    #[test]
    fn lone_voxel_emits_six_faces() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(1, 3, 2, BlockId::ROCK);
        let mesh = build(&volume);
        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn adjacent_solid_voxels_emit_no_face_between_them() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(1, 3, 1, BlockId::ROCK);
        volume.set(2, 3, 1, BlockId::ROCK);
        let mesh = build(&volume);
        // Ten faces: six per cube minus the hidden pair on the shared plane
        assert_eq!(mesh.quad_count(), 10);
        assert_eq!(quads_in_plane_x(&mesh, 2.0), 0);
    }

    #[test]
    fn solid_next_to_empty_emits_exactly_one_face_on_the_shared_plane() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(1, 3, 1, BlockId::ROCK);
        let mesh = build(&volume);
        // The +X face of the solid voxel lies on x == 2; its empty
        // neighbor contributes nothing.
        assert_eq!(quads_in_plane_x(&mesh, 2.0), 1);
    }

    #[test]
    fn vertical_chunk_edges_read_as_open() {
        let mut volume = VoxelVolume::new(2, 4, 2);
        volume.set(0, 0, 0, BlockId::ROCK);
        volume.set(0, 3, 0, BlockId::ROCK);
        let mesh = build(&volume);
        // Both voxels keep all six faces: bottom layer borders the void,
        // top layer borders the sky.
        assert_eq!(mesh.quad_count(), 12);
    }

    #[test]
    fn stacked_voxels_hide_the_shared_horizontal_faces() {
        let mut volume = VoxelVolume::new(2, 4, 2);
        volume.set(0, 1, 0, BlockId::ROCK);
        volume.set(0, 2, 0, BlockId::ROCK);
        let mesh = build(&volume);
        assert_eq!(mesh.quad_count(), 10);
    }

    #[test]
    fn missing_neighbor_chunk_keeps_the_boundary_face() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(0, 3, 1, BlockId::ROCK);
        let mesh = build(&volume);
        // The -X face at the chunk edge stays visible when nothing is
        // loaded on the other side.
        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(quads_in_plane_x(&mesh, 0.0), 1);
    }

    #[test]
    fn solid_neighbor_chunk_hides_the_boundary_face() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(0, 3, 1, BlockId::ROCK);
        let solid_at_minus_one = |pos: VoxelPos| {
            if pos.x == -1 && pos.y == 3 && pos.z == 1 {
                BlockId::ROCK
            } else {
                BlockId::AIR
            }
        };
        let mut mesh = ChunkMesh::new();
        Mesher::build(&volume, ChunkPos::new(0, 0), solid_at_minus_one, &mut mesh);
        assert_eq!(mesh.quad_count(), 5);
        assert_eq!(quads_in_plane_x(&mesh, 0.0), 0);
    }

    #[test]
    fn boundary_lookup_crosses_into_the_neighbor_chunk() {
        // Chunk (1, 0) with width 4: its -X neighbor voxel for local x=0
        // sits at world x=3 inside chunk (0, 0).
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(0, 2, 2, BlockId::ROCK);
        let mut queried = std::cell::RefCell::new(Vec::new());
        {
            let recorder = |pos: VoxelPos| {
                queried.borrow_mut().push(pos);
                BlockId::AIR
            };
            let mut mesh = ChunkMesh::new();
            Mesher::build(&volume, ChunkPos::new(1, 0), recorder, &mut mesh);
        }
        let queried = queried.get_mut();
        assert_eq!(queried.len(), 1);
        assert_eq!(queried[0], VoxelPos::new(3, 2, 2));
    }

    #[test]
    fn rebuilding_an_unchanged_chunk_is_idempotent() {
        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(1, 3, 1, BlockId::ROCK);
        volume.set(2, 3, 1, BlockId::ROCK);
        volume.set(2, 4, 1, BlockId::ROCK);

        let mut mesh = ChunkMesh::new();
        Mesher::build(&volume, ChunkPos::new(0, 0), NO_NEIGHBORS, &mut mesh);
        let first = mesh.clone();
        Mesher::build(&volume, ChunkPos::new(0, 0), NO_NEIGHBORS, &mut mesh);
        assert_eq!(mesh, first);
    }

    #[test]
    fn quad_winding_follows_the_fixed_pattern() {
        let mut volume = VoxelVolume::new(2, 2, 2);
        volume.set(0, 0, 0, BlockId::ROCK);
        let mesh = build(&volume);
        assert_eq!(&mesh.indices[..6], &[0, 3, 1, 1, 3, 2]);
    }
}
