use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Euclidean division toward negative infinity. For positive `m` the
/// quotient pairs with `floor_mod` so that `m * q + r == n`.
#[inline]
pub fn floor_div(n: i32, m: i32) -> i32 {
    n.div_euclid(m)
}

/// Euclidean remainder. For positive `m` the result is always in `[0, m)`,
/// negative `n` included.
#[inline]
pub fn floor_mod(n: i32, m: i32) -> i32 {
    n.rem_euclid(m)
}

/// Position of a voxel in the world (world coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the chunk this voxel belongs to. Height is not chunked, so only
    /// x and z participate.
    pub fn to_chunk_pos(&self, chunk_width: i32) -> ChunkPos {
        ChunkPos::new(floor_div(self.x, chunk_width), floor_div(self.z, chunk_width))
    }

    /// Get the in-chunk offset of this voxel; y passes through unchanged.
    pub fn to_chunk_offset(&self, chunk_width: i32) -> VoxelPos {
        VoxelPos::new(floor_mod(self.x, chunk_width), self.y, floor_mod(self.z, chunk_width))
    }

    /// Reconstruct a world voxel from a chunk and an in-chunk offset.
    pub fn from_chunk(chunk: ChunkPos, offset: VoxelPos, chunk_width: i32) -> Self {
        Self::new(
            chunk.x * chunk_width + offset.x,
            offset.y,
            chunk.z * chunk_width + offset.z,
        )
    }

    /// Create a new voxel position offset by the given amounts
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Create VoxelPos from a world-space point (glam Vec3)
    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }
}

/// Position of a chunk on the world chunk grid. The grid is 2D: chunks
/// span the full world height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Get the sector this chunk belongs to
    pub fn to_sector_pos(&self, sector_size: i32) -> SectorPos {
        SectorPos::new(floor_div(self.x, sector_size), floor_div(self.z, sector_size))
    }

    /// Get the chunk's slot coordinate inside its sector, always in
    /// `[0, sector_size)` on both axes.
    pub fn to_local_pos(&self, sector_size: i32) -> LocalPos {
        LocalPos::new(floor_mod(self.x, sector_size), floor_mod(self.z, sector_size))
    }

    /// Reconstruct a chunk position from a sector and a slot coordinate.
    pub fn from_sector(sector: SectorPos, local: LocalPos, sector_size: i32) -> Self {
        Self::new(sector.x * sector_size + local.x, sector.y * sector_size + local.y)
    }

    /// World-space origin of the chunk, used to place its render proxy.
    pub fn world_origin(&self, chunk_width: i32) -> Vec3 {
        Vec3::new((self.x * chunk_width) as f32, 0.0, (self.z * chunk_width) as f32)
    }

    /// Create a new chunk position offset by the given amounts
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// Calculate squared distance to another chunk position
    pub fn distance_squared_to(&self, other: ChunkPos) -> i32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

/// Position of a sector on the sector grid. The second axis follows the
/// chunk grid's z axis; it is named `y` to match the persisted record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorPos {
    pub x: i32,
    pub y: i32,
}

impl SectorPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Slot coordinate of a chunk inside its sector, in `[0, sector_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: i32,
    pub y: i32,
}

impl LocalPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Row-major index into a sector's slot array.
    pub fn slot_index(&self, sector_size: i32) -> usize {
        (self.x * sector_size + self.y) as usize
    }
}

/// The six axis-aligned face/neighbor directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// -Z
    Back,
    /// +Z
    Forward,
    /// -X
    Left,
    /// +X
    Right,
    /// +Y
    Up,
    /// -Y
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Back,
        Direction::Forward,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// The four directions with horizontal (chunk-crossing) components.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::Back,
        Direction::Forward,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit offset of this direction as (dx, dy, dz).
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::Back => (0, 0, -1),
            Direction::Forward => (0, 0, 1),
            Direction::Left => (-1, 0, 0),
            Direction::Right => (1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
        }
    }

    /// Chunk-grid offset of this direction, dropping the vertical component.
    pub fn chunk_offset(&self) -> (i32, i32) {
        let (dx, _, dz) = self.offset();
        (dx, dz)
    }
}
