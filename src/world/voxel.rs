use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a block type. One byte per voxel; `0` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const ROCK: BlockId = BlockId(1);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_solid(&self) -> bool {
        self.0 != 0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BlockId::AIR => write!(f, "Air"),
            BlockId::ROCK => write!(f, "Rock"),
            BlockId(id) => write!(f, "Block({})", id),
        }
    }
}

/// An owned 3D grid of block ids.
///
/// Storage is linear with index `(x*h + y)*d + z`: X is the outer axis,
/// Y the middle, Z the fastest. The run-length codec scans volumes in
/// exactly this order, so encode/decode walk the backing slice directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelVolume {
    width: i32,
    height: i32,
    depth: i32,
    voxels: Vec<u8>,
}

impl VoxelVolume {
    /// Create a zero-filled (all empty) volume.
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        debug_assert!(width > 0 && height > 0 && depth > 0);
        Self {
            width,
            height,
            depth,
            voxels: vec![0; (width * height * depth) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Total cell count.
    pub fn volume(&self) -> usize {
        self.voxels.len()
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        ((x * self.height + y) * self.depth + z) as usize
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height && z >= 0 && z < self.depth
    }

    /// Read a cell; out-of-range positions read as empty.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        if self.in_bounds(x, y, z) {
            BlockId(self.voxels[self.index(x, y, z)])
        } else {
            BlockId::AIR
        }
    }

    /// Write a cell; out-of-range positions are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        if self.in_bounds(x, y, z) {
            let idx = self.index(x, y, z);
            self.voxels[idx] = id.0;
        }
    }

    /// Backing cells in scan order.
    pub fn as_slice(&self) -> &[u8] {
        &self.voxels
    }

    /// Fill `len` cells starting at linear index `start` with `id`.
    /// The caller is responsible for range checks.
    pub(crate) fn fill_run(&mut self, start: usize, len: usize, id: BlockId) {
        self.voxels[start..start + len].fill(id.0);
    }

    /// True if no cell is solid.
    pub fn is_all_empty(&self) -> bool {
        self.voxels.iter().all(|&v| v == 0)
    }
}
