//! World model: coordinates, voxel storage, chunks, sectors, generation.
//!
//! Addressing is three-tiered. A world voxel position maps onto a chunk on
//! the horizontal grid (the full world height lives in one chunk), and
//! chunks group into square sectors, the unit of persistence and paging.
//! All mappings use floored division so negative coordinates stay exact.

pub mod chunk;
pub mod generation;
pub mod map;
pub mod position;
pub mod sector;
pub mod voxel;

// Re-export the core types for convenience
pub use chunk::{Chunk, ChunkState};
pub use generation::DensityGenerator;
pub use map::WorldMap;
pub use position::{floor_div, floor_mod, ChunkPos, Direction, LocalPos, SectorPos, VoxelPos};
pub use sector::{Sector, SectorState};
pub use voxel::{BlockId, VoxelVolume};
