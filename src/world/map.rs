use log::debug;
use rustc_hash::FxHashMap;

use crate::config::WorldConfig;
use crate::world::chunk::Chunk;
use crate::world::position::{ChunkPos, SectorPos, VoxelPos};
use crate::world::sector::Sector;
use crate::world::voxel::BlockId;

/// Owner of every resident sector, keyed by sector coordinate. All access
/// happens on the scheduler thread; background tasks only ever see data
/// that was moved out of the map.
pub struct WorldMap {
    sectors: FxHashMap<SectorPos, Sector>,
    chunk_width: i32,
    chunk_height: i32,
    sector_size: i32,
    chunk_span: i32,
}

impl WorldMap {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            sectors: FxHashMap::default(),
            chunk_width: config.chunk_width,
            chunk_height: config.chunk_height,
            sector_size: config.sector_size,
            chunk_span: config.chunk_span(),
        }
    }

    pub fn chunk_width(&self) -> i32 {
        self.chunk_width
    }

    pub fn sector_size(&self) -> i32 {
        self.sector_size
    }

    pub fn sector(&self, pos: SectorPos) -> Option<&Sector> {
        self.sectors.get(&pos)
    }

    pub fn sector_mut(&mut self, pos: SectorPos) -> Option<&mut Sector> {
        self.sectors.get_mut(&pos)
    }

    pub fn insert_sector(&mut self, sector: Sector) {
        self.sectors.insert(sector.position(), sector);
    }

    pub fn remove_sector(&mut self, pos: SectorPos) -> Option<Sector> {
        self.sectors.remove(&pos)
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn sector_positions(&self) -> Vec<SectorPos> {
        self.sectors.keys().copied().collect()
    }

    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    pub fn sectors_mut(&mut self) -> impl Iterator<Item = &mut Sector> {
        self.sectors.values_mut()
    }

    /// Whether a chunk coordinate lies inside the finite world.
    pub fn chunk_in_bounds(&self, pos: ChunkPos) -> bool {
        pos.x >= 0 && pos.x < self.chunk_span && pos.z >= 0 && pos.z < self.chunk_span
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        let sector = self.sectors.get(&pos.to_sector_pos(self.sector_size))?;
        sector.chunk(pos.to_local_pos(self.sector_size))
    }

    pub fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        let sector = self.sectors.get_mut(&pos.to_sector_pos(self.sector_size))?;
        sector.chunk_mut(pos.to_local_pos(self.sector_size))
    }

    /// Read a block anywhere in the world. Out-of-bounds positions and
    /// chunks that are absent or not yet generated all read as air, so
    /// callers never have to distinguish those cases.
    pub fn block_at(&self, pos: VoxelPos) -> BlockId {
        if pos.y < 0 || pos.y >= self.chunk_height {
            return BlockId::AIR;
        }
        let chunk_pos = pos.to_chunk_pos(self.chunk_width);
        if !self.chunk_in_bounds(chunk_pos) {
            return BlockId::AIR;
        }
        match self.chunk(chunk_pos) {
            Some(chunk) => chunk.block_at_offset(pos.to_chunk_offset(self.chunk_width)),
            None => BlockId::AIR,
        }
    }

    /// Write a block. Returns the owning chunk coordinate on success so the
    /// caller can queue a remesh; writes outside the world or into chunks
    /// that are not resident are dropped.
    pub fn set_block(&mut self, pos: VoxelPos, id: BlockId) -> Option<ChunkPos> {
        if pos.y < 0 || pos.y >= self.chunk_height {
            debug!("set_block outside vertical bounds at {:?}", pos);
            return None;
        }
        let chunk_pos = pos.to_chunk_pos(self.chunk_width);
        if !self.chunk_in_bounds(chunk_pos) {
            debug!("set_block outside world bounds at {:?}", pos);
            return None;
        }
        let chunk_width = self.chunk_width;
        let chunk = match self.chunk_mut(chunk_pos) {
            Some(chunk) => chunk,
            None => {
                debug!("set_block into non-resident chunk {:?} dropped", chunk_pos);
                return None;
            }
        };
        if chunk.set_block_at_offset(pos.to_chunk_offset(chunk_width), id) {
            Some(chunk_pos)
        } else {
            debug!("set_block into ungenerated chunk {:?} dropped", chunk_pos);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sector::SectorState;
    use crate::world::voxel::VoxelVolume;

    fn test_config() -> WorldConfig {
        let mut config = WorldConfig::default();
        config.chunk_width = 4;
        config.chunk_height = 8;
        config.sector_size = 2;
        config.world_size = 3;
        config
    }

    fn map_with_chunk(config: &WorldConfig, pos: ChunkPos) -> WorldMap {
        let mut map = WorldMap::new(config);
        let mut sector = Sector::new_empty(pos.to_sector_pos(config.sector_size), config.sector_size);
        let mut chunk = Chunk::new(pos, config.sector_size);
        chunk.begin_generation();
        chunk.install_volume(VoxelVolume::new(
            config.chunk_width,
            config.chunk_height,
            config.chunk_width,
        ));
        sector.insert_chunk(chunk);
        map.insert_sector(sector);
        map
    }

    #[test]
    fn set_then_get_round_trips_through_world_coordinates() {
        let config = test_config();
        let mut map = map_with_chunk(&config, ChunkPos::new(2, 1));
        let pos = VoxelPos::new(2 * 4 + 3, 5, 1 * 4 + 2);

        let touched = map.set_block(pos, BlockId::ROCK);
        assert_eq!(touched, Some(ChunkPos::new(2, 1)));
        assert_eq!(map.block_at(pos), BlockId::ROCK);
    }

    #[test]
    fn out_of_bounds_reads_are_air_and_writes_are_dropped() {
        let config = test_config();
        let mut map = map_with_chunk(&config, ChunkPos::new(0, 0));

        // World span is 6 chunks of 4 voxels, so 24 voxels per axis
        assert_eq!(map.block_at(VoxelPos::new(-1, 0, 0)), BlockId::AIR);
        assert_eq!(map.block_at(VoxelPos::new(24, 0, 0)), BlockId::AIR);
        assert_eq!(map.block_at(VoxelPos::new(0, 8, 0)), BlockId::AIR);
        assert_eq!(map.set_block(VoxelPos::new(0, -1, 0), BlockId::ROCK), None);
        assert_eq!(map.set_block(VoxelPos::new(24, 0, 0), BlockId::ROCK), None);
    }

    #[test]
    fn non_resident_chunks_read_as_air() {
        let config = test_config();
        let map = WorldMap::new(&config);
        assert_eq!(map.block_at(VoxelPos::new(5, 3, 5)), BlockId::AIR);
        assert!(map.chunk(ChunkPos::new(1, 1)).is_none());
    }

    #[test]
    fn writes_into_ungenerated_chunks_are_dropped() {
        let config = test_config();
        let mut map = WorldMap::new(&config);
        let pos = ChunkPos::new(1, 1);
        let mut sector = Sector::new_empty(pos.to_sector_pos(config.sector_size), config.sector_size);
        // Resident but still waiting on its volume
        sector.insert_chunk(Chunk::new(pos, config.sector_size));
        map.insert_sector(sector);

        assert_eq!(map.set_block(VoxelPos::new(5, 3, 5), BlockId::ROCK), None);
        assert_eq!(map.block_at(VoxelPos::new(5, 3, 5)), BlockId::AIR);
    }

    #[test]
    fn loading_placeholder_reads_as_air_and_rejects_writes() {
        let config = test_config();
        let mut map = WorldMap::new(&config);
        map.insert_sector(Sector::new_loading(SectorPos::new(0, 0), config.sector_size));

        assert_eq!(map.sector(SectorPos::new(0, 0)).map(|s| s.state()), Some(SectorState::Loading));
        assert_eq!(map.block_at(VoxelPos::new(1, 1, 1)), BlockId::AIR);
        assert_eq!(map.set_block(VoxelPos::new(1, 1, 1), BlockId::ROCK), None);
    }

    #[test]
    fn writing_marks_the_chunk_mesh_stale() {
        let config = test_config();
        let mut map = map_with_chunk(&config, ChunkPos::new(1, 1));
        {
            let chunk = map.chunk_mut(ChunkPos::new(1, 1)).expect("chunk resident");
            chunk.put_mesh(Default::default());
            assert!(chunk.mesh_current());
        }
        map.set_block(VoxelPos::new(4, 2, 4), BlockId::ROCK);
        let chunk = map.chunk(ChunkPos::new(1, 1)).expect("chunk resident");
        assert!(!chunk.mesh_current());
    }
}
