use crate::mesh::ChunkMesh;
use crate::world::position::{ChunkPos, LocalPos, SectorPos, VoxelPos};
use crate::world::voxel::{BlockId, VoxelVolume};
use log::{debug, warn};

/// Lifecycle of a chunk.
///
/// `Created → Generating → Ready → Active ⇄ Inactive`; a chunk restored
/// from storage enters `Ready` directly. Unloading happens only through
/// the owning sector dropping the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Registered in its sector; no voxel data yet.
    Created,
    /// A background generation task is in flight.
    Generating,
    /// Voxel data present; no live render proxy yet.
    Ready,
    /// Within render distance, mesh handed to the proxy host.
    Active,
    /// Left render distance; data retained, proxy released.
    Inactive,
}

/// One voxel volume plus its derived geometry and lifecycle state.
///
/// A chunk knows its owning sector only by coordinate. The sector's grid
/// is the single owner of the chunk itself.
pub struct Chunk {
    position: ChunkPos,
    sector: SectorPos,
    local: LocalPos,
    volume: Option<VoxelVolume>,
    state: ChunkState,
    mesh: ChunkMesh,
    mesh_current: bool,
    mesh_built: bool,
}

impl Chunk {
    /// Create an ungenerated chunk.
    pub fn new(position: ChunkPos, sector_size: i32) -> Self {
        Self {
            position,
            sector: position.to_sector_pos(sector_size),
            local: position.to_local_pos(sector_size),
            volume: None,
            state: ChunkState::Created,
            mesh: ChunkMesh::new(),
            mesh_current: false,
            mesh_built: false,
        }
    }

    /// Create a chunk whose volume was restored from a persisted record.
    /// It starts in `Ready`: generated, not yet activated.
    pub fn restored(position: ChunkPos, sector_size: i32, volume: VoxelVolume) -> Self {
        Self {
            position,
            sector: position.to_sector_pos(sector_size),
            local: position.to_local_pos(sector_size),
            volume: Some(volume),
            state: ChunkState::Ready,
            mesh: ChunkMesh::new(),
            mesh_current: false,
            mesh_built: false,
        }
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Coordinate of the owning sector.
    pub fn sector_pos(&self) -> SectorPos {
        self.sector
    }

    /// Slot coordinate inside the owning sector.
    pub fn local_pos(&self) -> LocalPos {
        self.local
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// True once the voxel volume is present (generated or restored).
    pub fn is_generated(&self) -> bool {
        self.volume.is_some()
    }

    pub fn volume(&self) -> Option<&VoxelVolume> {
        self.volume.as_ref()
    }

    /// Mark the chunk as having a generation task in flight.
    pub fn begin_generation(&mut self) {
        match self.state {
            ChunkState::Created => self.state = ChunkState::Generating,
            other => warn!(
                "Chunk {:?}: generation dispatched in state {:?}",
                self.position, other
            ),
        }
    }

    /// Install the volume produced by a generation task. The volume is
    /// written exactly once; a duplicate result is dropped.
    pub fn install_volume(&mut self, volume: VoxelVolume) {
        if self.volume.is_some() {
            warn!(
                "Chunk {:?}: duplicate generation result dropped",
                self.position
            );
            return;
        }
        if self.state != ChunkState::Generating {
            debug!(
                "Chunk {:?}: volume installed in state {:?}",
                self.position, self.state
            );
        }
        self.volume = Some(volume);
        self.state = ChunkState::Ready;
    }

    /// Enter render distance. A chunk still waiting on generation stays
    /// where it is; it turns `Active` when the volume lands and the mesh
    /// pass picks it up.
    pub fn activate(&mut self) {
        match self.state {
            ChunkState::Ready | ChunkState::Inactive => self.state = ChunkState::Active,
            ChunkState::Active => {}
            ChunkState::Created | ChunkState::Generating => debug!(
                "Chunk {:?}: activation deferred, still generating",
                self.position
            ),
        }
    }

    /// Leave render distance. Voxel data is retained. Chunks still
    /// generating simply stay in their current state; the completed
    /// volume lands later and the chunk rests at `Ready`.
    pub fn deactivate(&mut self) {
        match self.state {
            ChunkState::Active => self.state = ChunkState::Inactive,
            ChunkState::Created | ChunkState::Generating | ChunkState::Ready => {}
            ChunkState::Inactive => debug!(
                "Chunk {:?}: deactivated while already inactive",
                self.position
            ),
        }
    }

    /// Read a block by in-chunk offset; absent data reads as empty.
    pub fn block_at_offset(&self, offset: VoxelPos) -> BlockId {
        match &self.volume {
            Some(volume) => volume.get(offset.x, offset.y, offset.z),
            None => BlockId::AIR,
        }
    }

    /// Write a block by in-chunk offset. Returns false (a no-op) while the
    /// volume is absent. A successful write leaves the mesh stale.
    pub fn set_block_at_offset(&mut self, offset: VoxelPos, id: BlockId) -> bool {
        match &mut self.volume {
            Some(volume) => {
                volume.set(offset.x, offset.y, offset.z, id);
                self.mesh_current = false;
                true
            }
            None => false,
        }
    }

    /// Whether the stored mesh reflects the current volume.
    pub fn mesh_current(&self) -> bool {
        self.mesh_current
    }

    /// Whether a mesh pass has ever run for this chunk. Neighbor updates
    /// only touch chunks that already carry geometry.
    pub fn mesh_built(&self) -> bool {
        self.mesh_built
    }

    /// Force the next mesh pass to rebuild this chunk.
    pub fn invalidate_mesh(&mut self) {
        self.mesh_current = false;
    }

    pub fn mesh(&self) -> &ChunkMesh {
        &self.mesh
    }

    /// Take the mesh buffers out for rebuilding; pair with `put_mesh`.
    pub fn take_mesh(&mut self) -> ChunkMesh {
        std::mem::take(&mut self.mesh)
    }

    /// Return rebuilt mesh buffers and mark them current.
    pub fn put_mesh(&mut self, mesh: ChunkMesh) {
        self.mesh = mesh;
        self.mesh_current = true;
        self.mesh_built = true;
    }

    /// Surrender the volume for persistence; used only during sector
    /// unload, after which the chunk is dropped.
    pub fn take_volume(&mut self) -> Option<VoxelVolume> {
        self.volume.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_4x8() -> VoxelVolume {
        let mut v = VoxelVolume::new(4, 8, 4);
        v.set(1, 2, 3, BlockId::ROCK);
        v
    }

    #[test]
    fn fresh_chunk_walks_the_generation_states() {
        let mut chunk = Chunk::new(ChunkPos::new(5, -3), 4);
        assert_eq!(chunk.state(), ChunkState::Created);
        assert!(!chunk.is_generated());

        chunk.begin_generation();
        assert_eq!(chunk.state(), ChunkState::Generating);

        chunk.install_volume(volume_4x8());
        assert_eq!(chunk.state(), ChunkState::Ready);
        assert!(chunk.is_generated());

        chunk.activate();
        assert_eq!(chunk.state(), ChunkState::Active);
        chunk.deactivate();
        assert_eq!(chunk.state(), ChunkState::Inactive);
        chunk.activate();
        assert_eq!(chunk.state(), ChunkState::Active);
    }

    #[test]
    fn restored_chunk_starts_ready() {
        let chunk = Chunk::restored(ChunkPos::new(2, 2), 4, volume_4x8());
        assert_eq!(chunk.state(), ChunkState::Ready);
        assert!(chunk.is_generated());
        assert_eq!(chunk.block_at_offset(VoxelPos::new(1, 2, 3)), BlockId::ROCK);
    }

    #[test]
    fn duplicate_volume_install_is_dropped() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 4);
        chunk.begin_generation();
        chunk.install_volume(volume_4x8());

        let mut other = VoxelVolume::new(4, 8, 4);
        other.set(0, 0, 0, BlockId(9));
        chunk.install_volume(other);

        // The first volume wins
        assert_eq!(chunk.block_at_offset(VoxelPos::new(1, 2, 3)), BlockId::ROCK);
        assert_eq!(chunk.block_at_offset(VoxelPos::new(0, 0, 0)), BlockId::AIR);
    }

    #[test]
    fn ungenerated_chunk_reads_empty_and_rejects_writes() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 4);
        assert_eq!(chunk.block_at_offset(VoxelPos::new(1, 1, 1)), BlockId::AIR);
        assert!(!chunk.set_block_at_offset(VoxelPos::new(1, 1, 1), BlockId::ROCK));
    }

    #[test]
    fn edits_leave_the_mesh_stale() {
        let mut chunk = Chunk::restored(ChunkPos::new(0, 0), 4, volume_4x8());
        chunk.put_mesh(ChunkMesh::new());
        assert!(chunk.mesh_current());
        assert!(chunk.set_block_at_offset(VoxelPos::new(0, 0, 0), BlockId::ROCK));
        assert!(!chunk.mesh_current());
    }

    #[test]
    fn sector_and_local_keys_match_the_coordinate_layer() {
        let pos = ChunkPos::new(-5, 11);
        let chunk = Chunk::new(pos, 4);
        assert_eq!(chunk.sector_pos(), pos.to_sector_pos(4));
        assert_eq!(chunk.local_pos(), pos.to_local_pos(4));
    }
}
