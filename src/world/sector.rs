use crate::world::chunk::Chunk;
use crate::world::position::{ChunkPos, LocalPos, SectorPos};
use crate::world::voxel::VoxelVolume;
use log::warn;

/// Paging state of a sector. Loading and unloading are separate states on
/// one enum, so a sector can never be in both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorState {
    /// A background load of the persisted record is in flight; the grid
    /// stays empty until the result is applied.
    Loading,
    /// Grid owned and indexed by the foreground scheduler.
    Ready,
    /// A background save is in flight; volumes have been moved out and
    /// the entry only awaits release.
    Unloading,
}

/// A fixed grid of chunk slots; the unit of persistence and paging.
pub struct Sector {
    position: SectorPos,
    size: i32,
    slots: Vec<Option<Chunk>>,
    state: SectorState,
    active_count: u32,
    /// Chunk coordinates queued while the sector loads, materialized once
    /// the load result is applied.
    pending: Vec<ChunkPos>,
    /// Chunks that held a render proxy when unloading began; released
    /// when the save completes.
    unloading_chunks: Vec<ChunkPos>,
}

impl Sector {
    /// Create a fresh sector with no persisted record behind it.
    pub fn new_empty(position: SectorPos, size: i32) -> Self {
        Self {
            position,
            size,
            slots: empty_slots(size),
            state: SectorState::Ready,
            active_count: 0,
            pending: Vec::new(),
            unloading_chunks: Vec::new(),
        }
    }

    /// Create a placeholder for a sector whose record is being loaded in
    /// the background. Requests arriving meanwhile queue onto it instead
    /// of spawning a second load.
    pub fn new_loading(position: SectorPos, size: i32) -> Self {
        Self {
            position,
            size,
            slots: empty_slots(size),
            state: SectorState::Loading,
            active_count: 0,
            pending: Vec::new(),
            unloading_chunks: Vec::new(),
        }
    }

    pub fn position(&self) -> SectorPos {
        self.position
    }

    pub fn state(&self) -> SectorState {
        self.state
    }

    pub fn chunk(&self, local: LocalPos) -> Option<&Chunk> {
        self.slots[local.slot_index(self.size)].as_ref()
    }

    pub fn chunk_mut(&mut self, local: LocalPos) -> Option<&mut Chunk> {
        self.slots[local.slot_index(self.size)].as_mut()
    }

    /// Register a chunk in its slot. The slot is derived from the chunk's
    /// own sector-local coordinate, keeping lookups and ownership aligned.
    pub fn insert_chunk(&mut self, chunk: Chunk) {
        let idx = chunk.local_pos().slot_index(self.size);
        if self.slots[idx].is_some() {
            warn!(
                "Sector ({}, {}): slot {:?} overwritten",
                self.position.x,
                self.position.y,
                chunk.local_pos()
            );
        }
        self.slots[idx] = Some(chunk);
    }

    /// Queue a chunk coordinate for materialization after loading.
    pub fn queue_pending(&mut self, pos: ChunkPos) {
        if !self.pending.contains(&pos) {
            self.pending.push(pos);
        }
    }

    pub fn take_pending(&mut self) -> Vec<ChunkPos> {
        std::mem::take(&mut self.pending)
    }

    /// Zero the per-pass activity counter.
    pub fn reset_active_count(&mut self) {
        self.active_count = 0;
    }

    pub fn increment_active(&mut self) {
        self.active_count += 1;
    }

    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Number of slots holding a chunk.
    pub fn resident_chunks(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Apply the volumes restored by a background load. Slots with an
    /// absent entry stay empty; they were never generated. Returns the
    /// chunk coordinates that materialized, so their proxies can be
    /// created.
    pub fn apply_loaded(&mut self, volumes: Vec<Option<VoxelVolume>>) -> Vec<ChunkPos> {
        if self.state != SectorState::Loading {
            warn!(
                "Sector ({}, {}): load result applied in state {:?}",
                self.position.x, self.position.y, self.state
            );
        }
        if volumes.len() != self.slots.len() {
            warn!(
                "Sector ({}, {}): record holds {} slots, expected {}; treating as never persisted",
                self.position.x,
                self.position.y,
                volumes.len(),
                self.slots.len()
            );
            self.state = SectorState::Ready;
            return Vec::new();
        }
        let mut restored = Vec::new();
        for (idx, volume) in volumes.into_iter().enumerate() {
            if let Some(volume) = volume {
                let local = LocalPos::new(idx as i32 / self.size, idx as i32 % self.size);
                let pos = ChunkPos::from_sector(self.position, local, self.size);
                self.slots[idx] = Some(Chunk::restored(pos, self.size, volume));
                restored.push(pos);
            }
        }
        self.state = SectorState::Ready;
        restored
    }

    /// Begin unloading: move every generated volume out for the save task
    /// and remember which chunks still hold proxies. The grid empties and
    /// the sector parks in `Unloading` until the save completes.
    pub fn begin_unload(&mut self) -> Vec<Option<VoxelVolume>> {
        if self.state != SectorState::Ready {
            warn!(
                "Sector ({}, {}): unload begun in state {:?}",
                self.position.x, self.position.y, self.state
            );
        }
        self.state = SectorState::Unloading;
        self.unloading_chunks.clear();
        self.slots
            .iter_mut()
            .map(|slot| match slot.take() {
                Some(mut chunk) => {
                    self.unloading_chunks.push(chunk.position());
                    chunk.take_volume()
                }
                None => None,
            })
            .collect()
    }

    /// Chunks whose proxies remain to be destroyed once the save lands.
    pub fn take_unloading_chunks(&mut self) -> Vec<ChunkPos> {
        std::mem::take(&mut self.unloading_chunks)
    }
}

fn empty_slots(size: i32) -> Vec<Option<Chunk>> {
    let mut slots = Vec::with_capacity((size * size) as usize);
    slots.resize_with((size * size) as usize, || None);
    slots
}
