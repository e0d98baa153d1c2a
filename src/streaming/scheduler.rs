//! Foreground streaming control.
//!
//! One `tick` per control step: apply finished background work, reconcile
//! the active chunk set against the observer, mesh what became ready, and
//! page out sectors nothing uses anymore. The scheduler owns the sector
//! map outright; workers only ever receive owned data and hand owned
//! results back over the completion channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use rustc_hash::FxHashSet;

use crate::config::WorldConfig;
use crate::host::ProxyHost;
use crate::mesh::Mesher;
use crate::persistence::SectorStore;
use crate::streaming::worker::{Completion, Job, PoolStats, WorkerPool};
use crate::streaming::EngineError;
use crate::world::chunk::Chunk;
use crate::world::generation::DensityGenerator;
use crate::world::map::WorldMap;
use crate::world::position::{ChunkPos, Direction, SectorPos, VoxelPos};
use crate::world::sector::{Sector, SectorState};
use crate::world::voxel::{BlockId, VoxelVolume};

pub struct StreamingScheduler {
    config: WorldConfig,
    map: WorldMap,
    pool: WorkerPool,
    store: Arc<SectorStore>,
    /// Chunk coordinates inside the streaming radius as of the last
    /// reconciliation.
    active: FxHashSet<ChunkPos>,
    /// Generated-and-active chunks awaiting a foreground mesh pass.
    pending_mesh: Vec<ChunkPos>,
    last_observer: Option<ChunkPos>,
    jobs_in_flight: usize,
}

impl StreamingScheduler {
    pub fn new(config: WorldConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let seed = config.resolved_seed();
        info!(
            "world {}x{} sectors of {}x{} chunks ({}x{} voxels), seed {}",
            config.world_size,
            config.world_size,
            config.sector_size,
            config.sector_size,
            config.chunk_width,
            config.chunk_height,
            seed
        );

        let store = Arc::new(SectorStore::new(config.save_dir.clone())?);
        let generator = Arc::new(DensityGenerator::new(seed, &config));
        let pool = WorkerPool::new(&config, generator, Arc::clone(&store))?;
        let map = WorldMap::new(&config);

        Ok(Self {
            config,
            map,
            pool,
            store,
            active: FxHashSet::default(),
            pending_mesh: Vec::new(),
            last_observer: None,
            jobs_in_flight: 0,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read-only view of the resident world.
    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn active_chunks(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, pos: ChunkPos) -> bool {
        self.active.contains(&pos)
    }

    pub fn observer_chunk(&self) -> Option<ChunkPos> {
        self.last_observer
    }

    /// Background jobs dispatched but not yet applied.
    pub fn jobs_in_flight(&self) -> usize {
        self.jobs_in_flight
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// One control step. Never blocks: finished background work is
    /// drained with `try_recv`, and reconciliation only runs when the
    /// observer crossed into another chunk (or on the first call).
    pub fn tick(&mut self, host: &mut dyn ProxyHost, observer: ChunkPos) {
        for completion in self.pool.drain_completions() {
            self.apply_completion(host, completion);
        }

        if self.last_observer != Some(observer) {
            self.reconcile(host, observer);
            self.last_observer = Some(observer);
        }

        self.mesh_pass(host);
        self.unload_pass();
    }

    /// Drive ticks until no background work remains, blocking on the
    /// completion channel between steps. Returns false on timeout.
    pub fn settle(
        &mut self,
        host: &mut dyn ProxyHost,
        observer: ChunkPos,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        self.tick(host, observer);
        while self.jobs_in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "settle timed out with {} jobs still in flight",
                    self.jobs_in_flight
                );
                return false;
            }
            let wait = (deadline - now).min(Duration::from_millis(100));
            if let Some(completion) = self.pool.recv_completion_timeout(wait) {
                self.apply_completion(host, completion);
                self.tick(host, observer);
            }
        }
        true
    }

    /// Write one block and rebuild the affected geometry immediately: the
    /// owning chunk, plus any active meshed neighbor whose boundary abuts
    /// the edited voxel. Returns false if the target is not resident.
    pub fn apply_edit(&mut self, host: &mut dyn ProxyHost, pos: VoxelPos, id: BlockId) -> bool {
        let chunk_pos = match self.map.set_block(pos, id) {
            Some(chunk_pos) => chunk_pos,
            None => return false,
        };
        debug!("block {:?} set to {} in chunk {:?}", pos, id, chunk_pos);
        if self.active.contains(&chunk_pos) {
            self.mesh_and_upload(host, chunk_pos);
        }

        let width = self.config.chunk_width;
        let offset = pos.to_chunk_offset(width);
        let mut abutting = Vec::new();
        if offset.x == 0 {
            abutting.push(chunk_pos.offset(-1, 0));
        }
        if offset.x == width - 1 {
            abutting.push(chunk_pos.offset(1, 0));
        }
        if offset.z == 0 {
            abutting.push(chunk_pos.offset(0, -1));
        }
        if offset.z == width - 1 {
            abutting.push(chunk_pos.offset(0, 1));
        }
        for neighbor in abutting {
            if self.active.contains(&neighbor) {
                self.remesh_if_built(host, neighbor);
            } else if let Some(chunk) = self.map.chunk_mut(neighbor) {
                // Parked neighbor: rebuild when it next activates
                chunk.invalidate_mesh();
            }
        }
        true
    }

    /// Deactivate everything, page every sector out, and wait for the
    /// saves to land. Returns the final pool statistics.
    pub fn shutdown(mut self, host: &mut dyn ProxyHost, timeout: Duration) -> PoolStats {
        info!(
            "shutting down: {} active chunks, {} resident sectors",
            self.active.len(),
            self.map.sector_count()
        );
        self.last_observer = None;
        for pos in std::mem::take(&mut self.active) {
            if let Some(chunk) = self.map.chunk_mut(pos) {
                chunk.deactivate();
                host.deactivate(pos);
            }
        }
        for sector in self.map.sectors_mut() {
            sector.reset_active_count();
        }
        self.unload_pass();

        let deadline = Instant::now() + timeout;
        while self.map.sector_count() > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "shutdown timed out with {} sectors not yet saved",
                    self.map.sector_count()
                );
                break;
            }
            let wait = (deadline - now).min(Duration::from_millis(100));
            if let Some(completion) = self.pool.recv_completion_timeout(wait) {
                self.apply_completion(host, completion);
            }
            self.unload_pass();
        }
        self.pool.stats()
    }

    fn dispatch(&mut self, job: Job) {
        self.jobs_in_flight += 1;
        self.pool.dispatch(job);
    }

    fn apply_completion(&mut self, host: &mut dyn ProxyHost, completion: Completion) {
        self.jobs_in_flight = self.jobs_in_flight.saturating_sub(1);
        match completion {
            Completion::Generated { pos, volume, elapsed } => {
                self.apply_generated(pos, volume, elapsed);
            }
            Completion::SectorLoaded { pos, result } => {
                self.apply_sector_loaded(host, pos, result);
            }
            Completion::SectorSaved { pos, result } => {
                self.apply_sector_saved(host, pos, result);
            }
        }
    }

    fn apply_generated(&mut self, pos: ChunkPos, volume: VoxelVolume, elapsed: Duration) {
        match self.map.chunk_mut(pos) {
            Some(chunk) => {
                debug!("chunk {:?} generated in {:?}", pos, elapsed);
                chunk.install_volume(volume);
                if self.active.contains(&pos) {
                    self.pending_mesh.push(pos);
                }
            }
            None => {
                debug!("generated chunk {:?} no longer resident, dropping", pos);
            }
        }
    }

    fn apply_sector_loaded(
        &mut self,
        host: &mut dyn ProxyHost,
        pos: SectorPos,
        result: crate::persistence::PersistenceResult<Option<Vec<Option<VoxelVolume>>>>,
    ) {
        let slots = (self.config.sector_size * self.config.sector_size) as usize;
        let volumes = match result {
            Ok(Some(volumes)) => {
                info!("sector ({}, {}) restored from disk", pos.x, pos.y);
                volumes
            }
            Ok(None) => {
                debug!("sector ({}, {}) has no record, starting fresh", pos.x, pos.y);
                vec![None; slots]
            }
            Err(err) => {
                warn!(
                    "sector ({}, {}) record unreadable, regenerating: {}",
                    pos.x, pos.y, err
                );
                vec![None; slots]
            }
        };

        let (restored, pending) = match self.map.sector_mut(pos) {
            Some(sector) => (sector.apply_loaded(volumes), sector.take_pending()),
            None => {
                debug!("load completed for vanished sector ({}, {})", pos.x, pos.y);
                (Vec::new(), Vec::new())
            }
        };
        // Every resident chunk owns a proxy, active or not
        for &chunk_pos in &restored {
            host.create(chunk_pos, chunk_pos.world_origin(self.config.chunk_width));
        }
        // Restored volumes change what boundary queries answer; refresh the
        // active geometry that meshed against the absent sector
        for chunk_pos in restored {
            for direction in Direction::HORIZONTAL {
                let (dx, dz) = direction.chunk_offset();
                self.remesh_if_built(host, chunk_pos.offset(dx, dz));
            }
        }
        for chunk_pos in pending {
            if self.is_wanted(chunk_pos) {
                self.admit_chunk(host, chunk_pos);
            }
        }
    }

    fn apply_sector_saved(
        &mut self,
        host: &mut dyn ProxyHost,
        pos: SectorPos,
        result: crate::persistence::PersistenceResult<()>,
    ) {
        if let Err(err) = result {
            error!("sector ({}, {}) save failed: {}", pos.x, pos.y, err);
        }
        match self.map.remove_sector(pos) {
            Some(mut sector) => {
                for chunk_pos in sector.take_unloading_chunks() {
                    host.destroy(chunk_pos);
                }
                let pending = sector.take_pending();
                drop(sector);
                info!("sector ({}, {}) released", pos.x, pos.y);
                // Chunks that came back into range while the save was in
                // flight are resolved now, against a clean slate.
                for chunk_pos in pending {
                    if self.is_wanted(chunk_pos) {
                        self.resolve_and_admit(host, chunk_pos);
                    }
                }
            }
            None => {
                debug!("save completed for unknown sector ({}, {})", pos.x, pos.y);
            }
        }
    }

    /// Rebuild the active set around the observer. Row-major over the
    /// square of streaming offsets, keeping candidates inside both the
    /// world bounds and the circular streaming radius.
    fn reconcile(&mut self, host: &mut dyn ProxyHost, observer: ChunkPos) {
        let previously = std::mem::take(&mut self.active);
        for sector in self.map.sectors_mut() {
            sector.reset_active_count();
        }

        let radius = self.config.render_distance;
        for dx in (-radius + 1)..radius {
            for dz in (-radius + 1)..radius {
                let candidate = observer.offset(dx, dz);
                if !self.map.chunk_in_bounds(candidate) {
                    continue;
                }
                if candidate.distance_squared_to(observer) >= radius * radius {
                    continue;
                }
                if previously.contains(&candidate) {
                    self.active.insert(candidate);
                    self.bump_active_count(candidate);
                    continue;
                }
                self.resolve_and_admit(host, candidate);
            }
        }

        let mut deactivated = 0usize;
        for pos in previously {
            if self.active.contains(&pos) {
                continue;
            }
            match self.map.chunk_mut(pos) {
                Some(chunk) => {
                    chunk.deactivate();
                    host.deactivate(pos);
                    deactivated += 1;
                }
                None => debug!("chunk {:?} left range but is not resident", pos),
            }
        }
        info!(
            "observer at {:?}: {} active chunks, {} deactivated",
            observer,
            self.active.len(),
            deactivated
        );
    }

    /// Make sure the candidate's sector is resident, then admit the chunk
    /// if the sector is usable; otherwise park the coordinate on its queue.
    fn resolve_and_admit(&mut self, host: &mut dyn ProxyHost, pos: ChunkPos) {
        let sector_pos = pos.to_sector_pos(self.config.sector_size);
        match self.ensure_sector(sector_pos) {
            SectorState::Ready => self.admit_chunk(host, pos),
            SectorState::Loading | SectorState::Unloading => {
                if let Some(sector) = self.map.sector_mut(sector_pos) {
                    sector.queue_pending(pos);
                }
            }
        }
    }

    /// Resident entry for a sector: reuse it, or create one. A persisted
    /// record turns into a loading placeholder with one load job behind
    /// it; anything else starts as an empty ready sector.
    fn ensure_sector(&mut self, pos: SectorPos) -> SectorState {
        if let Some(sector) = self.map.sector(pos) {
            return sector.state();
        }
        let size = self.config.sector_size;
        if self.store.exists(pos) {
            info!("sector ({}, {}) loading from disk", pos.x, pos.y);
            self.map.insert_sector(Sector::new_loading(pos, size));
            self.dispatch(Job::LoadSector { pos });
            SectorState::Loading
        } else {
            debug!("sector ({}, {}) created fresh", pos.x, pos.y);
            self.map.insert_sector(Sector::new_empty(pos, size));
            SectorState::Ready
        }
    }

    /// Bring one in-range chunk into the active set: reactivate it if its
    /// sector grid already holds it, otherwise create it and send its
    /// generation job off. The proxy is created with the chunk, placed at
    /// the chunk's world origin.
    fn admit_chunk(&mut self, host: &mut dyn ProxyHost, pos: ChunkPos) {
        if self.active.contains(&pos) {
            return;
        }
        let exists = self.map.chunk(pos).is_some();
        if exists {
            let mut needs_mesh = false;
            if let Some(chunk) = self.map.chunk_mut(pos) {
                chunk.activate();
                needs_mesh = chunk.is_generated() && !chunk.mesh_current();
            }
            host.activate(pos);
            if needs_mesh {
                self.mesh_and_upload(host, pos);
            }
        } else {
            let mut chunk = Chunk::new(pos, self.config.sector_size);
            chunk.begin_generation();
            let sector_pos = chunk.sector_pos();
            if let Some(sector) = self.map.sector_mut(sector_pos) {
                sector.insert_chunk(chunk);
            } else {
                warn!("admitting chunk {:?} without a resident sector", pos);
                return;
            }
            host.create(pos, pos.world_origin(self.config.chunk_width));
            self.dispatch(Job::Generate { pos });
        }
        self.active.insert(pos);
        self.bump_active_count(pos);
    }

    fn bump_active_count(&mut self, pos: ChunkPos) {
        let sector_pos = pos.to_sector_pos(self.config.sector_size);
        if let Some(sector) = self.map.sector_mut(sector_pos) {
            sector.increment_active();
        }
    }

    fn is_wanted(&self, pos: ChunkPos) -> bool {
        if !self.map.chunk_in_bounds(pos) {
            return false;
        }
        let radius = self.config.render_distance;
        match self.last_observer {
            Some(observer) => pos.distance_squared_to(observer) < radius * radius,
            None => false,
        }
    }

    /// Mesh every chunk whose generation landed while it was active, then
    /// refresh the active meshed neighbors its new volume may occlude.
    fn mesh_pass(&mut self, host: &mut dyn ProxyHost) {
        let to_mesh = std::mem::take(&mut self.pending_mesh);
        for pos in to_mesh {
            if !self.active.contains(&pos) {
                continue;
            }
            self.mesh_and_upload(host, pos);
            if let Some(chunk) = self.map.chunk_mut(pos) {
                chunk.activate();
            }
            host.activate(pos);
            for direction in Direction::HORIZONTAL {
                let (dx, dz) = direction.chunk_offset();
                self.remesh_if_built(host, pos.offset(dx, dz));
            }
        }
    }

    /// Page out every ready sector nothing references anymore. Sectors
    /// with persisted content get a save job and park as tombstones until
    /// it completes; empty ones are dropped on the spot.
    fn unload_pass(&mut self) {
        for pos in self.map.sector_positions() {
            let (state, active, resident) = match self.map.sector(pos) {
                Some(sector) => (sector.state(), sector.active_count(), sector.resident_chunks()),
                None => continue,
            };
            if state != SectorState::Ready || active > 0 {
                continue;
            }
            if resident == 0 {
                debug!("empty sector ({}, {}) dropped", pos.x, pos.y);
                self.map.remove_sector(pos);
                continue;
            }
            let volumes = match self.map.sector_mut(pos) {
                Some(sector) => sector.begin_unload(),
                None => continue,
            };
            info!("sector ({}, {}) unloading {} chunks", pos.x, pos.y, resident);
            self.dispatch(Job::SaveSector { pos, volumes });
        }
    }

    /// Rebuild a neighbor that is active and has meshed before.
    fn remesh_if_built(&mut self, host: &mut dyn ProxyHost, pos: ChunkPos) {
        if !self.active.contains(&pos) {
            return;
        }
        let built = self.map.chunk(pos).map(|c| c.mesh_built()).unwrap_or(false);
        if built {
            self.mesh_and_upload(host, pos);
        }
    }

    /// Foreground mesh rebuild for one chunk, uploading the result. The
    /// mesh buffers are taken out of the chunk so the builder can read the
    /// map (boundary queries cross into neighbor chunks) while writing
    /// into them.
    fn mesh_and_upload(&mut self, host: &mut dyn ProxyHost, pos: ChunkPos) {
        let mut mesh = match self.map.chunk_mut(pos) {
            Some(chunk) if chunk.is_generated() => chunk.take_mesh(),
            _ => return,
        };
        if let Some(volume) = self.map.chunk(pos).and_then(|chunk| chunk.volume()) {
            let map = &self.map;
            Mesher::build(volume, pos, |query| map.block_at(query), &mut mesh);
        }
        if let Some(chunk) = self.map.chunk_mut(pos) {
            chunk.put_mesh(mesh);
        }
        if let Some(chunk) = self.map.chunk(pos) {
            host.upload(pos, chunk.mesh());
        }
    }
}
