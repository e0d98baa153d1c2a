//! Background job execution for generation and sector persistence.
//!
//! All heavy work runs on a rayon pool. Jobs carry owned inputs, results
//! come back as owned [`Completion`]s on a bounded channel, and the
//! foreground drains that channel without ever blocking. Nothing in here
//! touches the sector map.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::debug;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::WorldConfig;
use crate::persistence::{PersistenceResult, SectorRecord, SectorStore};
use crate::world::generation::DensityGenerator;
use crate::world::position::{ChunkPos, SectorPos};
use crate::world::voxel::VoxelVolume;

/// Work dispatched to the pool.
#[derive(Debug)]
pub enum Job {
    /// Run the density generator for one chunk.
    Generate { pos: ChunkPos },
    /// Read and decode the persisted record for a sector, if any.
    LoadSector { pos: SectorPos },
    /// Encode and write a sector record from volumes moved out of the map.
    SaveSector {
        pos: SectorPos,
        volumes: Vec<Option<VoxelVolume>>,
    },
}

/// Result of a finished job, handed back to the foreground.
#[derive(Debug)]
pub enum Completion {
    Generated {
        pos: ChunkPos,
        volume: VoxelVolume,
        elapsed: Duration,
    },
    /// `Ok(None)` means no record exists on disk; the sector starts fresh.
    SectorLoaded {
        pos: SectorPos,
        result: PersistenceResult<Option<Vec<Option<VoxelVolume>>>>,
    },
    SectorSaved {
        pos: SectorPos,
        result: PersistenceResult<()>,
    },
}

/// Counters accumulated by the workers.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub chunks_generated: usize,
    pub total_generation_time: Duration,
    pub sectors_loaded: usize,
    pub sectors_saved: usize,
}

impl PoolStats {
    pub fn average_generation_time(&self) -> Duration {
        if self.chunks_generated == 0 {
            Duration::ZERO
        } else {
            self.total_generation_time / self.chunks_generated as u32
        }
    }
}

/// Rayon pool plus the completion channel its jobs report on.
pub struct WorkerPool {
    pool: ThreadPool,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    generator: Arc<DensityGenerator>,
    store: Arc<SectorStore>,
    stats: Arc<Mutex<PoolStats>>,
    chunk_width: i32,
    chunk_height: i32,
}

impl WorkerPool {
    pub fn new(
        config: &WorldConfig,
        generator: Arc<DensityGenerator>,
        store: Arc<SectorStore>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let threads = num_cpus::get().saturating_sub(1).max(2);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("world-worker-{}", idx))
            .build()?;

        // Enough room for a full streaming ring of results plus paging
        let span = (config.render_distance * 2 + 1) as usize;
        let capacity = (span * span * 2).max(256);
        let (completion_tx, completion_rx) = bounded(capacity);

        debug!(
            "worker pool started: {} threads, completion capacity {}",
            threads, capacity
        );
        Ok(Self {
            pool,
            completion_tx,
            completion_rx,
            generator,
            store,
            stats: Arc::new(Mutex::new(PoolStats::default())),
            chunk_width: config.chunk_width,
            chunk_height: config.chunk_height,
        })
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    pub fn pending_completions(&self) -> usize {
        self.completion_rx.len()
    }

    /// Hand a job to the pool. Returns immediately; the result arrives on
    /// the completion channel.
    pub fn dispatch(&self, job: Job) {
        let tx = self.completion_tx.clone();
        let stats = Arc::clone(&self.stats);
        match job {
            Job::Generate { pos } => {
                let generator = Arc::clone(&self.generator);
                self.pool.spawn(move || {
                    let started = Instant::now();
                    let volume = generator.generate(pos);
                    let elapsed = started.elapsed();
                    {
                        let mut stats = stats.lock();
                        stats.chunks_generated += 1;
                        stats.total_generation_time += elapsed;
                    }
                    if tx.send(Completion::Generated { pos, volume, elapsed }).is_err() {
                        debug!("generation result for {:?} dropped, engine gone", pos);
                    }
                });
            }
            Job::LoadSector { pos } => {
                let store = Arc::clone(&self.store);
                let (width, height) = (self.chunk_width, self.chunk_height);
                self.pool.spawn(move || {
                    let result = if store.exists(pos) {
                        store
                            .load(pos)
                            .and_then(|record| record.decode_volumes(width, height))
                            .map(Some)
                    } else {
                        Ok(None)
                    };
                    if result.is_ok() {
                        stats.lock().sectors_loaded += 1;
                    }
                    if tx.send(Completion::SectorLoaded { pos, result }).is_err() {
                        debug!("load result for sector {:?} dropped, engine gone", pos);
                    }
                });
            }
            Job::SaveSector { pos, volumes } => {
                let store = Arc::clone(&self.store);
                self.pool.spawn(move || {
                    let record = SectorRecord::from_volumes(pos, &volumes);
                    let result = store.save(&record);
                    if result.is_ok() {
                        stats.lock().sectors_saved += 1;
                    }
                    if tx.send(Completion::SectorSaved { pos, result }).is_err() {
                        debug!("save result for sector {:?} dropped, engine gone", pos);
                    }
                });
            }
        }
    }

    /// Pull every completion currently queued, without blocking.
    pub fn drain_completions(&self) -> Vec<Completion> {
        let mut drained = Vec::new();
        loop {
            match self.completion_rx.try_recv() {
                Ok(completion) => drained.push(completion),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Block up to `timeout` for one completion. Test and shutdown helper;
    /// the streaming tick never calls this.
    pub fn recv_completion_timeout(&self, timeout: Duration) -> Option<Completion> {
        self.completion_rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_pool(config: &WorldConfig, dir: &TempDir) -> WorkerPool {
        let generator = Arc::new(DensityGenerator::new(42, config));
        let store =
            Arc::new(SectorStore::new(dir.path().join("save")).expect("store should create"));
        WorkerPool::new(config, generator, store).expect("pool should build")
    }

    fn small_config() -> WorldConfig {
        let mut config = WorldConfig::default();
        config.chunk_width = 4;
        config.chunk_height = 8;
        config.sector_size = 2;
        config
    }

    #[test]
    fn generation_jobs_complete_with_sized_volumes() {
        let config = small_config();
        let dir = TempDir::new().expect("tempdir");
        let pool = test_pool(&config, &dir);

        pool.dispatch(Job::Generate { pos: ChunkPos::new(3, 5) });
        let completion = pool
            .recv_completion_timeout(Duration::from_secs(5))
            .expect("generation should complete");

        match completion {
            Completion::Generated { pos, volume, .. } => {
                assert_eq!(pos, ChunkPos::new(3, 5));
                assert_eq!(volume.width(), 4);
                assert_eq!(volume.height(), 8);
                assert_eq!(volume.depth(), 4);
            }
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(pool.stats().chunks_generated, 1);
    }

    #[test]
    fn loading_an_unsaved_sector_reports_no_record() {
        let config = small_config();
        let dir = TempDir::new().expect("tempdir");
        let pool = test_pool(&config, &dir);

        pool.dispatch(Job::LoadSector { pos: SectorPos::new(7, -2) });
        let completion = pool
            .recv_completion_timeout(Duration::from_secs(5))
            .expect("load should complete");

        match completion {
            Completion::SectorLoaded { pos, result } => {
                assert_eq!(pos, SectorPos::new(7, -2));
                assert!(result.expect("load should succeed").is_none());
            }
            other => panic!("unexpected completion {:?}", other),
        }
    }

    #[test]
    fn save_then_load_round_trips_through_the_pool() {
        let config = small_config();
        let dir = TempDir::new().expect("tempdir");
        let pool = test_pool(&config, &dir);

        let mut volume = VoxelVolume::new(4, 8, 4);
        volume.set(1, 2, 3, crate::world::voxel::BlockId::ROCK);
        let mut volumes: Vec<Option<VoxelVolume>> = (0..4).map(|_| None).collect();
        volumes[2] = Some(volume.clone());

        pool.dispatch(Job::SaveSector { pos: SectorPos::new(0, 1), volumes });
        match pool
            .recv_completion_timeout(Duration::from_secs(5))
            .expect("save should complete")
        {
            Completion::SectorSaved { result, .. } => result.expect("save should succeed"),
            other => panic!("unexpected completion {:?}", other),
        }

        pool.dispatch(Job::LoadSector { pos: SectorPos::new(0, 1) });
        match pool
            .recv_completion_timeout(Duration::from_secs(5))
            .expect("load should complete")
        {
            Completion::SectorLoaded { result, .. } => {
                let loaded = result
                    .expect("load should succeed")
                    .expect("record should exist");
                assert_eq!(loaded.len(), 4);
                assert_eq!(loaded[2].as_ref(), Some(&volume));
                assert!(loaded[0].is_none());
            }
            other => panic!("unexpected completion {:?}", other),
        }
        assert_eq!(pool.stats().sectors_saved, 1);
    }
}
