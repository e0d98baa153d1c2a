//! Streaming voxel asteroid worlds.
//!
//! A finite world of noise-generated asteroid terrain, split into chunks
//! that stream in and out around a moving observer. Chunks are grouped
//! into sectors that page to disk as run-length encoded records; meshing
//! runs on the control thread against the live map, everything else runs
//! on a worker pool. Rendering is delegated entirely to a [`ProxyHost`]
//! implementation supplied by the embedding application.
//!
//! ```no_run
//! use asteroid_engine::{StreamingScheduler, NullProxyHost, WorldConfig};
//!
//! let config = WorldConfig::default();
//! let spawn = config.spawn_chunk();
//! let mut scheduler = StreamingScheduler::new(config)?;
//! let mut host = NullProxyHost;
//! scheduler.tick(&mut host, spawn);
//! # Ok::<(), asteroid_engine::EngineError>(())
//! ```

pub mod config;
pub mod host;
pub mod mesh;
pub mod persistence;
pub mod streaming;
pub mod world;

pub use config::{ConfigError, WorldConfig};
pub use host::{HostEvent, NullProxyHost, ProxyHost, RecordingProxyHost};
pub use mesh::{ChunkMesh, Mesher, Vertex};
pub use persistence::{PersistenceError, SectorRecord, SectorStore};
pub use streaming::{EngineError, PoolStats, StreamingScheduler};
pub use world::{
    BlockId, Chunk, ChunkPos, ChunkState, DensityGenerator, Direction, LocalPos, SectorPos,
    SectorState, VoxelPos, VoxelVolume, WorldMap,
};
