//! Chunk streaming: foreground scheduler plus the background worker pool.
//!
//! The scheduler owns all world state and runs on one control thread; the
//! pool runs generation and sector persistence, reporting back on a
//! bounded channel the scheduler drains every tick.

pub mod scheduler;
pub mod worker;

pub use scheduler::StreamingScheduler;
pub use worker::{Completion, Job, PoolStats, WorkerPool};

use crate::config::ConfigError;
use crate::persistence::PersistenceError;

/// Failures that can keep the engine from starting.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("persistence setup failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("worker pool failed to start: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
