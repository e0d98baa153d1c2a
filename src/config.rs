//! World configuration, loadable from TOML with sane defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::world::position::ChunkPos;

/// Configuration errors raised while reading or validating a world config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{field} must be at least 1, got {value}")]
    TooSmall { field: &'static str, value: i64 },

    #[error("{field} must be positive, got {value}")]
    NonPositiveScale { field: &'static str, value: f64 },

    #[error("sector_size {value} exceeds the supported maximum of {max}")]
    SectorTooLarge { value: i32, max: i32 },
}

/// Largest supported sector edge, bounded by the persistence record sanity
/// checks.
pub const MAX_SECTOR_SIZE: i32 = 64;

/// Tunable parameters for world shape, generation, and streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length along X and Z, in voxels.
    pub chunk_width: i32,
    /// Full world height, in voxels. Chunks span it without vertical splits.
    pub chunk_height: i32,
    /// Sector edge length, in chunks.
    pub sector_size: i32,
    /// World edge length, in sectors.
    pub world_size: i32,
    /// Streaming radius around the observer, in chunks.
    pub render_distance: i32,
    /// Noise frequency for the density field.
    pub noise_scale: f64,
    /// Altitude of peak density; solidity fades away from it.
    pub y_bias: f64,
    /// World seed. `None` draws a random seed at startup.
    pub seed: Option<u32>,
    /// Directory sector records are saved under.
    pub save_dir: PathBuf,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_width: 16,
            chunk_height: 64,
            sector_size: 4,
            world_size: 12,
            render_distance: 6,
            noise_scale: 0.05,
            y_bias: 32.0,
            seed: None,
            save_dir: PathBuf::from("save"),
        }
    }
}

impl WorldConfig {
    /// Load a config from a TOML file. Missing keys fall back to defaults;
    /// the result is validated before being returned.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let at_least_one = [
            ("chunk_width", self.chunk_width),
            ("chunk_height", self.chunk_height),
            ("sector_size", self.sector_size),
            ("world_size", self.world_size),
            ("render_distance", self.render_distance),
        ];
        for (field, value) in at_least_one {
            if value < 1 {
                return Err(ConfigError::TooSmall {
                    field,
                    value: value as i64,
                });
            }
        }
        if self.sector_size > MAX_SECTOR_SIZE {
            return Err(ConfigError::SectorTooLarge {
                value: self.sector_size,
                max: MAX_SECTOR_SIZE,
            });
        }
        if self.noise_scale <= 0.0 {
            return Err(ConfigError::NonPositiveScale {
                field: "noise_scale",
                value: self.noise_scale,
            });
        }
        if self.y_bias <= 0.0 {
            return Err(ConfigError::NonPositiveScale {
                field: "y_bias",
                value: self.y_bias,
            });
        }
        Ok(())
    }

    /// World edge length in chunks.
    pub fn chunk_span(&self) -> i32 {
        self.world_size * self.sector_size
    }

    /// Whether a chunk coordinate lies inside the finite world.
    pub fn chunk_in_bounds(&self, pos: ChunkPos) -> bool {
        let span = self.chunk_span();
        pos.x >= 0 && pos.x < span && pos.z >= 0 && pos.z < span
    }

    /// Chunk the observer starts in: the center of the world grid.
    pub fn spawn_chunk(&self) -> ChunkPos {
        let center = self.chunk_span() / 2;
        ChunkPos::new(center, center)
    }

    /// World-space spawn point: the spawn chunk's center at half height.
    pub fn spawn_position(&self) -> glam::Vec3 {
        let origin = self.spawn_chunk().world_origin(self.chunk_width);
        origin
            + glam::Vec3::new(
                self.chunk_width as f32 / 2.0,
                self.chunk_height as f32 / 2.0,
                self.chunk_width as f32 / 2.0,
            )
    }

    /// Seed to drive generation with. A configured seed wins; otherwise a
    /// random one is drawn, so repeated runs explore different worlds.
    pub fn resolved_seed(&self) -> u32 {
        match self.seed {
            Some(seed) => seed,
            None => rand::random(),
        }
    }
}
