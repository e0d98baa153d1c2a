//! Chunk occupancy generation.
//!
//! Samples a seeded 3D noise field at absolute voxel positions and shapes
//! it with a vertical bias peaking at a configured altitude, producing
//! sparse planetoid clusters rather than continuous terrain.

use crate::config::WorldConfig;
use crate::world::position::ChunkPos;
use crate::world::voxel::{BlockId, VoxelVolume};
use noise::{NoiseFn, Perlin};

/// Cutoff on the biased 0..255 noise value; at or above is solid.
const SOLID_THRESHOLD: f64 = 241.0;
/// Bias factor at the altitudes farthest from the peak.
const BIAS_FLOOR: f64 = 241.0 / 255.0;
/// Additional bias gained linearly toward the peak altitude.
const BIAS_GAIN: f64 = 14.0 / 255.0;

/// Produces chunk voxel volumes. Pure given (seed, chunk position,
/// parameters): generation touches only the output volume, so it is safe
/// on background workers.
pub struct DensityGenerator {
    noise: Perlin,
    chunk_width: i32,
    chunk_height: i32,
    noise_scale: f64,
    y_bias: f64,
}

impl DensityGenerator {
    pub fn new(seed: u32, config: &WorldConfig) -> Self {
        Self {
            noise: Perlin::new(seed),
            chunk_width: config.chunk_width,
            chunk_height: config.chunk_height,
            noise_scale: config.noise_scale,
            y_bias: config.y_bias,
        }
    }

    /// Generate the full voxel volume for a chunk.
    pub fn generate(&self, chunk: ChunkPos) -> VoxelVolume {
        let mut volume = VoxelVolume::new(self.chunk_width, self.chunk_height, self.chunk_width);
        let origin_x = chunk.x * self.chunk_width;
        let origin_z = chunk.z * self.chunk_width;

        for y in 0..self.chunk_height {
            // Chunks span the world height, so the local y is the world y
            let bias = 1.0 - (self.y_bias - y as f64).abs() / self.y_bias;
            let bias2 = BIAS_FLOOR + BIAS_GAIN * bias;
            let sy = y as f64 * self.noise_scale;
            for x in 0..self.chunk_width {
                let sx = (x + origin_x) as f64 * self.noise_scale;
                for z in 0..self.chunk_width {
                    let sz = (z + origin_z) as f64 * self.noise_scale;
                    let value = (self.noise.get([sx, sy, sz]) + 1.0) * 127.5;
                    if value * bias2 >= SOLID_THRESHOLD {
                        volume.set(x, y, z, BlockId::ROCK);
                    }
                }
            }
        }

        volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WorldConfig {
        WorldConfig {
            chunk_width: 8,
            chunk_height: 32,
            y_bias: 16.0,
            noise_scale: 0.08,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let config = test_config();
        let a = DensityGenerator::new(12345, &config);
        let b = DensityGenerator::new(12345, &config);
        for pos in [ChunkPos::new(0, 0), ChunkPos::new(3, -2), ChunkPos::new(-7, 11)] {
            assert_eq!(a.generate(pos), b.generate(pos));
        }
    }

    #[test]
    fn volume_has_configured_dimensions() {
        let config = test_config();
        let generator = DensityGenerator::new(1, &config);
        let volume = generator.generate(ChunkPos::new(2, 2));
        assert_eq!(volume.width(), 8);
        assert_eq!(volume.height(), 32);
        assert_eq!(volume.depth(), 8);
    }

    #[test]
    fn bottom_layer_is_always_empty() {
        // At y = 0 the bias factor bottoms out at 241/255, which pushes
        // the solid cutoff above the noise field's maximum.
        let config = test_config();
        let generator = DensityGenerator::new(777, &config);
        for pos in [ChunkPos::new(0, 0), ChunkPos::new(5, 9), ChunkPos::new(-4, -4)] {
            let volume = generator.generate(pos);
            for x in 0..volume.width() {
                for z in 0..volume.depth() {
                    assert!(volume.get(x, 0, z).is_empty());
                }
            }
        }
    }
}
