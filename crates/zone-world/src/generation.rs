//! Procedural chunk generation.

use std::sync::Arc;

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zone_common::{ChunkCoord, ChunkDims, LocalCoord};

use crate::chunk::Chunk;
use crate::tile::{material, VoxelTile};

/// Generator failure. Non-fatal; the same request may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Seed outside the range the generator supports
    #[error("Seed {seed} outside supported range (max {max})")]
    UnsupportedSeed {
        /// Requested seed
        seed: u64,
        /// Largest supported seed
        max: u64,
    },
    /// Any other generator-specific failure
    #[error("{0}")]
    Other(String),
}

/// Fills chunks with content.
///
/// Implementations must be deterministic (same coordinate and seed, same
/// tiles) and local (never read another chunk). `generate` may run on
/// several threads at once for different chunks.
pub trait WorldGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Writes every tile of `chunk` from its coordinate and `seed`.
    fn generate(&self, chunk: &mut Chunk, seed: u64) -> Result<(), GenerationError>;
}

/// Selects a built-in generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Perlin heightmap terrain
    #[default]
    Noise,
    /// Flat layered ground
    Flat,
    /// Nothing but air
    Empty,
}

impl GeneratorKind {
    /// Builds the generator with the given terrain parameters.
    #[must_use]
    pub fn build(self, terrain: TerrainConfig) -> Arc<dyn WorldGenerator> {
        match self {
            Self::Noise => Arc::new(NoiseGenerator::new(terrain)),
            Self::Flat => Arc::new(FlatGenerator::new(terrain)),
            Self::Empty => Arc::new(EmptyGenerator),
        }
    }
}

/// Terrain shaping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Horizontal noise scale (larger = smoother)
    pub terrain_scale: f64,
    /// Vertical amplitude of the heightmap in voxels
    pub height_scale: f64,
    /// Water fills air at or below this height
    pub sea_level: i64,
    /// Surface height used by the flat generator and as the noise baseline
    pub surface_height: i64,
    /// Everything at or below this height is bedrock
    pub bedrock_level: i64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_scale: 100.0,
            height_scale: 24.0,
            sea_level: 0,
            surface_height: 4,
            bedrock_level: -64,
        }
    }
}

/// Perlin heightmap generator.
///
/// Column height comes from a terrain octave plus a finer detail octave
/// sampled on the x/z plane; y is up.
pub struct NoiseGenerator {
    terrain: TerrainConfig,
}

impl NoiseGenerator {
    /// Largest seed accepted (Perlin seeds are 32-bit).
    pub const MAX_SEED: u64 = u32::MAX as u64;

    /// Creates a new noise generator.
    #[must_use]
    pub fn new(terrain: TerrainConfig) -> Self {
        Self { terrain }
    }

    /// Returns the terrain parameters.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainConfig {
        &self.terrain
    }

    fn column_height(&self, terrain: &Perlin, detail: &Perlin, x: i64, z: i64) -> i64 {
        let wx = x as f64 / self.terrain.terrain_scale;
        let wz = z as f64 / self.terrain.terrain_scale;
        let height = terrain.get([wx, wz]);
        let fine = detail.get([wx * 4.0, wz * 4.0]) * 0.1;
        self.terrain.surface_height + ((height + fine) * self.terrain.height_scale).round() as i64
    }

    /// Material for a voxel at height `y` in a column whose surface is `surface`.
    fn material_at(&self, y: i64, surface: i64) -> u16 {
        let t = &self.terrain;
        if y <= t.bedrock_level {
            return material::BEDROCK;
        }
        if y > surface {
            return if y <= t.sea_level {
                material::WATER
            } else {
                material::AIR
            };
        }
        let depth = surface - y;
        let peak = t.surface_height + (t.height_scale * 0.7).round() as i64;
        match depth {
            0 if surface >= peak => material::SNOW,
            0..=2 if surface <= t.sea_level + 1 => material::SAND,
            0 => material::GRASS,
            1..=3 => material::DIRT,
            _ => material::STONE,
        }
    }
}

impl WorldGenerator for NoiseGenerator {
    fn name(&self) -> &str {
        "noise"
    }

    fn generate(&self, chunk: &mut Chunk, seed: u64) -> Result<(), GenerationError> {
        let seed = u32::try_from(seed).map_err(|_| GenerationError::UnsupportedSeed {
            seed,
            max: Self::MAX_SEED,
        })?;
        let terrain_noise = Perlin::new(seed);
        let detail_noise = Perlin::new(seed.wrapping_add(1));

        let dims = chunk.dims();
        let coord = chunk.coord();
        for z in 0..dims.depth {
            for x in 0..dims.cols {
                let column = coord.voxel_at(LocalCoord::new(x, 0, z), dims);
                let surface = self.column_height(&terrain_noise, &detail_noise, column.x, column.z);
                for y in 0..dims.rows {
                    let wy = column.y + i64::from(y);
                    let tile = VoxelTile::new(self.material_at(wy, surface));
                    set_generated(chunk, LocalCoord::new(x, y, z), tile)?;
                }
            }
        }
        Ok(())
    }
}

/// Flat layered ground: bedrock, stone, three layers of dirt, grass on top.
pub struct FlatGenerator {
    terrain: TerrainConfig,
}

impl FlatGenerator {
    /// Creates a new flat generator.
    #[must_use]
    pub fn new(terrain: TerrainConfig) -> Self {
        Self { terrain }
    }

    fn material_at(&self, y: i64) -> u16 {
        let surface = self.terrain.surface_height;
        match y {
            y if y <= self.terrain.bedrock_level => material::BEDROCK,
            y if y > surface => material::AIR,
            y if y == surface => material::GRASS,
            y if y >= surface - 3 => material::DIRT,
            _ => material::STONE,
        }
    }
}

impl WorldGenerator for FlatGenerator {
    fn name(&self) -> &str {
        "flat"
    }

    fn generate(&self, chunk: &mut Chunk, _seed: u64) -> Result<(), GenerationError> {
        let dims = chunk.dims();
        let origin_y = chunk.coord().to_voxel_coord(dims).y;
        for y in 0..dims.rows {
            let tile = VoxelTile::new(self.material_at(origin_y + i64::from(y)));
            for z in 0..dims.depth {
                for x in 0..dims.cols {
                    set_generated(chunk, LocalCoord::new(x, y, z), tile)?;
                }
            }
        }
        Ok(())
    }
}

/// Generates nothing but air.
pub struct EmptyGenerator;

impl WorldGenerator for EmptyGenerator {
    fn name(&self) -> &str {
        "empty"
    }

    fn generate(&self, chunk: &mut Chunk, _seed: u64) -> Result<(), GenerationError> {
        chunk.fill(VoxelTile::air());
        Ok(())
    }
}

fn set_generated(chunk: &mut Chunk, local: LocalCoord, tile: VoxelTile) -> Result<(), GenerationError> {
    chunk
        .set(local, tile)
        .map_err(|e| GenerationError::Other(e.to_string()))
}

/// Runs `generator` on a fresh chunk, returning it `Ready` and clean.
pub(crate) fn generate_chunk(
    generator: &dyn WorldGenerator,
    coord: ChunkCoord,
    dims: ChunkDims,
    seed: u64,
) -> Result<Chunk, GenerationError> {
    let mut chunk = Chunk::new(coord, dims);
    chunk.begin_generation();
    generator.generate(&mut chunk, seed)?;
    chunk.mark_ready();
    chunk.mark_clean(); // Generated chunks start clean
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zone_common::ChunkState;

    fn noise() -> NoiseGenerator {
        NoiseGenerator::new(TerrainConfig::default())
    }

    #[test]
    fn test_generation_deterministic() {
        let coord = ChunkCoord::new(3, 0, -2);
        let chunk1 = generate_chunk(&noise(), coord, ChunkDims::DEFAULT, 42).expect("generate");
        let chunk2 = generate_chunk(&noise(), coord, ChunkDims::DEFAULT, 42).expect("generate");

        let bytes1: &[u8] = bytemuck::cast_slice(chunk1.tiles());
        let bytes2: &[u8] = bytemuck::cast_slice(chunk2.tiles());
        assert_eq!(bytes1, bytes2);
        assert_eq!(chunk1.state(), ChunkState::Ready);
        assert!(!chunk1.is_dirty());
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let coord = ChunkCoord::new(0, 0, 0);
        let chunk1 = generate_chunk(&noise(), coord, ChunkDims::DEFAULT, 42).expect("generate");
        let chunk2 = generate_chunk(&noise(), coord, ChunkDims::DEFAULT, 999).expect("generate");

        assert_ne!(chunk1.tiles(), chunk2.tiles());
    }

    #[test]
    fn test_noise_rejects_wide_seed() {
        let err = generate_chunk(&noise(), ChunkCoord::new(0, 0, 0), ChunkDims::DEFAULT, u64::MAX)
            .expect_err("seed out of range");
        assert_eq!(
            err,
            GenerationError::UnsupportedSeed {
                seed: u64::MAX,
                max: NoiseGenerator::MAX_SEED,
            }
        );
    }

    #[test]
    fn test_noise_layers() {
        let gen = noise();
        let dims = ChunkDims::DEFAULT;
        let deep = generate_chunk(&gen, ChunkCoord::new(0, -3, 0), dims, 7).expect("generate");
        let sky = generate_chunk(&gen, ChunkCoord::new(0, 4, 0), dims, 7).expect("generate");

        // -96..=-65 is all bedrock; 128..=159 is above any column
        assert_eq!(deep.count_where(VoxelTile::is_air), 0);
        assert_eq!(sky.count_where(|t| !t.is_air()), 0);
    }

    #[test]
    fn test_flat_layers() {
        let terrain = TerrainConfig {
            surface_height: 4,
            ..Default::default()
        };
        let chunk = generate_chunk(
            &FlatGenerator::new(terrain),
            ChunkCoord::new(5, 0, -9),
            ChunkDims::cubic(8),
            0,
        )
        .expect("generate");

        let at = |y| chunk.get(LocalCoord::new(2, y, 3)).expect("ready").material;
        assert_eq!(at(4), material::GRASS);
        assert_eq!(at(3), material::DIRT);
        assert_eq!(at(1), material::DIRT);
        assert_eq!(at(0), material::STONE);
        assert_eq!(at(5), material::AIR);
    }

    #[test]
    fn test_empty_generator() {
        let chunk = generate_chunk(&EmptyGenerator, ChunkCoord::new(0, 0, 0), ChunkDims::cubic(4), 1)
            .expect("generate");
        assert_eq!(chunk.count_where(VoxelTile::is_air), 64);
    }

    #[test]
    fn test_generator_kind_serde() {
        let kind: GeneratorKind = serde_json::from_str("\"flat\"").expect("parse");
        assert_eq!(kind, GeneratorKind::Flat);
        assert_eq!(kind.build(TerrainConfig::default()).name(), "flat");
    }
}
