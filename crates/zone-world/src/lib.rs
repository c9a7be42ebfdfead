//! # Zone World
//!
//! Chunked voxel world for Zone.
//!
//! This crate handles:
//! - Voxel tiles and fixed-size chunks
//! - Lazy, single-flight chunk generation
//! - Pluggable procedural generators
//! - Read-only windows for renderers
//! - Chunk serialization

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod generation;
pub mod tile;
pub mod view;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::tile::*;
    pub use crate::view::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zone_common::{ChunkCoord, VoxelCoord};

    #[test]
    fn test_generated_chunk_survives_serialization() {
        let world = World::new(
            WorldConfig::default(),
            GeneratorKind::Noise.build(TerrainConfig::default()),
        )
        .expect("valid dims");
        let chunk = world
            .get_or_create_chunk(ChunkCoord::new(0, 0, 0))
            .expect("generate");
        let bytes = chunk.read().serialize().expect("serialize failed");
        let loaded = Chunk::deserialize(&bytes).expect("deserialize failed");

        assert_eq!(loaded.tiles(), chunk.read().tiles());
    }

    #[test]
    fn test_region_read_through_window_matches_world() {
        let world = World::new(
            WorldConfig::default(),
            Arc::new(NoiseGenerator::new(TerrainConfig::default())),
        )
        .expect("valid dims");
        let window = world
            .query_region(VoxelCoord::new(-8, -4, -8), VoxelCoord::new(8, 12, 8))
            .expect("query");

        for item in &window {
            let (coord, tile) = item.expect("readable");
            assert_eq!(world.get_voxel(coord), Ok(tile));
        }
    }
}
