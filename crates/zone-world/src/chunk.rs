//! Chunk data structure and serialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zone_common::{
    ChunkCoord, ChunkDims, ChunkState, LocalCoord, MagicBytes, SchemaVersion, WorldError,
    WorldResult,
};

use crate::tile::VoxelTile;

/// Chunk persistence errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Serialization failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
    /// Deserialization failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
    /// Invalid magic bytes
    #[error("Invalid chunk format")]
    InvalidFormat,
    /// Version mismatch
    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version
        actual: String,
    },
    /// Compression failed
    #[error("Compression failed: {0}")]
    CompressionFailed(String),
    /// Only ready chunks can be written out
    #[error("Chunk {0} is not ready")]
    NotReady(ChunkCoord),
}

/// Result type for chunk persistence.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Compression tag for lz4-compressed tiles.
const COMPRESSION_LZ4: u8 = 1;

/// Chunk header for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// Magic bytes for format identification
    pub magic: [u8; 4],
    /// Schema version
    pub version: SchemaVersion,
    /// Chunk coordinate
    pub coord: ChunkCoord,
    /// Chunk dimensions
    pub dims: ChunkDims,
    /// Compression type (1 = lz4)
    pub compression: u8,
}

impl ChunkHeader {
    /// Creates a new header.
    #[must_use]
    pub fn new(coord: ChunkCoord, dims: ChunkDims) -> Self {
        Self {
            magic: MagicBytes::CHUNK.0,
            version: SchemaVersion::CHUNK_HEADER,
            coord,
            dims,
            compression: COMPRESSION_LZ4,
        }
    }

    /// Validates the header.
    pub fn validate(&self) -> ChunkResult<()> {
        if self.magic != MagicBytes::CHUNK.0 {
            return Err(ChunkError::InvalidFormat);
        }
        if !SchemaVersion::CHUNK_HEADER.can_read(&self.version) {
            return Err(ChunkError::VersionMismatch {
                expected: SchemaVersion::CHUNK_HEADER.to_string(),
                actual: self.version.to_string(),
            });
        }
        if self.compression != COMPRESSION_LZ4 {
            return Err(ChunkError::DeserializationFailed(format!(
                "unknown compression {}",
                self.compression
            )));
        }
        if !self.dims.is_valid() {
            return Err(ChunkError::DeserializationFailed(
                "zero chunk dimension".into(),
            ));
        }
        Ok(())
    }
}

/// A fixed-size 3D block of voxel tiles.
#[derive(Debug)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Edge lengths, shared with every chunk of the owning world
    dims: ChunkDims,
    /// Tile data, `dims.volume()` entries, x fastest
    tiles: Vec<VoxelTile>,
    /// Generation lifecycle
    state: ChunkState,
    /// Whether chunk has been modified since last save
    dirty: bool,
}

impl Chunk {
    /// Creates a new empty chunk filled with air.
    #[must_use]
    pub fn new(coord: ChunkCoord, dims: ChunkDims) -> Self {
        Self {
            coord,
            dims,
            tiles: vec![VoxelTile::air(); dims.volume()],
            state: ChunkState::Empty,
            dirty: false,
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the chunk dimensions.
    #[must_use]
    pub const fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Returns the generation state.
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Moves an `Empty` chunk to `Generating`. No effect in later states.
    pub fn begin_generation(&mut self) {
        if self.state == ChunkState::Empty {
            self.state = ChunkState::Generating;
        }
    }

    /// Marks the chunk `Ready`.
    pub fn mark_ready(&mut self) {
        self.state = ChunkState::Ready;
    }

    /// Returns whether the chunk is dirty.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Gets the tile at a local coordinate.
    pub fn get(&self, local: LocalCoord) -> WorldResult<VoxelTile> {
        let index = self.index_of(local)?;
        if !self.state.is_ready() {
            return Err(WorldError::NotReady {
                coord: self.coord,
                state: self.state,
            });
        }
        Ok(self.tiles[index])
    }

    /// Sets the tile at a local coordinate. Allowed in any state.
    pub fn set(&mut self, local: LocalCoord, tile: VoxelTile) -> WorldResult<()> {
        let index = self.index_of(local)?;
        self.tiles[index] = tile;
        self.dirty = true;
        Ok(())
    }

    /// Overwrites every tile.
    pub fn fill(&mut self, tile: VoxelTile) {
        self.tiles.fill(tile);
        self.dirty = true;
    }

    /// Returns all tiles in storage order.
    #[must_use]
    pub fn tiles(&self) -> &[VoxelTile] {
        &self.tiles
    }

    /// Counts tiles matching a predicate.
    #[must_use]
    pub fn count_where(&self, pred: impl Fn(&VoxelTile) -> bool) -> usize {
        self.tiles.iter().filter(|t| pred(t)).count()
    }

    fn index_of(&self, local: LocalCoord) -> WorldResult<usize> {
        if !self.dims.contains(local) {
            return Err(WorldError::OutOfBounds {
                coord: [i64::from(local.x), i64::from(local.y), i64::from(local.z)],
                min: [0; 3],
                max: [
                    i64::from(self.dims.cols) - 1,
                    i64::from(self.dims.rows) - 1,
                    i64::from(self.dims.depth) - 1,
                ],
            });
        }
        Ok(local.to_index(self.dims))
    }

    /// Serializes a ready chunk to bytes.
    ///
    /// Layout: `u32` LE header length, bincode header, lz4 block of raw
    /// tiles in storage order.
    pub fn serialize(&self) -> ChunkResult<Vec<u8>> {
        if !self.state.is_ready() {
            return Err(ChunkError::NotReady(self.coord));
        }
        let header = ChunkHeader::new(self.coord, self.dims);

        let header_bytes = bincode::serialize(&header)
            .map_err(|e| ChunkError::SerializationFailed(e.to_string()))?;

        let tile_bytes: &[u8] = bytemuck::cast_slice(&self.tiles);
        let compressed = lz4_flex::compress_prepend_size(tile_bytes);

        let mut result = Vec::with_capacity(header_bytes.len() + compressed.len() + 4);
        result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        result.extend_from_slice(&header_bytes);
        result.extend_from_slice(&compressed);

        Ok(result)
    }

    /// Deserializes a chunk from bytes. The result is `Ready` and clean.
    pub fn deserialize(bytes: &[u8]) -> ChunkResult<Self> {
        if bytes.len() < 8 {
            return Err(ChunkError::DeserializationFailed("data too short".into()));
        }

        let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + header_len {
            return Err(ChunkError::DeserializationFailed(
                "header length mismatch".into(),
            ));
        }

        let header: ChunkHeader = bincode::deserialize(&bytes[4..4 + header_len])
            .map_err(|e| ChunkError::DeserializationFailed(e.to_string()))?;
        header.validate()?;

        let compressed = &bytes[4 + header_len..];
        let tile_bytes = lz4_flex::decompress_size_prepended(compressed)
            .map_err(|e| ChunkError::CompressionFailed(e.to_string()))?;

        let tile_size = std::mem::size_of::<VoxelTile>();
        if tile_bytes.len() != header.dims.volume() * tile_size {
            return Err(ChunkError::DeserializationFailed(
                "tile data size mismatch".into(),
            ));
        }

        let tiles: Vec<VoxelTile> = tile_bytes
            .chunks_exact(tile_size)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        Ok(Self {
            coord: header.coord,
            dims: header.dims,
            tiles,
            state: ChunkState::Ready,
            dirty: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::material;

    fn ready_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0), ChunkDims::DEFAULT);
        chunk.mark_ready();
        chunk
    }

    #[test]
    fn test_bounds_edge() {
        let mut chunk = ready_chunk();
        let stone = VoxelTile::new(material::STONE);

        assert!(chunk.set(LocalCoord::new(31, 31, 31), stone).is_ok());
        assert_eq!(chunk.get(LocalCoord::new(31, 31, 31)), Ok(stone));

        assert!(matches!(
            chunk.get(LocalCoord::new(32, 0, 0)),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert!(matches!(
            chunk.set(LocalCoord::new(0, 32, 0), stone),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert!(matches!(
            chunk.get(LocalCoord::new(0, 0, 32)),
            Err(WorldError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_before_ready() {
        let mut chunk = Chunk::new(ChunkCoord::new(2, 0, 0), ChunkDims::DEFAULT);
        assert_eq!(
            chunk.get(LocalCoord::new(0, 0, 0)),
            Err(WorldError::NotReady {
                coord: ChunkCoord::new(2, 0, 0),
                state: ChunkState::Empty,
            })
        );

        chunk.begin_generation();
        assert_eq!(chunk.state(), ChunkState::Generating);
        assert!(chunk.set(LocalCoord::new(1, 1, 1), VoxelTile::new(material::DIRT)).is_ok());
        assert!(matches!(
            chunk.get(LocalCoord::new(1, 1, 1)),
            Err(WorldError::NotReady { .. })
        ));

        chunk.mark_ready();
        assert_eq!(
            chunk.get(LocalCoord::new(1, 1, 1)),
            Ok(VoxelTile::new(material::DIRT))
        );
    }

    #[test]
    fn test_state_never_regresses() {
        let mut chunk = ready_chunk();
        chunk.begin_generation();
        assert_eq!(chunk.state(), ChunkState::Ready);
    }

    #[test]
    fn test_storage_order() {
        let dims = ChunkDims::new(4, 3, 2);
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0), dims);
        let marker = VoxelTile::new(material::SAND);
        chunk
            .set(LocalCoord::new(1, 2, 1), marker)
            .expect("in bounds");

        assert_eq!(chunk.tiles()[1 + 2 * 4 + 4 * 3], marker);
        assert_eq!(chunk.count_where(|t| *t == marker), 1);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut chunk = Chunk::new(ChunkCoord::new(-1, 4, 7), ChunkDims::new(8, 16, 4));
        chunk.fill(VoxelTile::new(material::STONE));
        chunk
            .set(LocalCoord::new(7, 15, 3), VoxelTile::new(material::WATER).with_light(9))
            .expect("in bounds");
        chunk.mark_ready();

        let bytes = chunk.serialize().expect("serialize failed");
        let loaded = Chunk::deserialize(&bytes).expect("deserialize failed");

        assert_eq!(loaded.coord(), chunk.coord());
        assert_eq!(loaded.dims(), chunk.dims());
        assert_eq!(loaded.state(), ChunkState::Ready);
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.tiles(), chunk.tiles());
    }

    #[test]
    fn test_serialize_requires_ready() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0, 0), ChunkDims::DEFAULT);
        assert!(matches!(chunk.serialize(), Err(ChunkError::NotReady(_))));
    }

    #[test]
    fn test_deserialize_rejects_bad_magic() {
        let bytes = ready_chunk().serialize().expect("serialize failed");
        let mut corrupted = bytes.clone();
        corrupted[4] ^= 0xFF;
        assert!(matches!(
            Chunk::deserialize(&corrupted),
            Err(ChunkError::InvalidFormat)
        ));
        assert!(Chunk::deserialize(&bytes[..6]).is_err());
    }
}
