//! Coordinate types for voxel, chunk, and local positions.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Edge lengths of every chunk in a world.
///
/// Fixed when a world is constructed and copied into each chunk, so all
/// chunks of one world share the same dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    /// Voxels along x
    pub cols: u32,
    /// Voxels along y
    pub rows: u32,
    /// Voxels along z
    pub depth: u32,
}

impl ChunkDims {
    /// Default 32×32×32 chunk.
    pub const DEFAULT: Self = Self::cubic(32);

    /// Creates chunk dimensions.
    #[must_use]
    pub const fn new(cols: u32, rows: u32, depth: u32) -> Self {
        Self { cols, rows, depth }
    }

    /// Creates cubic chunk dimensions.
    #[must_use]
    pub const fn cubic(edge: u32) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Number of voxels in one chunk.
    #[must_use]
    pub const fn volume(self) -> usize {
        (self.cols as usize) * (self.rows as usize) * (self.depth as usize)
    }

    /// Checks that a local coordinate lies inside a chunk.
    #[must_use]
    pub const fn contains(self, local: LocalCoord) -> bool {
        local.x < self.cols && local.y < self.rows && local.z < self.depth
    }

    /// Checks every axis is non-zero.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.cols > 0 && self.rows > 0 && self.depth > 0
    }
}

impl fmt::Display for ChunkDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.cols, self.rows, self.depth)
    }
}

impl Default for ChunkDims {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Global voxel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct VoxelCoord {
    /// X coordinate in world space
    pub x: i64,
    /// Y coordinate in world space (up)
    pub y: i64,
    /// Z coordinate in world space
    pub z: i64,
}

impl VoxelCoord {
    /// Creates a new voxel coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Converts to the coordinate of the chunk containing this voxel.
    ///
    /// Floor division: `-1` lands in chunk `-1`, not `0`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] when the chunk index on some axis
    /// does not fit in `i32` (or `dims` has a zero axis). The bounds carried
    /// by the error are the addressable voxel range for `dims`.
    pub fn to_chunk_coord(self, dims: ChunkDims) -> WorldResult<ChunkCoord> {
        let axis = |v: i64, size: u32| {
            v.checked_div_euclid(i64::from(size))
                .and_then(|c| i32::try_from(c).ok())
        };
        match (
            axis(self.x, dims.cols),
            axis(self.y, dims.rows),
            axis(self.z, dims.depth),
        ) {
            (Some(x), Some(y), Some(z)) => Ok(ChunkCoord { x, y, z }),
            _ => {
                let (min, max) = addressable_range(dims);
                Err(WorldError::OutOfBounds {
                    coord: self.to_array(),
                    min,
                    max,
                })
            },
        }
    }

    /// Converts to the local coordinate within its chunk.
    ///
    /// # Panics
    ///
    /// Panics if `dims` has a zero axis.
    #[must_use]
    pub const fn to_local_coord(self, dims: ChunkDims) -> LocalCoord {
        LocalCoord {
            x: self.x.rem_euclid(dims.cols as i64) as u32,
            y: self.y.rem_euclid(dims.rows as i64) as u32,
            z: self.z.rem_euclid(dims.depth as i64) as u32,
        }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Returns the coordinate as an array.
    #[must_use]
    pub const fn to_array(self) -> [i64; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Inclusive voxel range whose chunk indices fit in `i32`.
fn addressable_range(dims: ChunkDims) -> ([i64; 3], [i64; 3]) {
    let lo = |size: u32| i64::from(i32::MIN) * i64::from(size);
    let hi = |size: u32| {
        i64::from(i32::MAX) * i64::from(size) + i64::from(size.saturating_sub(1))
    };
    (
        [lo(dims.cols), lo(dims.rows), lo(dims.depth)],
        [hi(dims.cols), hi(dims.rows), hi(dims.depth)],
    )
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts to the voxel coordinate of the chunk's minimum corner.
    #[must_use]
    pub const fn to_voxel_coord(self, dims: ChunkDims) -> VoxelCoord {
        VoxelCoord {
            x: (self.x as i64) * (dims.cols as i64),
            y: (self.y as i64) * (dims.rows as i64),
            z: (self.z as i64) * (dims.depth as i64),
        }
    }

    /// Combines this chunk coordinate with a local offset into a voxel coordinate.
    #[must_use]
    pub const fn voxel_at(self, local: LocalCoord, dims: ChunkDims) -> VoxelCoord {
        let origin = self.to_voxel_coord(dims);
        VoxelCoord {
            x: origin.x + local.x as i64,
            y: origin.y + local.y as i64,
            z: origin.z + local.z as i64,
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Local coordinate within a chunk (0 to axis size - 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub x: u32,
    /// Y coordinate within chunk
    pub y: u32,
    /// Z coordinate within chunk
    pub z: u32,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Converts to linear index for array access.
    ///
    /// Row-major with x fastest: `x + y*cols + z*cols*rows`. Chunk
    /// serialization depends on this order.
    #[must_use]
    pub const fn to_index(self, dims: ChunkDims) -> usize {
        let cols = dims.cols as usize;
        let rows = dims.rows as usize;
        (self.x as usize) + (self.y as usize) * cols + (self.z as usize) * cols * rows
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, dims: ChunkDims) -> Self {
        let cols = dims.cols as usize;
        let rows = dims.rows as usize;
        Self {
            x: (index % cols) as u32,
            y: ((index / cols) % rows) as u32,
            z: (index / (cols * rows)) as u32,
        }
    }
}

impl fmt::Display for LocalCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
