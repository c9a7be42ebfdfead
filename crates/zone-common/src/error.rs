//! Error types for Zone.

use thiserror::Error;

use crate::coords::{ChunkCoord, ChunkDims};
use crate::state::ChunkState;

/// World, chunk, and view errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Chunk dimensions with a zero axis
    #[error("Invalid chunk dimensions {dims}")]
    InvalidDims {
        /// Rejected dimensions
        dims: ChunkDims,
    },

    /// Coordinate outside an inclusive range: chunk bounds, view region or addressable world
    #[error("Coordinate {coord:?} outside bounds {min:?}..={max:?}")]
    OutOfBounds {
        /// Offending coordinate
        coord: [i64; 3],
        /// Inclusive lower corner
        min: [i64; 3],
        /// Inclusive upper corner
        max: [i64; 3],
    },

    /// Tile read before generation finished
    #[error("Chunk {coord} is not ready (state: {state})")]
    NotReady {
        /// Chunk coordinate
        coord: ChunkCoord,
        /// State at the time of the read
        state: ChunkState,
    },

    /// Generator could not produce content; retrying is allowed
    #[error("Generation failed for chunk {coord}: {reason}")]
    GenerationFailed {
        /// Chunk coordinate
        coord: ChunkCoord,
        /// Generator's explanation
        reason: String,
    },

    /// A view referenced a chunk that has since been evicted
    #[error("Chunk {coord} was evicted")]
    ChunkEvicted {
        /// Chunk coordinate
        coord: ChunkCoord,
    },
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
