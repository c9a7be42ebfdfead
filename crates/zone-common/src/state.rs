//! Chunk generation lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation state of a chunk.
///
/// Transitions only move forward: `Empty → Generating → Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ChunkState {
    /// Allocated, no content yet.
    #[default]
    Empty,
    /// Handed to a generator.
    Generating,
    /// Every tile populated.
    Ready,
}

impl ChunkState {
    /// Whether tiles may be read.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Generating => "generating",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}
