//! # Zone Common
//!
//! Shared types for the Zone voxel world:
//! - Coordinate types (voxel, chunk, local) and chunk dimensions
//! - Chunk generation state
//! - World error taxonomy
//! - Schema versions for chunk persistence

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod state;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::state::*;
    pub use crate::version::*;
}

pub use prelude::*;
