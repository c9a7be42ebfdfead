//! Voxel tile data.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Material IDs understood by the built-in generators.
pub mod material {
    /// Air / empty space
    pub const AIR: u16 = 0;
    /// Water
    pub const WATER: u16 = 1;
    /// Sand (beaches)
    pub const SAND: u16 = 2;
    /// Grass (topsoil)
    pub const GRASS: u16 = 3;
    /// Dirt
    pub const DIRT: u16 = 4;
    /// Stone
    pub const STONE: u16 = 5;
    /// Snow (peaks)
    pub const SNOW: u16 = 6;
    /// Bedrock (world floor)
    pub const BEDROCK: u16 = 7;

    /// Human-readable material name.
    #[must_use]
    pub const fn name(material: u16) -> &'static str {
        match material {
            AIR => "air",
            WATER => "water",
            SAND => "sand",
            GRASS => "grass",
            DIRT => "dirt",
            STONE => "stone",
            SNOW => "snow",
            BEDROCK => "bedrock",
            _ => "unknown",
        }
    }
}

/// Tile flag bits.
pub struct TileFlags;

impl TileFlags {
    /// Blocks movement
    pub const SOLID: u8 = 1 << 0;
    /// Flows
    pub const LIQUID: u8 = 1 << 1;
}

/// A single voxel.
///
/// 4 bytes, plain old data, so a chunk's tile buffer can be viewed as raw
/// bytes for persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct VoxelTile {
    /// Material type ID (0 = air)
    pub material: u16,
    /// Light level (0-255)
    pub light: u8,
    /// Tile flags (see [`TileFlags`])
    pub flags: u8,
}

impl VoxelTile {
    /// Creates a tile of the given material with flags derived from it.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        let flags = match id {
            material::AIR => 0,
            material::WATER => TileFlags::LIQUID,
            _ => TileFlags::SOLID,
        };
        Self {
            material: id,
            light: 0,
            flags,
        }
    }

    /// Creates an air tile.
    #[must_use]
    pub const fn air() -> Self {
        Self::new(material::AIR)
    }

    /// Checks if this tile is air.
    #[must_use]
    pub const fn is_air(&self) -> bool {
        self.material == material::AIR
    }

    /// Checks if this tile is solid.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.flags & TileFlags::SOLID != 0
    }

    /// Checks if this tile is liquid.
    #[must_use]
    pub const fn is_liquid(&self) -> bool {
        self.flags & TileFlags::LIQUID != 0
    }

    /// Returns the tile with a light level set.
    #[must_use]
    pub const fn with_light(mut self, light: u8) -> Self {
        self.light = light;
        self
    }

    /// Returns the tile with a flag set.
    #[must_use]
    pub const fn with_flag(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }
}
