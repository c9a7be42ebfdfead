//! Read-only windows over a region of the world.

use std::sync::Weak;

use ahash::AHashMap;
use parking_lot::RwLock;
use zone_common::{ChunkCoord, ChunkDims, VoxelCoord, WorldError, WorldResult};

use crate::chunk::Chunk;
use crate::tile::VoxelTile;

/// Read-only view of an inclusive box of voxels.
///
/// Built by [`crate::World::query_region`]. Holds weak references only:
/// evicting a chunk the window spans makes reads in it fail with
/// [`WorldError::ChunkEvicted`].
#[derive(Debug, Clone)]
pub struct ViewWindow {
    min: VoxelCoord,
    max: VoxelCoord,
    dims: ChunkDims,
    chunks: AHashMap<ChunkCoord, Weak<RwLock<Chunk>>>,
}

impl ViewWindow {
    pub(crate) fn new(
        min: VoxelCoord,
        max: VoxelCoord,
        dims: ChunkDims,
        chunks: Vec<(ChunkCoord, Weak<RwLock<Chunk>>)>,
    ) -> Self {
        Self {
            min,
            max,
            dims,
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Inclusive lower corner.
    #[must_use]
    pub const fn min(&self) -> VoxelCoord {
        self.min
    }

    /// Inclusive upper corner.
    #[must_use]
    pub const fn max(&self) -> VoxelCoord {
        self.max
    }

    /// Voxels along each axis.
    #[must_use]
    pub fn extent(&self) -> [u64; 3] {
        [
            self.max.x.abs_diff(self.min.x).saturating_add(1),
            self.max.y.abs_diff(self.min.y).saturating_add(1),
            self.max.z.abs_diff(self.min.z).saturating_add(1),
        ]
    }

    /// Number of voxels in the window.
    #[must_use]
    pub fn volume(&self) -> u64 {
        let [x, y, z] = self.extent();
        x.saturating_mul(y).saturating_mul(z)
    }

    /// Whether the voxel lies inside the declared region.
    #[must_use]
    pub fn contains(&self, voxel: VoxelCoord) -> bool {
        (self.min.x..=self.max.x).contains(&voxel.x)
            && (self.min.y..=self.max.y).contains(&voxel.y)
            && (self.min.z..=self.max.z).contains(&voxel.z)
    }

    /// Chunks the window spans, sorted x fastest, then y, then z.
    #[must_use]
    pub fn chunk_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.keys().copied().collect();
        coords.sort_unstable_by_key(|c| (c.z, c.y, c.x));
        coords
    }

    /// Reads the tile at a voxel inside the window.
    pub fn at(&self, voxel: VoxelCoord) -> WorldResult<VoxelTile> {
        if !self.contains(voxel) {
            return Err(WorldError::OutOfBounds {
                coord: voxel.to_array(),
                min: self.min.to_array(),
                max: self.max.to_array(),
            });
        }
        let coord = voxel.to_chunk_coord(self.dims)?;
        let chunk = self
            .chunks
            .get(&coord)
            .and_then(Weak::upgrade)
            .ok_or(WorldError::ChunkEvicted { coord })?;
        let tile = chunk.read().get(voxel.to_local_coord(self.dims));
        tile
    }

    /// Iterates every voxel, x fastest, then y, then z.
    ///
    /// Each call starts a fresh pass; tiles are read lazily.
    #[must_use]
    pub fn iter(&self) -> ViewIter<'_> {
        ViewIter {
            window: self,
            extent: self.extent(),
            next: 0,
            end: self.volume(),
        }
    }
}

impl<'a> IntoIterator for &'a ViewWindow {
    type Item = WorldResult<(VoxelCoord, VoxelTile)>;
    type IntoIter = ViewIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`ViewWindow`].
#[derive(Debug, Clone)]
pub struct ViewIter<'a> {
    window: &'a ViewWindow,
    extent: [u64; 3],
    next: u64,
    end: u64,
}

impl ViewIter<'_> {
    fn coord_at(&self, index: u64) -> VoxelCoord {
        let [ex, ey, _] = self.extent;
        let min = self.window.min;
        VoxelCoord::new(
            min.x + (index % ex) as i64,
            min.y + ((index / ex) % ey) as i64,
            min.z + (index / (ex * ey)) as i64,
        )
    }
}

impl Iterator for ViewIter<'_> {
    type Item = WorldResult<(VoxelCoord, VoxelTile)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let coord = self.coord_at(self.next);
        self.next += 1;
        Some(self.window.at(coord).map(|tile| (coord, tile)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ViewIter<'_> {}
