//! Sparse chunk storage with lazy, single-flight generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};
use zone_common::{
    ChunkCoord, ChunkDims, LocalCoord, VoxelCoord, WorldError, WorldResult,
};

use crate::chunk::Chunk;
use crate::generation::{generate_chunk, WorldGenerator};
use crate::tile::VoxelTile;
use crate::view::ViewWindow;

/// Shared handle to a loaded chunk.
///
/// The lock serializes writes per chunk; reads of different chunks never
/// contend.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// World configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    /// Edge lengths of every chunk
    pub dims: ChunkDims,
    /// World seed passed to the generator
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            dims: ChunkDims::DEFAULT,
            seed: 12345,
        }
    }
}

/// Outcome slot for one in-progress generation.
struct InFlight {
    outcome: Mutex<Option<WorldResult<ChunkHandle>>>,
    done: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Blocks until the generating thread publishes its outcome.
    fn wait(&self) -> WorldResult<ChunkHandle> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }

    fn complete(&self, result: WorldResult<ChunkHandle>) {
        *self.outcome.lock() = Some(result);
        self.done.notify_all();
    }
}

/// Releases the in-flight record and wakes waiters, even if the generator panics.
struct FlightGuard<'a> {
    world: &'a World,
    coord: ChunkCoord,
    flight: Arc<InFlight>,
    outcome: Option<WorldResult<ChunkHandle>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Ready chunk is already in `chunks`, so removing the record never
        // exposes a gap to new requesters.
        self.world.in_flight.remove(&self.coord);
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(WorldError::GenerationFailed {
                coord: self.coord,
                reason: "generator panicked".into(),
            })
        });
        self.flight.complete(outcome);
    }
}

/// Summary of a [`World::prefetch`] run.
#[derive(Debug, Clone, Default)]
pub struct PrefetchReport {
    /// Coordinates requested
    pub requested: usize,
    /// Generator invocations performed during the run
    pub generated: u64,
    /// Coordinates that failed, with their errors
    pub failed: Vec<(ChunkCoord, WorldError)>,
    /// Wall time
    pub elapsed: Duration,
}

impl PrefetchReport {
    /// Coordinates that ended up loaded.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.requested - self.failed.len()
    }
}

/// An infinite voxel world made of lazily generated chunks.
pub struct World {
    /// Configuration
    config: WorldConfig,
    /// Ready chunks
    chunks: DashMap<ChunkCoord, ChunkHandle>,
    /// Generations in progress, at most one per coordinate
    in_flight: DashMap<ChunkCoord, Arc<InFlight>>,
    /// Chunk content generator
    generator: Arc<dyn WorldGenerator>,
    /// Total generator invocations
    generations: AtomicU64,
}

impl World {
    /// Creates a new world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDims`] if any chunk axis is zero.
    pub fn new(config: WorldConfig, generator: Arc<dyn WorldGenerator>) -> WorldResult<Self> {
        if !config.dims.is_valid() {
            return Err(WorldError::InvalidDims { dims: config.dims });
        }
        info!(
            "World created: generator={}, seed={}, chunk={}",
            generator.name(),
            config.seed,
            config.dims
        );
        Ok(Self {
            config,
            chunks: DashMap::new(),
            in_flight: DashMap::new(),
            generator,
            generations: AtomicU64::new(0),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Returns the generator's name.
    #[must_use]
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Chunk containing a voxel.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if the chunk index overflows `i32`.
    pub fn chunk_coord_of(&self, voxel: VoxelCoord) -> WorldResult<ChunkCoord> {
        voxel.to_chunk_coord(self.config.dims)
    }

    /// Position of a voxel inside its chunk.
    #[must_use]
    pub const fn local_coord_of(&self, voxel: VoxelCoord) -> LocalCoord {
        voxel.to_local_coord(self.config.dims)
    }

    /// Returns the chunk at `coord`, generating it first if absent.
    ///
    /// Concurrent callers for the same absent coordinate share one
    /// generation. On failure nothing is inserted and a later call retries.
    pub fn get_or_create_chunk(&self, coord: ChunkCoord) -> WorldResult<ChunkHandle> {
        if let Some(chunk) = self.chunks.get(&coord) {
            return Ok(Arc::clone(chunk.value()));
        }

        let flight = match self.in_flight.entry(coord) {
            Entry::Occupied(entry) => {
                let flight = Arc::clone(entry.get());
                drop(entry);
                return flight.wait();
            },
            Entry::Vacant(entry) => {
                // A generation may have finished between the first lookup and now.
                if let Some(chunk) = self.chunks.get(&coord) {
                    return Ok(Arc::clone(chunk.value()));
                }
                let flight = Arc::new(InFlight::new());
                entry.insert(Arc::clone(&flight));
                flight
            },
        };

        let mut guard = FlightGuard {
            world: self,
            coord,
            flight,
            outcome: None,
        };

        self.generations.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        match generate_chunk(self.generator.as_ref(), coord, self.config.dims, self.config.seed) {
            Ok(chunk) => {
                let handle = Arc::new(RwLock::new(chunk));
                self.chunks.insert(coord, Arc::clone(&handle));
                debug!(
                    "Generated chunk {coord} in {}us",
                    start.elapsed().as_micros()
                );
                guard.outcome = Some(Ok(Arc::clone(&handle)));
                Ok(handle)
            },
            Err(e) => {
                warn!("Failed to generate chunk {coord}: {e}");
                let err = WorldError::GenerationFailed {
                    coord,
                    reason: e.to_string(),
                };
                guard.outcome = Some(Err(err.clone()));
                Err(err)
            },
        }
    }

    /// Reads a voxel, generating its chunk if needed.
    pub fn get_voxel(&self, voxel: VoxelCoord) -> WorldResult<VoxelTile> {
        let chunk = self.get_or_create_chunk(self.chunk_coord_of(voxel)?)?;
        let tile = chunk.read().get(self.local_coord_of(voxel));
        tile
    }

    /// Writes a voxel, generating its chunk if needed.
    pub fn set_voxel(&self, voxel: VoxelCoord, tile: VoxelTile) -> WorldResult<()> {
        let chunk = self.get_or_create_chunk(self.chunk_coord_of(voxel)?)?;
        let result = chunk.write().set(self.local_coord_of(voxel), tile);
        result
    }

    /// Chunk coordinates intersecting the inclusive box, x fastest, then y, then z.
    ///
    /// Corners may be given in any order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if either corner lies outside the
    /// addressable world.
    pub fn chunks_in_region(&self, a: VoxelCoord, b: VoxelCoord) -> WorldResult<Vec<ChunkCoord>> {
        let lo = self.chunk_coord_of(a.min(b))?;
        let hi = self.chunk_coord_of(a.max(b))?;
        let mut coords = Vec::new();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    coords.push(ChunkCoord::new(x, y, z));
                }
            }
        }
        Ok(coords)
    }

    /// Ensures every chunk under the inclusive box is loaded and returns a
    /// read-only window over it. Chunk data is not copied.
    pub fn query_region(&self, a: VoxelCoord, b: VoxelCoord) -> WorldResult<ViewWindow> {
        let coords = self.chunks_in_region(a, b)?;
        let mut chunks = Vec::with_capacity(coords.len());
        for coord in coords {
            let handle = self.get_or_create_chunk(coord)?;
            chunks.push((coord, Arc::downgrade(&handle)));
        }
        Ok(ViewWindow::new(a.min(b), a.max(b), self.config.dims, chunks))
    }

    /// Removes a chunk unconditionally. Returns whether one was loaded.
    ///
    /// Views built before the eviction report [`WorldError::ChunkEvicted`]
    /// for voxels in this chunk.
    pub fn evict(&self, coord: ChunkCoord) -> bool {
        let removed = self.chunks.remove(&coord).is_some();
        if removed {
            debug!("Evicted chunk {coord}");
        }
        removed
    }

    /// Generates many chunks on `workers` threads.
    ///
    /// Failures are collected in the report instead of aborting the run.
    pub fn prefetch(&self, coords: &[ChunkCoord], workers: usize) -> PrefetchReport {
        let start = Instant::now();
        let generations_before = self.generations.load(Ordering::Relaxed);
        let workers = workers.clamp(1, coords.len().max(1));

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<ChunkCoord>();
        let (fail_tx, fail_rx) = crossbeam_channel::unbounded::<(ChunkCoord, WorldError)>();
        for coord in coords {
            let _ = task_tx.send(*coord);
        }
        drop(task_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let fail_tx = fail_tx.clone();
                scope.spawn(move || {
                    while let Ok(coord) = task_rx.recv() {
                        if let Err(e) = self.get_or_create_chunk(coord) {
                            let _ = fail_tx.send((coord, e));
                        }
                    }
                });
            }
        });
        drop(fail_tx);

        let report = PrefetchReport {
            requested: coords.len(),
            generated: self.generations.load(Ordering::Relaxed) - generations_before,
            failed: fail_rx.into_iter().collect(),
            elapsed: start.elapsed(),
        };
        info!(
            "Prefetched {} chunks ({} generated, {} failed) on {workers} workers in {:?}",
            report.requested,
            report.generated,
            report.failed.len(),
            report.elapsed
        );
        report
    }

    /// Checks if a chunk is loaded.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Returns the number of loaded chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the coordinates of all loaded chunks, in no particular order.
    #[must_use]
    pub fn loaded_coords(&self) -> Vec<ChunkCoord> {
        self.chunks.iter().map(|e| *e.key()).collect()
    }

    /// Total generator invocations since creation.
    #[must_use]
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }
}
