//! # Zone Engine
//!
//! Entry point for the Zone voxel world: loads configuration, builds the
//! world, pre-generates the chunks around the origin and reports what the
//! surface looks like.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};
use zone_common::{ChunkCoord, VoxelCoord};
use zone_world::{material, World};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing; the config's filter replaces the default once loaded.
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::from_default_env().add_directive("zone=info".parse()?));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("Zone starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = EngineConfig::config_path();
    let mut config = EngineConfig::load_from(&config_path);
    config.validate();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        filter_handle.reload(EnvFilter::try_new(&config.log_filter)?)?;
    }

    if !config_path.exists() {
        if let Err(e) = config.save_to(&config_path) {
            warn!("Failed to write default config: {e}");
        }
    }

    run(&config)?;

    info!("Zone shutdown complete");
    Ok(())
}

/// Builds the world, prefetches around the origin and logs a material histogram.
fn run(config: &EngineConfig) -> Result<()> {
    let world_config = config.world_config();
    let generator = config.generator.build(config.terrain);
    let world = World::new(world_config, generator)?;

    let radius = config.prefetch_radius as i32;
    let span_lo = ChunkCoord::new(-radius, -radius, -radius);
    let span_hi = ChunkCoord::new(radius, radius, radius);
    let dims = world_config.dims;
    let lo = span_lo.to_voxel_coord(dims);
    let hi_origin = span_hi.to_voxel_coord(dims);
    let hi = VoxelCoord::new(
        hi_origin.x + i64::from(dims.cols) - 1,
        hi_origin.y + i64::from(dims.rows) - 1,
        hi_origin.z + i64::from(dims.depth) - 1,
    );

    let coords = world.chunks_in_region(lo, hi)?;
    let report = world.prefetch(&coords, config.worker_threads);
    for (coord, e) in &report.failed {
        warn!("Chunk {coord} unavailable: {e}");
    }
    if report.loaded() == 0 && report.requested > 0 {
        bail!("no chunk could be generated");
    }

    // Surface band: a few voxels either side of sea level and the baseline.
    let terrain = &config.terrain;
    let band_lo = terrain.sea_level.min(terrain.surface_height) - 4;
    let band_hi = terrain.sea_level.max(terrain.surface_height) + 4;
    let window = world.query_region(
        VoxelCoord::new(lo.x, band_lo.clamp(lo.y, hi.y), lo.z),
        VoxelCoord::new(hi.x, band_hi.clamp(lo.y, hi.y), hi.z),
    )?;

    let mut histogram: BTreeMap<u16, u64> = BTreeMap::new();
    for item in &window {
        let (_, tile) = item?;
        *histogram.entry(tile.material).or_default() += 1;
    }

    info!(
        "Surface band {} ..= {} ({} voxels, {} chunks loaded)",
        window.min(),
        window.max(),
        window.volume(),
        world.loaded_count()
    );
    for (id, count) in &histogram {
        let share = *count as f64 * 100.0 / window.volume() as f64;
        info!("  {:<8} {count:>10} ({share:5.1}%)", material::name(*id));
    }

    Ok(())
}
