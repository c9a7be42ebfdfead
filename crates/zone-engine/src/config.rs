//! Engine configuration.
//!
//! World, generator, and runtime settings, loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zone_common::ChunkDims;
use zone_world::{GeneratorKind, TerrainConfig, WorldConfig};

/// Configuration file name.
const CONFIG_FILE: &str = "zone.toml";

/// Environment variable overriding the config path.
const CONFIG_ENV: &str = "ZONE_CONFIG";

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === World Settings ===
    /// World seed (None = random)
    pub world_seed: Option<u64>,
    /// Chunk edge length along x
    pub chunk_cols: u32,
    /// Chunk edge length along y
    pub chunk_rows: u32,
    /// Chunk edge length along z
    pub chunk_depth: u32,
    /// Generator used for new chunks
    pub generator: GeneratorKind,

    // === Runtime Settings ===
    /// Chunks generated around the origin at startup, per axis
    pub prefetch_radius: u32,
    /// Generation worker threads
    pub worker_threads: usize,
    /// Tracing filter used when RUST_LOG is unset
    pub log_filter: String,

    // === Terrain Settings ===
    /// Terrain shaping (kept last: TOML tables follow plain keys)
    pub terrain: TerrainConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: None,
            chunk_cols: ChunkDims::DEFAULT.cols,
            chunk_rows: ChunkDims::DEFAULT.rows,
            chunk_depth: ChunkDims::DEFAULT.depth,
            generator: GeneratorKind::default(),
            prefetch_radius: 2,
            worker_threads: num_cpus::get().max(1),
            log_filter: "zone=info".into(),
            terrain: TerrainConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the configuration file path: `$ZONE_CONFIG`, then the platform
    /// config directory, then the working directory.
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir().map_or_else(
            || PathBuf::from(CONFIG_FILE),
            |dir| dir.join("zone").join(CONFIG_FILE),
        )
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // World
        self.chunk_cols = self.chunk_cols.clamp(4, 256);
        self.chunk_rows = self.chunk_rows.clamp(4, 256);
        self.chunk_depth = self.chunk_depth.clamp(4, 256);
        self.terrain.terrain_scale = self.terrain.terrain_scale.clamp(1.0, 10_000.0);
        self.terrain.height_scale = self.terrain.height_scale.clamp(0.0, 512.0);
        if self.terrain.bedrock_level > self.terrain.surface_height {
            self.terrain.bedrock_level = self.terrain.surface_height;
        }

        // Runtime
        self.prefetch_radius = self.prefetch_radius.min(8);
        self.worker_threads = self.worker_threads.clamp(1, 64);
    }

    /// Chunk dimensions from the three edge settings.
    #[must_use]
    pub const fn chunk_dims(&self) -> ChunkDims {
        ChunkDims::new(self.chunk_cols, self.chunk_rows, self.chunk_depth)
    }

    /// World configuration, resolving a random seed if none is set.
    ///
    /// Random seeds stay within 32 bits so every built-in generator accepts them.
    #[must_use]
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            dims: self.chunk_dims(),
            seed: self
                .world_seed
                .unwrap_or_else(|| u64::from(fastrand::u32(..))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log sink").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.chunk_dims(), ChunkDims::cubic(32));
        assert_eq!(config.generator, GeneratorKind::Noise);
        assert_eq!(config.prefetch_radius, 2);
        assert!(config.worker_threads >= 1);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.chunk_cols = 1;
        config.chunk_depth = 4096;
        config.worker_threads = 0;
        config.prefetch_radius = 100;
        config.terrain.terrain_scale = 0.0;
        config.terrain.bedrock_level = 50;

        config.validate();

        assert_eq!(config.chunk_cols, 4);
        assert_eq!(config.chunk_depth, 256);
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.prefetch_radius, 8);
        assert!((config.terrain.terrain_scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.terrain.bedrock_level, config.terrain.surface_height);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("zone.toml");

        let mut config = EngineConfig::default();
        config.world_seed = Some(12345);
        config.generator = GeneratorKind::Flat;
        config.chunk_rows = 16;
        config.terrain.sea_level = -3;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.world_seed, Some(12345));
        assert_eq!(loaded.generator, GeneratorKind::Flat);
        assert_eq!(loaded.chunk_rows, 16);
        assert_eq!(loaded.terrain.sea_level, -3);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/zone.toml");
        assert_eq!(config.chunk_cols, 32);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("zone.toml");
        fs::write(&config_path, "generator = \"empty\"\n[terrain]\nsea_level = 7\n")
            .expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.generator, GeneratorKind::Empty);
        assert_eq!(loaded.terrain.sea_level, 7);
        assert_eq!(loaded.terrain.surface_height, TerrainConfig::default().surface_height);
        assert_eq!(loaded.prefetch_radius, 2);
    }

    #[test]
    fn test_config_invalid_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("zone.toml");
        fs::write(&config_path, "chunk_cols = \"wide\"").expect("write");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.chunk_cols, 32);
    }

    #[test]
    fn test_config_invalid_file_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("zone.toml");
        fs::write(&config_path, "chunk_cols = [").expect("write");

        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        let loaded = tracing::subscriber::with_default(subscriber, || {
            EngineConfig::load_from(&config_path)
        });

        let output = String::from_utf8(captured.0.lock().expect("log sink").clone())
            .expect("utf8 log");
        assert!(output.contains("WARN"));
        assert!(output.contains("Failed to parse config file"));
        assert_eq!(loaded.chunk_cols, 32);
    }

    #[test]
    fn test_world_config_seed() {
        let mut config = EngineConfig::default();
        config.world_seed = Some(99);
        assert_eq!(config.world_config().seed, 99);

        config.world_seed = None;
        assert!(config.world_config().seed <= u64::from(u32::MAX));
    }
}
