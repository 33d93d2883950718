//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chunk meshing settings.
    pub meshing: MeshingConfig,
    /// Liquid surface settings.
    pub liquid: LiquidConfig,
    /// Billboard batching settings.
    pub billboards: BillboardConfig,
    /// Background worker settings.
    pub workers: WorkerConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// How solid chunk geometry is split for rendering.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViewMode {
    /// One mesh per chunk.
    #[default]
    Full,
    /// One mesh per horizontal layer, so the world can be cut open at any level.
    Sliced,
}

/// Chunk meshing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshingConfig {
    /// Chunk dimensions in voxels (x, y, z).
    pub chunk_size: [u32; 3],
    /// How far a ramped top corner is pulled down, in voxel units.
    pub ramp_depth: f32,
    /// Maximum cosmetic vertex displacement, in voxel units.
    pub jitter_amplitude: f32,
    /// Seed for the vertex jitter noise.
    pub jitter_seed: u32,
    /// Whole-chunk or per-layer meshes.
    pub view_mode: ViewMode,
    /// Highest visible world Y level, if the view is cut.
    pub view_level: Option<i32>,
}

/// Liquid surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiquidConfig {
    /// Columns with less total depth than this are rendered as puddles.
    pub puddle_depth_threshold: u32,
    /// Minimum foam value applied to puddles (0.0 - 1.0).
    pub puddle_foam: f32,
    /// Texture tiling factor for world-space liquid coordinates.
    pub uv_scale: f32,
    /// How many cells below a chunk are walked to seed column depth.
    pub max_column_scan: u32,
}

/// Billboard batching configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BillboardConfig {
    /// Seconds between depth re-sorts.
    pub sort_interval_secs: f32,
    /// Distance beyond which instances are de-prioritized.
    pub cull_distance: f32,
    /// Multiplier applied to the depth score of culled or behind-camera instances.
    pub depth_penalty: f32,
    /// Instance capacity used when a species does not specify one.
    pub default_capacity: u32,
}

/// Background worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Mesh worker threads (0 = one per available core, minus one).
    pub mesh_threads: u32,
    /// Maximum meshing tasks queued or running at once.
    pub in_flight_budget: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log per-chunk mesh statistics after each publish.
    pub log_mesh_stats: bool,
}

// --- Default implementations ---

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            chunk_size: [16, 16, 16],
            ramp_depth: 0.5,
            jitter_amplitude: 0.02,
            jitter_seed: 0x5EED,
            view_mode: ViewMode::Full,
            view_level: None,
        }
    }
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            puddle_depth_threshold: 32,
            puddle_foam: 0.95,
            uv_scale: 0.25,
            max_column_scan: 64,
        }
    }
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self {
            sort_interval_secs: 0.1,
            cull_distance: 96.0,
            depth_penalty: 100.0,
            default_capacity: 4096,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            mesh_threads: 0,
            in_flight_budget: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_mesh_stats: false,
        }
    }
}

/// Platform config directory for Strata, falling back to the working directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join("config.ron"))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
