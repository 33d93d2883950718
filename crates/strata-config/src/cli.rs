//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, ViewMode};

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Voxel chunk meshing and billboard batching demo")]
pub struct CliArgs {
    /// Ramp depth for sloped voxel corners.
    #[arg(long)]
    pub ramp_depth: Option<f32>,

    /// Mesh each horizontal layer separately.
    #[arg(long)]
    pub sliced: bool,

    /// Highest visible world Y level.
    #[arg(long, allow_hyphen_values = true)]
    pub view_level: Option<i32>,

    /// Number of mesh worker threads (0 = auto).
    #[arg(long)]
    pub mesh_threads: Option<u32>,

    /// Instance capacity for billboard species.
    #[arg(long)]
    pub billboard_capacity: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(depth) = args.ramp_depth {
            self.meshing.ramp_depth = depth;
        }
        if args.sliced {
            self.meshing.view_mode = ViewMode::Sliced;
        }
        if let Some(level) = args.view_level {
            self.meshing.view_level = Some(level);
        }
        if let Some(threads) = args.mesh_threads {
            self.workers.mesh_threads = threads;
        }
        if let Some(capacity) = args.billboard_capacity {
            self.billboards.default_capacity = capacity;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
