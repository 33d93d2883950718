//! Configuration for the Strata meshing and billboard core.
//!
//! Settings persist to disk as RON files, can be hot-reloaded, and accept
//! CLI overrides via clap. Unknown or missing fields fall back to defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BillboardConfig, Config, DebugConfig, LiquidConfig, MeshingConfig, ViewMode, WorkerConfig,
    default_config_dir,
};
pub use error::ConfigError;
