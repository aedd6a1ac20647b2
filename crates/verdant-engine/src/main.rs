//! # Verdant
//!
//! Headless host for Verdant chunk streaming.
//!
//! Loads an [`EngineConfig`](config::EngineConfig), walks an agent along a
//! list of waypoints and drives the streaming controller at a fixed tick
//! rate against the in-memory scene. Useful for checking a seed or tuning
//! radii and budgets without a renderer.
//!
//! Usage: `verdant [config.toml]`. A missing config file is created with
//! the defaults.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod timing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("verdant=info".parse()?))
        .init();

    info!("Verdant starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);

    let mut config = EngineConfig::load_from(&path);
    if !path.exists() {
        config
            .save_to(&path)
            .with_context(|| format!("writing default config to {}", path.display()))?;
    }
    config.validate();

    let summary = app::run(config);
    info!(
        "Ran {} ticks ({:.1}s simulated): {} spawned, {} evicted, {} failed, {} deferred",
        summary.ticks,
        summary.simulated.as_secs_f64(),
        summary.stats.spawned,
        summary.stats.evicted,
        summary.stats.spawn_failures,
        summary.stats.deferred
    );

    info!("Verdant shutdown complete, disposed {} chunks", summary.disposed);
    Ok(())
}
