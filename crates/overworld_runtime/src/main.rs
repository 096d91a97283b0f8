//! Overworld Runtime
//!
//! Boots the engine core and runs a headless soak scenario against the
//! entity index and the texture atlas.
//!
//! Usage: `overworld [config.json]`

mod soak;

use anyhow::{Context, Result};
use overworld_engine::EngineConfig;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Overworld Engine v{}", overworld_core::VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load engine config from {path}"))?,
        None => EngineConfig::default(),
    };
    tracing::info!(?config, "engine config");

    let report = soak::run(&config, &soak::SoakSettings::default()).context("soak scenario failed")?;
    report.log();

    Ok(())
}
