//! Tracing initialization for sluice binaries.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a plain or JSON `fmt`
//! layer. `RUST_LOG` wins over the configured level so operators can raise verbosity for a
//! single target (e.g. `RUST_LOG=queries=debug`) without touching the config file.

use crate::config::TelemetryConfig;
use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log targets used across the workspace.
pub mod targets {
    pub const QUERIES: &str = "queries";
    pub const CACHE: &str = "cache";
    pub const POOLS: &str = "pools";
    pub const ANALYZER: &str = "analyzer";
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid log level '{}'", config.log_level)),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(json = config.json, level = %config.log_level, "Tracing initialized");
    Ok(())
}
