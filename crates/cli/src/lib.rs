//! Shared plumbing for the `quick-auth` and `setup-workspace` binaries

pub mod console;
pub mod diagnose;
pub mod marker;

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use common::Config;

/// Logs go to stderr; stdout carries the operator report
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    Config::load(explicit).context("Failed to load configuration")
}
