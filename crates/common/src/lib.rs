//! Configuration and platform paths shared by the workspace admin tools

pub mod config;
pub mod platform;

pub use config::{Config, ConfigError};
