//! Configuration module for sitekit
//!
//! Provides types and parsing for `sitekit.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, load_project, CliOverrides, ConfigError};
pub use schema::*;
