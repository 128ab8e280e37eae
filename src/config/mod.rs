//! Configuration module for stylepipe
//!
//! Provides types and parsing for `stylepipe.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    check, default_config, find_config, find_config_from, load_config, merge_cli_overrides,
    project_root, resolve_path, CliOverrides, ConfigError, CONFIG_FILE_NAME,
};
pub use schema::*;
