//! Configuration loading for the spectrum sweeper
//!
//! - TOML configuration file parsing
//! - Domain configuration structures
//! - Shared, cheaply-clonable configuration handle

pub mod sweep_config;
pub mod toml_config;

pub use sweep_config::*;
pub use toml_config::{from_file, from_toml_str};
