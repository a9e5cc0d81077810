//! Configuration for the index manager
//!
//! Settings come from three layers, highest precedence first:
//!
//! - command-line arguments
//! - an optional TOML configuration file
//! - built-in defaults
//!
//! The configuration file supports `${VAR}` and `${VAR:-default}`
//! environment variable expansion.

#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod settings;

// Re-export main types for convenience
pub use config::{AzureConfig, Config};
pub use error::{ConfigError, Result};
pub use settings::{Overrides, Settings};
