//! Shared utilities for marketmind
//!
//! Logging setup and application configuration used by the binaries.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError};
pub use logging::{LogFormat, init_tracing};
