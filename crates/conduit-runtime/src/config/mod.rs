//! Configuration module for the Conduit runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for logging, runtime behavior and adapter sections.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ConduitConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RuntimeConfig,
};
pub use validation::validate_config;
