//! Configuration management for fetchcast
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! # Environment Variables
//!
//! Any key can be overridden with `FETCHCAST__<section>__<key>`, e.g.
//! `FETCHCAST__WORKERS__POOL_SIZE=4` or `FETCHCAST__FETCHER__KIND=http`.
//!
//! # Configuration File
//!
//! By default the file is `config/fetchcast.toml`; set `FETCHCAST_CONFIG`
//! to point elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, FetcherConfig, FetcherKind, HubConfig, LedgerConfig, ServerConfig, WorkersConfig,
};
pub use validation::{MAX_POOL_SIZE, ValidationError};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load and validate configuration from the default file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a specific file plus environment.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Re-check invariants, e.g. after command-line overrides.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
