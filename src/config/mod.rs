//! Configuration management for wizwam
//!
//! Two separate stores live here:
//!
//! - [`Config`]: layered application settings, loaded from
//!   1. Default values (embedded in structs)
//!   2. TOML configuration file
//!   3. Environment variables (highest priority)
//! - [`PreferencesStore`]: the flat JSON user-preferences file (download
//!   directory, default quality and codecs), which the web UI can edit.
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `WIZWAM__<section>__<key>`
//!
//! Examples:
//! - `WIZWAM__SERVER__PORT=9000`
//! - `WIZWAM__EXTRACTOR__BINARY=/usr/local/bin/yt-dlp`
//! - `WIZWAM__SERVER__MAX_PAYLOAD_BYTES=1MB`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `~/.wizwam/config.toml`.
//! This can be overridden using the `WIZWAM_CONFIG` environment variable.

mod models;
mod preferences;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, ExtractorConfig, PathsConfig, ServerConfig, app_dir};
pub use preferences::{Preferences, PreferencesError, PreferencesStore, default_download_dir};
pub use sources::config_path;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn preferences(&self) -> PreferencesStore {
        PreferencesStore::new(&self.paths.preferences_file)
    }
}
