//! Error types shared across Verdant crates.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading and saving errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    #[error("Config I/O failed for {path}: {source}")]
    Io {
        /// File that was being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file contents are not valid TOML for the expected schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
