//! Error types for the config module

use thiserror::Error;

/// Errors that can occur loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    /// Reading the config file failed
    #[error("failed to read config file: {0}")]
    FileReadError(String),

    /// Writing the config file failed
    #[error("failed to write config file: {0}")]
    FileWriteError(String),

    /// The config file could not be parsed as TOML
    #[error("failed to parse config: {0}")]
    ParseError(String),

    /// The config could not be serialized
    #[error("failed to serialize config: {0}")]
    SerializeError(String),

    /// A semantic constraint was violated
    #[error("config validation failed: {0}")]
    ValidationFailed(String),
}
