//! Error types for the logging module

use thiserror::Error;

/// Errors that can occur initializing logging
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber was already installed
    #[error("failed to initialize logging: {0}")]
    InitializationFailed(String),
}
