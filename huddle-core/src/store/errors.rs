//! Error types for the store module

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur creating groups or messages.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A name, password, or message field failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A group with this name already exists
    #[error("group already exists: {0}")]
    GroupExists(String),
}
