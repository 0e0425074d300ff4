//! Error types for the client module

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::protocol::{RequestKind, WireError};

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures surfaced to the client's caller.
///
/// Every operation reports its failure; nothing is swallowed. The only
/// wire-level condition treated leniently is a missing goodbye response
/// during close, which is logged instead.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A constructor argument failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection establishment failed at the given step
    #[error("connection establishment error - {0}")]
    Establishment(String),

    /// The server answered an operation with its domain error
    #[error("server rejected {0}")]
    Rejected(&'static str),

    /// The server answered with a kind the current step cannot accept
    #[error("unexpected response: expected {expected}, got {got:?}")]
    UnexpectedResponse {
        expected: &'static str,
        got: RequestKind,
    },

    /// An operation was attempted on a session that is not open
    #[error("session is not open")]
    SessionClosed,

    /// Framing or transport failure
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Key exchange or payload decryption failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
