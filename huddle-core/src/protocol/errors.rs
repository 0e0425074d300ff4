//! Error types for the protocol module

use thiserror::Error;

/// Result type for framing operations
pub type WireResult<T> = Result<T, WireError>;

/// Errors produced while reading or writing frames.
///
/// All of them are connection-fatal: a peer that sends a malformed frame
/// cannot be resynchronized on a byte stream.
#[derive(Error, Debug)]
pub enum WireError {
    /// Transport failure (includes unexpected EOF)
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The frame's version byte did not match ours
    #[error("unsupported protocol version {0:#04x}")]
    UnsupportedVersion(u8),

    /// The frame's kind byte is not in the enumeration
    #[error("unknown request kind {0:#04x}")]
    UnknownKind(u8),

    /// The payload-present flag was neither 0 nor 1
    #[error("invalid payload flag {0:#04x}")]
    InvalidPayloadFlag(u8),

    /// The declared payload length exceeds the frame limit
    #[error("payload of {size} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { size: usize, max: usize },
}
