//! Error types for the crypto module

use thiserror::Error;

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the crypto suites.
///
/// On the server any of these is connection-fatal; the client surfaces
/// them to its caller as typed failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A loaded symmetric key had the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Decrypt was called on a suite holding only a public key
    #[error("suite holds no private key (encrypt-only)")]
    EncryptOnly,

    /// Key pair generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A peer's public key could not be parsed or encoded
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    /// Encryption failed (e.g. plaintext oversized for the modulus)
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption failed (tampered ciphertext, wrong key, bad padding)
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// A decrypted payload was expected to be text but was not UTF-8
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}
