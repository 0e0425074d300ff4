//! Cryptography for the Huddle session protocol.
//!
//! The protocol bootstraps a confidential channel with textbook hybrid
//! encryption: the client sends its RSA public key, the server wraps a
//! fresh AES-256-GCM session key under it, and every payload after that
//! travels under the session key. The asymmetric suite is never used for
//! anything but that single key transport.
//!
//! Submodules:
//! - [`asymmetric`]: RSA key-transport suite ([`RsaSuite`])
//! - [`symmetric`]: AES-256-GCM session suite ([`AesSuite`])
//! - [`hashing`]: SHA-256 password digests
//!
//! All implementations are RustCrypto crates.

pub mod asymmetric;
pub mod errors;
pub mod hashing;
pub mod symmetric;

pub use asymmetric::RsaSuite;
pub use errors::{CryptoError, CryptoResult};
pub use hashing::sha256_hex;
pub use symmetric::AesSuite;

/// RSA modulus size in bits for generated key pairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Size of an AES-256 key in bytes.
pub const AES_KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce in bytes.
pub const AES_NONCE_SIZE: usize = 12;
