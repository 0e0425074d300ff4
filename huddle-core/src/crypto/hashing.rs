//! SHA-256 password digests.
//!
//! Used in exactly two places: the server hashes a group's plaintext
//! password once at creation, and the client hashes the password it holds
//! once before sending it. Only hashes cross the wire (further wrapped by
//! the session suite), and the server compares hash-to-hash.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a string.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::is_valid_password_hash;

    #[test]
    fn test_known_digest() {
        // SHA-256("abc"), a standard test vector.
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_shape() {
        assert!(is_valid_password_hash(&sha256_hex("default")));
        assert!(is_valid_password_hash(&sha256_hex("")));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sha256_hex("hunter2"), sha256_hex("hunter2"));
        assert_ne!(sha256_hex("hunter2"), sha256_hex("hunter3"));
    }
}
