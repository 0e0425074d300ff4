//! RSA key-transport suite.
//!
//! A full suite (generated key pair) can encrypt and decrypt; a suite
//! built from a peer's exported public key is encrypt-only. The server
//! only ever holds the encrypt-only form: it wraps the fresh session key
//! under the client's public key and never needs to decrypt anything
//! asymmetrically.
//!
//! Public keys travel as DER-encoded SubjectPublicKeyInfo.

use rand_core::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::crypto::errors::{CryptoError, CryptoResult};
use crate::crypto::RSA_KEY_BITS;

/// Asymmetric encryption suite.
pub struct RsaSuite {
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
}

impl RsaSuite {
    /// Generate a fresh key pair with the default modulus size.
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with_size(RSA_KEY_BITS)
    }

    /// Generate a fresh key pair with an explicit modulus size in bits.
    pub fn generate_with_size(bits: usize) -> CryptoResult<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public_key = private_key.to_public_key();
        Ok(RsaSuite {
            public_key,
            private_key: Some(private_key),
        })
    }

    /// Build an encrypt-only suite from a peer's DER-encoded public key.
    pub fn from_public_key(der: &[u8]) -> CryptoResult<Self> {
        let public_key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
        Ok(RsaSuite {
            public_key,
            private_key: None,
        })
    }

    /// True if this suite holds no private key.
    pub fn is_encrypt_only(&self) -> bool {
        self.private_key.is_none()
    }

    /// Encrypt under the public key.
    ///
    /// Fails if the plaintext is too large for the modulus; the protocol
    /// only ever wraps a 32-byte session key, which fits comfortably.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.public_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))
    }

    /// Decrypt with the private key.
    ///
    /// Fails with [`CryptoError::EncryptOnly`] if the suite was built
    /// from a public key alone, or with [`CryptoError::Decrypt`] on bad
    /// padding or a mismatched key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let private_key = self.private_key.as_ref().ok_or(CryptoError::EncryptOnly)?;
        private_key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))
    }

    /// Export the public key as DER-encoded SubjectPublicKeyInfo.
    pub fn export_public_key(&self) -> CryptoResult<Vec<u8>> {
        self.public_key
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesSuite;

    // 1024-bit keys keep the tests fast; the wrap payload is 32 bytes
    // either way.
    const TEST_BITS: usize = 1024;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let suite = RsaSuite::generate_with_size(TEST_BITS).unwrap();
        assert!(!suite.is_encrypt_only());

        let session_key = AesSuite::generate().export_key();
        let wrapped = suite.encrypt(&session_key).unwrap();
        assert_ne!(wrapped, session_key);

        let unwrapped = suite.decrypt(&wrapped).unwrap();
        assert_eq!(unwrapped, session_key);
    }

    #[test]
    fn test_encrypt_only_mirrors_full_suite() {
        let full = RsaSuite::generate_with_size(TEST_BITS).unwrap();
        let der = full.export_public_key().unwrap();

        let remote = RsaSuite::from_public_key(&der).unwrap();
        assert!(remote.is_encrypt_only());

        let wrapped = remote.encrypt(b"session key bytes").unwrap();
        assert_eq!(full.decrypt(&wrapped).unwrap(), b"session key bytes");
    }

    #[test]
    fn test_encrypt_only_cannot_decrypt() {
        let full = RsaSuite::generate_with_size(TEST_BITS).unwrap();
        let remote = RsaSuite::from_public_key(&full.export_public_key().unwrap()).unwrap();

        let wrapped = remote.encrypt(b"x").unwrap();
        assert!(matches!(
            remote.decrypt(&wrapped),
            Err(CryptoError::EncryptOnly)
        ));
    }

    #[test]
    fn test_malformed_public_key() {
        assert!(matches!(
            RsaSuite::from_public_key(b"not a key"),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_oversized_plaintext() {
        let suite = RsaSuite::generate_with_size(TEST_BITS).unwrap();
        // 1024-bit PKCS#1 v1.5 tops out at 117 bytes of plaintext.
        let result = suite.encrypt(&[0u8; 256]);
        assert!(matches!(result, Err(CryptoError::Encrypt(_))));
    }
}
