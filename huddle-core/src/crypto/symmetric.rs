/*
    symmetric.rs - AES-256-GCM session suite

    Encrypts every post-handshake payload on a connection.
    A unique random nonce is generated per encryption and prepended
    to the ciphertext, so a suite loaded from the same key on the
    other side of the wire can decrypt without extra state.
*/

use aes_gcm::aead::OsRng;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use zeroize::Zeroizing;

use crate::crypto::errors::{CryptoError, CryptoResult};
use crate::crypto::{AES_KEY_SIZE, AES_NONCE_SIZE};

/// Symmetric encryption suite shared by both ends of one session.
pub struct AesSuite {
    cipher: Aes256Gcm,
    key: Zeroizing<Vec<u8>>,
}

impl AesSuite {
    /// Create a suite with a fresh random 256-bit key.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        AesSuite {
            cipher: Aes256Gcm::new(&key),
            key: Zeroizing::new(key.to_vec()),
        }
    }

    /// Load a suite from an existing key.
    ///
    /// Rejects anything that is not exactly [`AES_KEY_SIZE`] bytes.
    pub fn from_key(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != AES_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: AES_KEY_SIZE,
                actual: key.len(),
            });
        }
        let key_array = Key::<Aes256Gcm>::from_slice(key);
        Ok(AesSuite {
            cipher: Aes256Gcm::new(key_array),
            key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Encrypt bytes. The returned buffer is `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        use aes_gcm::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; AES_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut result = nonce_bytes.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt a `nonce || ciphertext` buffer produced by [`encrypt`].
    ///
    /// Fails on truncated input, a wrong key, or a tampered ciphertext.
    ///
    /// [`encrypt`]: AesSuite::encrypt
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < AES_NONCE_SIZE {
            return Err(CryptoError::Decrypt("ciphertext too short".to_string()));
        }
        let nonce = Nonce::from_slice(&ciphertext[..AES_NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &ciphertext[AES_NONCE_SIZE..])
            .map_err(|e| CryptoError::Decrypt(e.to_string()))
    }

    /// Encrypt a UTF-8 string.
    pub fn encrypt_text(&self, plaintext: &str) -> CryptoResult<Vec<u8>> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt to a UTF-8 string.
    pub fn decrypt_text(&self, ciphertext: &[u8]) -> CryptoResult<String> {
        let plaintext = self.decrypt(ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Export the raw key, e.g. to wrap it under a peer's public key.
    pub fn export_key(&self) -> Vec<u8> {
        self.key.to_vec()
    }
}
