//! Key material handling for the encryption envelope.
//!
//! Keys are opaque 32-byte values behind [`SealingKey`]; raw bytes never
//! appear in logs or leave this module except to feed the cipher. Passphrase
//! keys are stretched with PBKDF2-HMAC-SHA256, device keys come from the
//! platform store in [`keystore`].

pub mod keystore;

pub use keystore::{KeyStore, MemoryKeyStore, PlatformKeyStore};

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

/// PBKDF2 rounds for passphrase-derived keys. Fixed by the envelope format;
/// changing it would orphan every version-2 envelope already written.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Key and cipher failures. None of these ever cause a plaintext fallback.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The platform key store rejected a lookup or a write.
    #[error("key store error: {message}")]
    KeyStore { message: String },

    /// Encryption or decryption failed, including tag verification.
    #[error("cipher failure: {message}")]
    Cipher { message: String },

    /// The input is not a well-formed envelope.
    #[error("malformed envelope: {message}")]
    Envelope { message: String },

    /// The OS random generator was unavailable.
    #[error("random generator failure: {message}")]
    Rng { message: String },
}

/// An opaque 256-bit sealing key.
#[derive(Clone)]
pub struct SealingKey([u8; 32]);

impl SealingKey {
    /// Wrap raw key material, taking ownership of it.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random key from the OS generator.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Stretch a passphrase into a key with PBKDF2-HMAC-SHA256.
    ///
    /// The salt comes from the envelope: freshly drawn when sealing,
    /// read back from the header when opening.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut bytes);
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealingKey(<redacted>)")
    }
}

/// Fill `buf` from the OS random generator.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|e| CryptoError::Rng {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_per_salt() {
        let a = SealingKey::derive_from_passphrase("hunter2", b"0123456789abcdef");
        let b = SealingKey::derive_from_passphrase("hunter2", b"0123456789abcdef");
        let c = SealingKey::derive_from_passphrase("hunter2", b"fedcba9876543210");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn different_passphrases_give_different_keys() {
        let a = SealingKey::derive_from_passphrase("one", b"0123456789abcdef");
        let b = SealingKey::derive_from_passphrase("two", b"0123456789abcdef");
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn debug_never_prints_key_material() {
        let key = SealingKey::from_bytes([0xAB; 32]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "SealingKey(<redacted>)");
        assert!(!rendered.contains("AB"));
    }

    #[test]
    fn random_keys_differ() {
        let a = SealingKey::random().unwrap();
        let b = SealingKey::random().unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
