//! Authenticated-encryption envelope for records at rest.
//!
//! Wire layout, all fields back to back:
//!
//! ```text
//! magic "HIPOSENC" (8) | version (1) | salt (16, version 2 only)
//!   | iv (12) | AES-256-GCM ciphertext + tag (16)
//! ```
//!
//! Version 1 seals with a device-bound key from the platform store and has a
//! 21-byte header. Version 2 seals with a passphrase-derived key and carries
//! the PBKDF2 salt in the header, 37 bytes total. The IV (and salt) are drawn
//! fresh from the OS generator on every seal, so sealing the same plaintext
//! twice never yields the same bytes. Tag verification failures surface as
//! errors; nothing here ever falls back to plaintext.

use crate::crypto::{self, CryptoError, SealingKey};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

/// Leading magic of every envelope.
pub const MAGIC: &[u8; 8] = b"HIPOSENC";
/// Version byte for device-key envelopes.
pub const VERSION_DEVICE_KEY: u8 = 1;
/// Version byte for passphrase-derived envelopes.
pub const VERSION_PASSPHRASE: u8 = 2;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Header length of a version-1 envelope: magic, version, IV.
pub const HEADER_LEN_V1: usize = MAGIC.len() + 1 + IV_LEN;
/// Header length of a version-2 envelope: magic, version, salt, IV.
pub const HEADER_LEN_V2: usize = MAGIC.len() + 1 + SALT_LEN + IV_LEN;

/// Seal `plaintext` under a device-bound key as a version-1 envelope.
pub fn seal_with_key(plaintext: &[u8], key: &SealingKey) -> Result<Vec<u8>, CryptoError> {
    seal(plaintext, key, VERSION_DEVICE_KEY, None)
}

/// Seal `plaintext` under a passphrase as a version-2 envelope.
///
/// A fresh salt is drawn per call and embedded in the header, so the
/// passphrase alone is enough to open the result later.
pub fn seal_with_passphrase(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    crypto::fill_random(&mut salt)?;
    let key = SealingKey::derive_from_passphrase(passphrase, &salt);
    seal(plaintext, &key, VERSION_PASSPHRASE, Some(salt))
}

/// Open a version-1 envelope with the device-bound key it was sealed under.
pub fn open_with_key(envelope: &[u8], key: &SealingKey) -> Result<Vec<u8>, CryptoError> {
    let header = parse(envelope)?;
    if header.version != VERSION_DEVICE_KEY {
        return Err(CryptoError::Envelope {
            message: format!(
                "expected a device-key envelope (version {VERSION_DEVICE_KEY}), found version {}",
                header.version
            ),
        });
    }
    decrypt(key, header.iv, header.ciphertext)
}

/// Open a version-2 envelope by re-deriving the key from `passphrase` and
/// the salt in the header.
pub fn open_with_passphrase(envelope: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let header = parse(envelope)?;
    if header.version != VERSION_PASSPHRASE {
        return Err(CryptoError::Envelope {
            message: format!(
                "expected a passphrase envelope (version {VERSION_PASSPHRASE}), found version {}",
                header.version
            ),
        });
    }
    let salt = header.salt.unwrap_or_default();
    let key = SealingKey::derive_from_passphrase(passphrase, salt);
    decrypt(&key, header.iv, header.ciphertext)
}

/// Version byte of `envelope`, after validating the magic.
pub fn version(envelope: &[u8]) -> Result<u8, CryptoError> {
    if envelope.len() <= MAGIC.len() || &envelope[..MAGIC.len()] != MAGIC {
        return Err(CryptoError::Envelope {
            message: "missing envelope magic".to_string(),
        });
    }
    Ok(envelope[MAGIC.len()])
}

struct Header<'a> {
    version: u8,
    salt: Option<&'a [u8]>,
    iv: &'a [u8],
    ciphertext: &'a [u8],
}

fn parse(envelope: &[u8]) -> Result<Header<'_>, CryptoError> {
    let ver = version(envelope)?;
    let (salt, rest) = match ver {
        VERSION_DEVICE_KEY => (None, &envelope[MAGIC.len() + 1..]),
        VERSION_PASSPHRASE => {
            let rest = &envelope[MAGIC.len() + 1..];
            if rest.len() < SALT_LEN {
                return Err(truncated());
            }
            (Some(&rest[..SALT_LEN]), &rest[SALT_LEN..])
        }
        other => {
            return Err(CryptoError::Envelope {
                message: format!("unsupported envelope version {other}"),
            });
        }
    };
    if rest.len() < IV_LEN + TAG_LEN {
        return Err(truncated());
    }
    Ok(Header {
        version: ver,
        salt,
        iv: &rest[..IV_LEN],
        ciphertext: &rest[IV_LEN..],
    })
}

fn truncated() -> CryptoError {
    CryptoError::Envelope {
        message: "truncated envelope".to_string(),
    }
}

fn seal(
    plaintext: &[u8],
    key: &SealingKey,
    version: u8,
    salt: Option<[u8; SALT_LEN]>,
) -> Result<Vec<u8>, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    crypto::fill_random(&mut iv)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Cipher {
        message: e.to_string(),
    })?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::Cipher {
            message: "encryption failed".to_string(),
        })?;

    let header_len = if salt.is_some() { HEADER_LEN_V2 } else { HEADER_LEN_V1 };
    let mut out = Vec::with_capacity(header_len + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.push(version);
    if let Some(salt) = salt {
        out.extend_from_slice(&salt);
    }
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn decrypt(key: &SealingKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Cipher {
        message: e.to_string(),
    })?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Cipher {
            message: "tag verification failed (wrong key or corrupted envelope)".to_string(),
        })
}
