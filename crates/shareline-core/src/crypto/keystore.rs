//! Device-bound key storage.
//!
//! Version-1 envelopes are sealed with a key that lives in the platform's
//! secure store (Keychain, Credential Manager, Secret Service) under a
//! caller-chosen alias. The first use of an alias generates the key; later
//! uses read the same bytes back. The calls are blocking, so async callers
//! go through `spawn_blocking`.

use super::{CryptoError, SealingKey};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Service name under which platform entries are registered.
pub const DEFAULT_SERVICE: &str = "shareline";

/// Source of device-bound sealing keys, addressed by alias.
pub trait KeyStore: Send + Sync {
    /// Fetch the key bound to `alias`, creating and persisting a fresh
    /// random key when no entry exists yet.
    fn get_or_create(&self, alias: &str) -> Result<SealingKey, CryptoError>;
}

/// Key store backed by the operating system's credential store.
pub struct PlatformKeyStore {
    service: String,
}

impl PlatformKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, alias: &str) -> Result<keyring::Entry, CryptoError> {
        keyring::Entry::new(&self.service, alias).map_err(store_err)
    }
}

impl Default for PlatformKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyStore for PlatformKeyStore {
    fn get_or_create(&self, alias: &str) -> Result<SealingKey, CryptoError> {
        let entry = self.entry(alias)?;
        match entry.get_secret() {
            Ok(bytes) => {
                let bytes: [u8; 32] =
                    bytes.as_slice().try_into().map_err(|_| CryptoError::KeyStore {
                        message: format!("stored key for alias {alias} has the wrong length"),
                    })?;
                Ok(SealingKey::from_bytes(bytes))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(alias, "no stored key, generating one");
                let key = SealingKey::random()?;
                entry.set_secret(key.as_bytes()).map_err(store_err)?;
                Ok(key)
            }
            Err(e) => Err(store_err(e)),
        }
    }
}

fn store_err(e: keyring::Error) -> CryptoError {
    CryptoError::KeyStore {
        message: e.to_string(),
    }
}

/// In-memory key store for tests and headless environments.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, SealingKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a key so tests can seal and open deterministically.
    pub fn insert(&self, alias: impl Into<String>, key: SealingKey) {
        self.keys.lock().unwrap().insert(alias.into(), key);
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_or_create(&self, alias: &str) -> Result<SealingKey, CryptoError> {
        let mut keys = self.keys.lock().unwrap();
        if let Some(key) = keys.get(alias) {
            return Ok(key.clone());
        }
        let key = SealingKey::random()?;
        keys.insert(alias.to_string(), key.clone());
        Ok(key)
    }
}
