//! In-memory share transport for tests.
//!
//! Shares live in a map keyed by `share/path`, shared across every
//! connection the client hands out, so tests can seed state, inject
//! failures per operation, and assert on what the engine left behind.

use super::{CreateDisposition, Result, ShareClient, ShareConnection, ShareHandle, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<String, Vec<u8>>,
    dirs: HashSet<String>,
    connects: u32,
    connect_attempts: u32,
    disconnects: u32,
    fail_connect: bool,
    fail_connects_remaining: u32,
    race_create_dir: bool,
    fail_auth: bool,
    fail_open_share: bool,
    fail_write: bool,
    fail_write_substr: Option<String>,
    fail_read: bool,
    fail_remove: bool,
}

/// Mock client whose state is shared across clones and connections.
#[derive(Clone, Default)]
pub struct MockShareClient {
    state: Arc<Mutex<MockState>>,
}

impl MockShareClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Fail every connect attempt until cleared.
    pub fn set_fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Fail the next `n` connect attempts, then succeed.
    pub fn fail_next_connects(&self, n: u32) {
        self.lock().fail_connects_remaining = n;
    }

    pub fn set_fail_auth(&self, fail: bool) {
        self.lock().fail_auth = fail;
    }

    pub fn set_fail_open_share(&self, fail: bool) {
        self.lock().fail_open_share = fail;
    }

    /// Fail every write and append until cleared.
    pub fn set_fail_write(&self, fail: bool) {
        self.lock().fail_write = fail;
    }

    /// Fail writes and appends whose path contains `substr`.
    pub fn fail_writes_matching(&self, substr: impl Into<String>) {
        self.lock().fail_write_substr = Some(substr.into());
    }

    pub fn set_fail_read(&self, fail: bool) {
        self.lock().fail_read = fail;
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.lock().fail_remove = fail;
    }

    /// Make every `create_dir` report failure while still creating the
    /// directory, as if a concurrent writer won the creation race.
    pub fn set_race_create_dir(&self, race: bool) {
        self.lock().race_create_dir = race;
    }

    /// Number of successful connects handed out.
    pub fn connect_count(&self) -> u32 {
        self.lock().connects
    }

    /// Number of connect calls made, including injected failures.
    pub fn connect_attempt_count(&self) -> u32 {
        self.lock().connect_attempts
    }

    /// Number of connections closed by the caller.
    pub fn disconnect_count(&self) -> u32 {
        self.lock().disconnects
    }

    /// Seed a file on `share` without going through a connection.
    pub fn put_file(&self, share: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().files.insert(key(share, path), bytes.into());
    }

    /// Contents of a file on `share`, if present.
    pub fn file(&self, share: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&key(share, path)).cloned()
    }

    pub fn file_exists(&self, share: &str, path: &str) -> bool {
        self.lock().files.contains_key(&key(share, path))
    }

    pub fn dir_exists(&self, share: &str, path: &str) -> bool {
        self.lock().dirs.contains(&key(share, path))
    }

    /// All file paths on `share`, sorted, for assertions on leftovers.
    pub fn file_names(&self, share: &str) -> Vec<String> {
        let prefix = format!("{share}/");
        let mut names: Vec<String> = self
            .lock()
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

fn key(share: &str, path: &str) -> String {
    format!("{share}/{path}")
}

fn parent_of(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

#[async_trait]
impl ShareClient for MockShareClient {
    async fn connect(&self, _host: &str) -> Result<Box<dyn ShareConnection>> {
        {
            let mut state = self.lock();
            state.connect_attempts += 1;
            if state.fail_connect {
                return Err(TransportError::ConnectionFailed {
                    message: "mock connect failure".to_string(),
                });
            }
            if state.fail_connects_remaining > 0 {
                state.fail_connects_remaining -= 1;
                return Err(TransportError::ConnectionFailed {
                    message: "mock connect failure".to_string(),
                });
            }
            state.connects += 1;
        }
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            alive: Arc::new(AtomicBool::new(true)),
            authenticated: false,
        }))
    }
}

#[derive(Debug)]
struct MockConnection {
    state: Arc<Mutex<MockState>>,
    alive: Arc<AtomicBool>,
    authenticated: bool,
}

#[async_trait]
impl ShareConnection for MockConnection {
    async fn authenticate(&mut self, _principal: &str, _secret: &str) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed {
                message: "connection is closed".to_string(),
            });
        }
        if self.state.lock().unwrap().fail_auth {
            return Err(TransportError::AuthenticationFailed {
                message: "mock auth failure".to_string(),
            });
        }
        self.authenticated = true;
        Ok(())
    }

    async fn open_share(&mut self, share: &str) -> Result<Box<dyn ShareHandle>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed {
                message: "connection is closed".to_string(),
            });
        }
        if !self.authenticated {
            return Err(TransportError::AuthenticationFailed {
                message: "authenticate before opening a share".to_string(),
            });
        }
        if self.state.lock().unwrap().fail_open_share {
            return Err(TransportError::ShareUnavailable {
                message: "mock share failure".to_string(),
            });
        }
        Ok(Box::new(MockShareHandle {
            state: Arc::clone(&self.state),
            alive: Arc::clone(&self.alive),
            share: share.to_string(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.state.lock().unwrap().disconnects += 1;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MockShareHandle {
    state: Arc<Mutex<MockState>>,
    alive: Arc<AtomicBool>,
    share: String,
}

impl MockShareHandle {
    fn check_alive(&self) -> Result<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ConnectionFailed {
                message: "connection is closed".to_string(),
            })
        }
    }

    fn key(&self, path: &str) -> String {
        key(&self.share, path)
    }
}

#[async_trait]
impl ShareHandle for MockShareHandle {
    async fn file_exists(&self, path: &str) -> Result<bool> {
        self.check_alive()?;
        Ok(self.state.lock().unwrap().files.contains_key(&self.key(path)))
    }

    async fn folder_exists(&self, path: &str) -> Result<bool> {
        self.check_alive()?;
        // The share root always exists.
        if path.is_empty() {
            return Ok(true);
        }
        Ok(self.state.lock().unwrap().dirs.contains(&self.key(path)))
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = parent_of(path) {
            if !state.dirs.contains(&self.key(parent)) {
                return Err(TransportError::Remote {
                    path: path.to_string(),
                    message: "parent directory does not exist".to_string(),
                });
            }
        }
        state.dirs.insert(self.key(path));
        if state.race_create_dir {
            return Err(TransportError::Remote {
                path: path.to_string(),
                message: "object already exists".to_string(),
            });
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.check_alive()?;
        let state = self.state.lock().unwrap();
        if state.fail_read {
            return Err(TransportError::Remote {
                path: path.to_string(),
                message: "mock read failure".to_string(),
            });
        }
        state
            .files
            .get(&self.key(path))
            .cloned()
            .ok_or_else(|| TransportError::Remote {
                path: path.to_string(),
                message: "object not found".to_string(),
            })
    }

    async fn write_file(
        &self,
        path: &str,
        disposition: CreateDisposition,
        bytes: &[u8],
    ) -> Result<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_write
            || state
                .fail_write_substr
                .as_deref()
                .is_some_and(|s| path.contains(s))
        {
            return Err(TransportError::Remote {
                path: path.to_string(),
                message: "mock write failure".to_string(),
            });
        }
        let key = self.key(path);
        match disposition {
            CreateDisposition::CreateAlways => {
                state.files.insert(key, bytes.to_vec());
            }
            CreateDisposition::CreateIfMissing => {
                let existing = state.files.entry(key).or_default();
                overlay(existing, bytes);
            }
            CreateDisposition::OpenExisting => {
                let existing = state.files.get_mut(&key).ok_or_else(|| {
                    TransportError::Remote {
                        path: path.to_string(),
                        message: "object not found".to_string(),
                    }
                })?;
                overlay(existing, bytes);
            }
        }
        Ok(())
    }

    async fn append_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_write
            || state
                .fail_write_substr
                .as_deref()
                .is_some_and(|s| path.contains(s))
        {
            return Err(TransportError::Remote {
                path: path.to_string(),
                message: "mock write failure".to_string(),
            });
        }
        let key = self.key(path);
        state.files.entry(key).or_default().extend_from_slice(bytes);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.check_alive()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_remove {
            return Err(TransportError::Remote {
                path: path.to_string(),
                message: "mock remove failure".to_string(),
            });
        }
        state
            .files
            .remove(&self.key(path))
            .map(|_| ())
            .ok_or_else(|| TransportError::Remote {
                path: path.to_string(),
                message: "object not found".to_string(),
            })
    }
}

/// Write `bytes` over the front of `existing` without shortening it.
fn overlay(existing: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() >= existing.len() {
        *existing = bytes.to_vec();
    } else {
        existing[..bytes.len()].copy_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn handle_for(client: &MockShareClient, share: &str) -> Box<dyn ShareHandle> {
        let mut conn = client.connect("host").await.unwrap();
        conn.authenticate("u", "p").await.unwrap();
        conn.open_share(share).await.unwrap()
    }

    #[tokio::test]
    async fn connect_counting_and_failure_injection() {
        let client = MockShareClient::new();
        client.connect("h").await.unwrap();
        assert_eq!(client.connect_count(), 1);

        client.set_fail_connect(true);
        assert!(client.connect("h").await.is_err());
        assert_eq!(client.connect_count(), 1);

        client.set_fail_connect(false);
        client.fail_next_connects(2);
        assert!(client.connect("h").await.is_err());
        assert!(client.connect("h").await.is_err());
        client.connect("h").await.unwrap();
        assert_eq!(client.connect_count(), 2);
    }

    #[tokio::test]
    async fn state_is_shared_across_connections() {
        let client = MockShareClient::new();
        let h1 = handle_for(&client, "s").await;
        h1.write_file("f", CreateDisposition::CreateAlways, b"one")
            .await
            .unwrap();

        let h2 = handle_for(&client, "s").await;
        assert_eq!(h2.read_file("f").await.unwrap(), b"one");
        assert_eq!(client.file("s", "f").unwrap(), b"one");
    }

    #[tokio::test]
    async fn close_invalidates_only_that_connection() {
        let client = MockShareClient::new();
        let mut conn = client.connect("h").await.unwrap();
        conn.authenticate("u", "p").await.unwrap();
        let stale = conn.open_share("s").await.unwrap();

        let live = handle_for(&client, "s").await;

        conn.close().await.unwrap();
        assert_eq!(client.disconnect_count(), 1);
        assert!(stale.file_exists("f").await.is_err());
        assert!(live.file_exists("f").await.is_ok());
    }

    #[tokio::test]
    async fn create_dir_requires_parent() {
        let client = MockShareClient::new();
        let handle = handle_for(&client, "s").await;

        let err = handle.create_dir("a/b").await.unwrap_err();
        assert!(matches!(err, TransportError::Remote { .. }));

        handle.create_dir("a").await.unwrap();
        handle.create_dir("a/b").await.unwrap();
        assert!(client.dir_exists("s", "a/b"));
    }

    #[tokio::test]
    async fn dispositions_overlay_and_replace() {
        let client = MockShareClient::new();
        let handle = handle_for(&client, "s").await;

        handle
            .write_file("f", CreateDisposition::CreateAlways, b"abcdef")
            .await
            .unwrap();
        handle
            .write_file("f", CreateDisposition::CreateIfMissing, b"XY")
            .await
            .unwrap();
        assert_eq!(client.file("s", "f").unwrap(), b"XYcdef");

        handle
            .write_file("f", CreateDisposition::CreateAlways, b"new")
            .await
            .unwrap();
        assert_eq!(client.file("s", "f").unwrap(), b"new");

        let err = handle
            .write_file("missing", CreateDisposition::OpenExisting, b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote { .. }));
    }

    #[tokio::test]
    async fn targeted_write_failures() {
        let client = MockShareClient::new();
        let handle = handle_for(&client, "s").await;
        client.fail_writes_matching("audit");

        handle
            .write_file("data.csv", CreateDisposition::CreateAlways, b"ok")
            .await
            .unwrap();
        let err = handle
            .write_file("audit_access_log.csv", CreateDisposition::CreateAlways, b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote { .. }));
    }
}
