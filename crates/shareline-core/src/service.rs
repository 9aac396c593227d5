//! Worker-per-request write service.

use crate::attempt::EngineDeps;
use crate::crypto::{KeyStore, PlatformKeyStore};
use crate::error::WriteError;
use crate::request::WriteRequest;
use crate::retry;
use crate::transport::ShareClient;
use crate::workbook::{WorkbookCodec, XlsxCodec};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, Semaphore};
use tracing::debug;

/// Upper bound on concurrently running write workers.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Outcome of a delivered write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    /// Target the record went to.
    pub url: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    /// Completion time, RFC 3339.
    pub completed_at: String,
}

/// Async write service: one worker task per accepted request.
///
/// Submission validates synchronously and rejects empty input before any
/// worker spawns. Accepted requests retry on their own task, bounded by a
/// semaphore so a flood of requests cannot pile connections onto a host
/// that is already struggling, and report back over a oneshot channel.
/// Requests never interleave within a worker; ordering across workers is
/// not defined.
pub struct ShareWriter {
    deps: EngineDeps,
    permits: Arc<Semaphore>,
}

impl ShareWriter {
    /// Service over `client` with the platform key store, the XLSX codec,
    /// and the default worker bound.
    pub fn new(client: Arc<dyn ShareClient>) -> Self {
        Self::with_limit(client, DEFAULT_MAX_WORKERS)
    }

    pub fn with_limit(client: Arc<dyn ShareClient>, max_workers: usize) -> Self {
        Self {
            deps: EngineDeps {
                client,
                keystore: Arc::new(PlatformKeyStore::default()),
                codec: Arc::new(XlsxCodec::new()),
            },
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Replace the device-key store. Tests use the in-memory one.
    pub fn with_keystore(mut self, keystore: Arc<dyn KeyStore>) -> Self {
        self.deps.keystore = keystore;
        self
    }

    /// Replace the workbook codec.
    pub fn with_codec(mut self, codec: Arc<dyn WorkbookCodec>) -> Self {
        self.deps.codec = codec;
        self
    }

    /// Validate and enqueue one request, returning a completion handle.
    pub fn submit(&self, request: WriteRequest) -> Result<WriteHandle, WriteError> {
        request.validate()?;
        debug!(url = %request.target_url, "request accepted");

        let (tx, rx) = oneshot::channel();
        let deps = self.deps.clone();
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = tx.send(Err(WriteError::WorkerLost));
                    return;
                }
            };
            let result = retry::run(&request, &deps)
                .await
                .map(|attempts| WriteReceipt {
                    url: request.target_url.clone(),
                    attempts,
                    completed_at: chrono::Utc::now().to_rfc3339(),
                });
            // The caller may have dropped its handle; that is their call.
            let _ = tx.send(result);
        });
        Ok(WriteHandle { rx })
    }

    /// Submit and wait for completion.
    pub async fn write(&self, request: WriteRequest) -> Result<WriteReceipt, WriteError> {
        self.submit(request)?.wait().await
    }
}

/// Completion handle for one submitted request.
pub struct WriteHandle {
    rx: oneshot::Receiver<Result<WriteReceipt, WriteError>>,
}

impl WriteHandle {
    /// Wait for the worker's outcome.
    ///
    /// A worker that died without reporting, for instance on panic or
    /// runtime teardown, surfaces as [`WriteError::WorkerLost`].
    pub async fn wait(self) -> Result<WriteReceipt, WriteError> {
        self.rx.await.unwrap_or(Err(WriteError::WorkerLost))
    }
}
