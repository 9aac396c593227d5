//! One delivery attempt: fresh connection, full pipeline, guaranteed teardown.

use crate::crypto::KeyStore;
use crate::error::WriteError;
use crate::request::WriteRequest;
use crate::target::ParsedTarget;
use crate::transport::{ShareClient, ShareConnection};
use crate::workbook::WorkbookCodec;
use crate::{audit, ensure, payload, writer};
use std::sync::Arc;
use tracing::warn;

/// Shared collaborators a worker needs to run attempts.
#[derive(Clone)]
pub(crate) struct EngineDeps {
    pub client: Arc<dyn ShareClient>,
    pub keystore: Arc<dyn KeyStore>,
    pub codec: Arc<dyn WorkbookCodec>,
}

/// Run one complete attempt over a connection opened just for it.
///
/// Locate, ensure directories, build the payload from current target state,
/// write, audit. The connection is closed on every exit path; teardown
/// trouble is logged, never surfaced, so it cannot mask the attempt's own
/// outcome. If the task is torn down mid-attempt, dropping the connection
/// is the backstop.
pub(crate) async fn run_once(request: &WriteRequest, deps: &EngineDeps) -> Result<(), WriteError> {
    // Parsed per attempt; a malformed URL consumes no connection.
    let target = ParsedTarget::parse(&request.target_url)?;

    let mut conn = deps.client.connect(&target.host).await?;
    let outcome = pipeline(conn.as_mut(), &target, request, deps).await;
    if let Err(e) = conn.close().await {
        warn!(error = %e, "connection teardown failed");
    }
    outcome
}

async fn pipeline(
    conn: &mut dyn ShareConnection,
    target: &ParsedTarget,
    request: &WriteRequest,
    deps: &EngineDeps,
) -> Result<(), WriteError> {
    conn.authenticate(&request.credentials.principal, &request.credentials.secret)
        .await?;
    let handle = conn.open_share(&target.share).await?;

    ensure::ensure_parent_dirs(handle.as_ref(), target).await?;
    let payload =
        payload::build(handle.as_ref(), target, request, &deps.keystore, &deps.codec).await?;
    writer::write_payload(handle.as_ref(), target, &payload, request.atomic).await?;
    audit::ensure_log(handle.as_ref(), target).await;
    Ok(())
}
