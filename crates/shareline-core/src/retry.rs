//! Bounded retry orchestration around single attempts.

use crate::attempt::{self, EngineDeps};
use crate::error::WriteError;
use crate::request::WriteRequest;
use tracing::{debug, warn};

/// Drive attempts until one succeeds or the budget is spent, returning the
/// number of attempts used.
///
/// The inter-attempt delay is fixed and there is no trailing sleep after the
/// final failure. When the budget runs out, the error surfaced is the last
/// attempt's. Non-retryable errors short-circuit without sleeping.
pub(crate) async fn run(request: &WriteRequest, deps: &EngineDeps) -> Result<u32, WriteError> {
    let budget = request.retry.max_attempts.max(1);
    let mut attempt_no = 1u32;
    loop {
        match attempt::run_once(request, deps).await {
            Ok(()) => {
                debug!(attempt = attempt_no, url = %request.target_url, "write delivered");
                return Ok(attempt_no);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt_no >= budget {
                    warn!(attempts = attempt_no, url = %request.target_url, error = %e, "write abandoned");
                    return Err(e);
                }
                warn!(attempt = attempt_no, error = %e, "attempt failed, retrying");
                tokio::time::sleep(request.retry.delay).await;
                attempt_no += 1;
            }
        }
    }
}
