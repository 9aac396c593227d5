//! Tracing setup shared by the shareline binaries.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter expression.
pub const ENV_FILTER_VAR: &str = "SHARELINE_LOG";

static INIT: Once = Once::new();

/// Install the process-wide tracing subscriber.
///
/// `SHARELINE_LOG` accepts a full filter expression (`debug`,
/// `shareline_core=trace,warn`, ...); unset or unparseable values fall back
/// to `info`. Calling this more than once is a no-op, and an embedding
/// application that already installed its own subscriber keeps it.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(ENV_FILTER_VAR)
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}
