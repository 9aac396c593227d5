//! Drain command implementation

use crate::config::{self, FileConfig};
use anyhow::Result;
use clap::Args;
use shareline_core::spool::Spool;
use shareline_core::transport::local::LocalShareClient;
use shareline_core::{Credentials, RetryPolicy, ShareWriter, WriteRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Replay spooled records against the share
#[derive(Args, Debug)]
pub struct DrainArgs {
    /// Directory where the share host is mounted
    #[arg(long)]
    mount: Option<PathBuf>,

    /// Principal for share authentication
    #[arg(long)]
    user: Option<String>,

    /// Secret for share authentication
    #[arg(long)]
    pass: Option<String>,

    /// Spool directory (defaults to the configured one)
    #[arg(long)]
    spool_dir: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the drain command
pub async fn execute(args: DrainArgs) -> Result<()> {
    let file = config::load(args.config.as_deref())?;

    let dir = args
        .spool_dir
        .clone()
        .or_else(|| file.spool.dir.clone())
        .or_else(config::default_spool_dir);
    let Some(dir) = dir else {
        anyhow::bail!("no spool directory configured: pass --spool-dir or set [spool].dir");
    };
    let spool = Spool::new(dir);

    let mount = args.mount.clone().or_else(|| file.share.mount.clone());
    let Some(mount) = mount else {
        anyhow::bail!("no share transport configured: pass --mount or set [share].mount");
    };
    let writer = ShareWriter::new(Arc::new(LocalShareClient::new(mount)));

    let credentials = Credentials::new(
        args.user
            .clone()
            .or_else(|| file.share.user.clone())
            .unwrap_or_default(),
        args.pass
            .clone()
            .or_else(|| file.share.pass.clone())
            .unwrap_or_default(),
    );
    let retry = RetryPolicy::new(
        file.retry.attempts.unwrap_or(3),
        Duration::from_millis(file.retry.delay_ms.unwrap_or(1000)),
    );
    let atomic = file.write.atomic.unwrap_or(true);

    let status = spool
        .drain(|entry| {
            let writer = &writer;
            let credentials = credentials.clone();
            async move {
                let mut request = WriteRequest::new(entry.url, entry.line);
                request.credentials = credentials;
                request.retry = retry;
                request.atomic = atomic;
                writer.write(request).await.map(|_| ())
            }
        })
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.delivered == 0 && status.remaining == 0 {
        println!("Spool is empty");
    } else {
        println!(
            "Delivered {} record(s), {} remaining",
            status.delivered, status.remaining
        );
    }
    Ok(())
}
