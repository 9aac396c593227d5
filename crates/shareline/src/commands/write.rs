//! Write command implementation

use crate::config::{self, FileConfig};
use anyhow::Result;
use clap::Args;
use shareline_core::spool::Spool;
use shareline_core::transport::local::LocalShareClient;
use shareline_core::{
    Credentials, EncryptionSpec, PayloadFormat, RetryPolicy, ShareWriter, SpreadsheetSpec,
    WriteRequest,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Append one record line to a share target
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Target URL (smb://host/share/path)
    #[arg(long)]
    url: Option<String>,

    /// Record line to append
    #[arg(long)]
    line: Option<String>,

    /// Directory where the share host is mounted
    #[arg(long)]
    mount: Option<PathBuf>,

    /// Principal for share authentication
    #[arg(long)]
    user: Option<String>,

    /// Secret for share authentication
    #[arg(long)]
    pass: Option<String>,

    /// Total attempts, including the first
    #[arg(long)]
    retries: Option<u32>,

    /// Delay between attempts in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Append directly instead of the temp-and-swap write
    #[arg(long)]
    no_atomic: bool,

    /// Seal the payload in an encryption envelope
    #[arg(long)]
    encrypt: bool,

    /// Device key alias for version-1 envelopes
    #[arg(long)]
    key_alias: Option<String>,

    /// Passphrase for version-2 envelopes (wins over the device key)
    #[arg(long)]
    passphrase: Option<String>,

    /// Treat the target as a spreadsheet regardless of extension
    #[arg(long)]
    sheet: bool,

    /// Protect the rewritten worksheet
    #[arg(long)]
    protect_sheet: bool,

    /// Password for worksheet protection
    #[arg(long)]
    sheet_password: Option<String>,

    /// Spool the record locally when every attempt fails
    #[arg(long)]
    spool_on_failure: bool,

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

/// Execute the write command
pub async fn execute(args: WriteArgs) -> Result<()> {
    let file = config::load(args.config.as_deref())?;
    let request = build_request(&args, &file);

    // Input validation comes before any transport wiring so an empty url or
    // line always fails with its own message.
    request.validate()?;

    // Plain line records can be replayed from the spool; enveloped and
    // spreadsheet payloads cannot, their replay would lose the format.
    let spoolable =
        args.spool_on_failure && matches!(request.format, PayloadFormat::Line { encryption: None });
    let record = (request.target_url.clone(), request.line.clone());

    let writer = share_writer(&args, &file)?;
    match writer.write(request).await {
        Ok(receipt) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!("Wrote {} (attempts: {})", receipt.url, receipt.attempts);
            }
            Ok(())
        }
        Err(e) if spoolable && e.is_retryable() => {
            let spool = Spool::new(spool_dir(&args, &file)?);
            let entry = spool.enqueue(&record.0, &record.1).await?;

            if args.json {
                let output = serde_json::json!({
                    "status": "spooled",
                    "spool_entry": entry,
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                eprintln!("Warning: write failed ({e}); record spooled for later delivery");
                eprintln!("Spool entry: {}", entry.display());
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge flags over file config over built-in defaults into one request.
fn build_request(args: &WriteArgs, file: &FileConfig) -> WriteRequest {
    let url = args
        .url
        .clone()
        .or_else(|| file.share.url.clone())
        .unwrap_or_default();
    let mut request = WriteRequest::new(url.clone(), args.line.clone().unwrap_or_default());
    request.credentials = Credentials::new(
        args.user
            .clone()
            .or_else(|| file.share.user.clone())
            .unwrap_or_default(),
        args.pass
            .clone()
            .or_else(|| file.share.pass.clone())
            .unwrap_or_default(),
    );
    request.retry = RetryPolicy::new(
        args.retries.or(file.retry.attempts).unwrap_or(3),
        Duration::from_millis(args.retry_delay_ms.or(file.retry.delay_ms).unwrap_or(1000)),
    );
    request.atomic = if args.no_atomic {
        false
    } else {
        file.write.atomic.unwrap_or(true)
    };
    request.format = resolve_format(&url, args, file);
    request
}

fn resolve_format(url: &str, args: &WriteArgs, file: &FileConfig) -> PayloadFormat {
    if args.sheet || url.to_ascii_lowercase().ends_with(".xlsx") {
        return PayloadFormat::Spreadsheet(SpreadsheetSpec {
            protect: args.protect_sheet || file.spreadsheet.protect.unwrap_or(false),
            password: args
                .sheet_password
                .clone()
                .or_else(|| file.spreadsheet.password.clone()),
        });
    }

    let encrypt =
        args.encrypt || args.passphrase.is_some() || file.encryption.enabled.unwrap_or(false);
    if !encrypt {
        return PayloadFormat::Line { encryption: None };
    }
    let encryption = match args
        .passphrase
        .clone()
        .or_else(|| file.encryption.passphrase.clone())
    {
        Some(passphrase) => EncryptionSpec::PassphraseKey { passphrase },
        None => EncryptionSpec::DeviceKey {
            alias: args
                .key_alias
                .clone()
                .or_else(|| file.encryption.key_alias.clone())
                .unwrap_or_else(|| "default_key".to_string()),
        },
    };
    PayloadFormat::Line {
        encryption: Some(encryption),
    }
}

fn share_writer(args: &WriteArgs, file: &FileConfig) -> Result<ShareWriter> {
    let mount = args.mount.clone().or_else(|| file.share.mount.clone());
    let Some(mount) = mount else {
        anyhow::bail!("no share transport configured: pass --mount or set [share].mount");
    };
    Ok(ShareWriter::new(Arc::new(LocalShareClient::new(mount))))
}

fn spool_dir(args: &WriteArgs, file: &FileConfig) -> Result<PathBuf> {
    if let Some(dir) = args.spool_dir.clone().or_else(|| file.spool.dir.clone()) {
        return Ok(dir);
    }
    config::default_spool_dir()
        .ok_or_else(|| anyhow::anyhow!("no spool directory available on this platform"))
}
