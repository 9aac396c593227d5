//! Decrypt command implementation

use anyhow::{Context, Result};
use clap::Args;
use shareline_core::crypto::{KeyStore, PlatformKeyStore};
use shareline_core::envelope;
use std::path::PathBuf;

/// Open an encryption envelope back into plaintext
#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Envelope file to open
    input: PathBuf,

    /// Where to write the plaintext
    output: PathBuf,

    /// Passphrase for version-2 envelopes
    #[arg(long, conflicts_with = "key_alias")]
    passphrase: Option<String>,

    /// Device key alias for version-1 envelopes
    #[arg(long)]
    key_alias: Option<String>,
}

/// Execute the decrypt command
pub async fn execute(args: DecryptArgs) -> Result<()> {
    let sealed = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    // The version byte decides which key material is needed, so it is
    // inspected before any key work happens.
    let version = envelope::version(&sealed)?;
    let plaintext = match version {
        envelope::VERSION_PASSPHRASE => {
            let Some(passphrase) = args.passphrase.clone() else {
                anyhow::bail!("this is a passphrase envelope (version 2): pass --passphrase");
            };
            tokio::task::spawn_blocking(move || {
                envelope::open_with_passphrase(&sealed, &passphrase)
            })
            .await??
        }
        envelope::VERSION_DEVICE_KEY => {
            if args.passphrase.is_some() {
                anyhow::bail!(
                    "this is a device-key envelope (version 1): pass --key-alias, not --passphrase"
                );
            }
            let alias = args
                .key_alias
                .clone()
                .unwrap_or_else(|| "default_key".to_string());
            tokio::task::spawn_blocking(move || {
                let key = PlatformKeyStore::default().get_or_create(&alias)?;
                envelope::open_with_key(&sealed, &key)
            })
            .await??
        }
        other => anyhow::bail!("unsupported envelope version {other}"),
    };

    tokio::fs::write(&args.output, &plaintext)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Opened {} -> {} ({} bytes)",
        args.input.display(),
        args.output.display(),
        plaintext.len()
    );
    Ok(())
}
