//! Encrypt command implementation

use anyhow::{Context, Result};
use clap::Args;
use shareline_core::crypto::{KeyStore, PlatformKeyStore};
use shareline_core::envelope;
use std::path::PathBuf;

/// Seal a file into an encryption envelope
#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// File to seal
    input: PathBuf,

    /// Where to write the envelope
    output: PathBuf,

    /// Derive the key from a passphrase (version-2 envelope)
    #[arg(long, conflicts_with = "key_alias")]
    passphrase: Option<String>,

    /// Device key alias (version-1 envelope)
    #[arg(long)]
    key_alias: Option<String>,
}

/// Execute the encrypt command
pub async fn execute(args: EncryptArgs) -> Result<()> {
    let plaintext = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    // Key derivation and AES-GCM both block, so the sealing runs off the
    // async runtime.
    let passphrase = args.passphrase.clone();
    let key_alias = args.key_alias.clone();
    let sealed =
        tokio::task::spawn_blocking(move || seal(&plaintext, &passphrase, &key_alias)).await??;

    tokio::fs::write(&args.output, &sealed)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Sealed {} -> {} ({} bytes)",
        args.input.display(),
        args.output.display(),
        sealed.len()
    );
    Ok(())
}

fn seal(
    plaintext: &[u8],
    passphrase: &Option<String>,
    key_alias: &Option<String>,
) -> Result<Vec<u8>> {
    if let Some(passphrase) = passphrase {
        return Ok(envelope::seal_with_passphrase(plaintext, passphrase)?);
    }
    let alias = key_alias.as_deref().unwrap_or("default_key");
    let key = PlatformKeyStore::default().get_or_create(alias)?;
    Ok(envelope::seal_with_key(plaintext, &key)?)
}
