//! CLI command dispatch and execution

use anyhow::Result;
use clap::{Parser, Subcommand};

mod decrypt;
mod drain;
mod encrypt;
mod export;
mod write;

/// shareline - reliable record appends to remote file shares
#[derive(Parser, Debug)]
#[command(
    name = "shareline",
    version,
    about = "Reliable record appends to remote file shares",
    long_about = "Append CSV lines or spreadsheet rows to files on mounted shares, with bounded retries, temp-and-swap writes, optional envelope encryption, and an offline spool for records that could not be delivered"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one record line to a share target
    Write(write::WriteArgs),

    /// Seal a local file into an encryption envelope
    Encrypt(encrypt::EncryptArgs),

    /// Open an envelope back into plaintext
    Decrypt(decrypt::DecryptArgs),

    /// Render a workbook target's rows as CSV
    Export(export::ExportArgs),

    /// Deliver spooled records to their targets
    Drain(drain::DrainArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Write(args) => write::execute(args).await,
            Commands::Encrypt(args) => encrypt::execute(args).await,
            Commands::Decrypt(args) => decrypt::execute(args).await,
            Commands::Export(args) => export::execute(args).await,
            Commands::Drain(args) => drain::execute(args).await,
        }
    }
}
