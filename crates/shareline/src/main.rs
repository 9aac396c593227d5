//! shareline - reliable record appends to remote file shares
//!
//! A CLI over the shareline-core write engine: append CSV lines or
//! spreadsheet rows to files on mounted shares, with retries, atomic
//! swaps, optional envelope encryption, and an offline spool.

use clap::Parser;

mod commands;
mod config;

use commands::Cli;

#[tokio::main]
async fn main() {
    shareline_core::logging::init();
    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
