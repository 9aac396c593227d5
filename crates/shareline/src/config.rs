//! CLI configuration file: TOML sections mirroring the engine knobs.
//!
//! Every knob resolves flag over file over built-in default; commands do the
//! merging, this module only finds and parses the file. The file itself is
//! located via `--config`, then the `SHARELINE_CONFIG` environment variable,
//! then `~/.config/shareline/config.toml`. An explicitly named file must
//! exist and parse; only the default location is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub share: ShareSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub write: WriteSection,
    #[serde(default)]
    pub encryption: EncryptionSection,
    #[serde(default)]
    pub spreadsheet: SpreadsheetSection,
    #[serde(default)]
    pub spool: SpoolSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareSection {
    /// Default target URL when the command line gives none.
    pub url: Option<String>,
    /// Directory where the share host is mounted.
    pub mount: Option<PathBuf>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySection {
    /// Total attempts, including the first.
    pub attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteSection {
    pub atomic: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionSection {
    pub enabled: Option<bool>,
    pub key_alias: Option<String>,
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpreadsheetSection {
    pub protect: Option<bool>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpoolSection {
    pub dir: Option<PathBuf>,
}

/// Load the config file, falling back to defaults when none is configured.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => match std::env::var("SHARELINE_CONFIG") {
            Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => default_path().filter(|path| path.exists()),
        },
    };
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Default config file location.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shareline").join("config.toml"))
}

/// Default spool directory, beside the config file.
pub fn default_spool_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shareline").join("spool"))
}
