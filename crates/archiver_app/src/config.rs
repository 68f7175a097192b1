//! `config.json` loading and validation.
//!
//! Accounts come either inline as `accounts: [{fakeid, name}]` or, for older
//! setups, as two line-oriented files (`fakeids_file`, `names_file`) joined by
//! position. Relative paths are taken as given, i.e. relative to the working
//! directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use archiver_core::{Account, AccountListError};
use archiver_engine::{DEFAULT_LISTING_ENDPOINT, DEFAULT_MIN_FILE_SIZE_KB, DEFAULT_OUTPUT_DIR};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ARCHIVE_LOG: &str = "archive_log.txt";
pub const DEFAULT_HISTORY_FILE: &str = "history.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("{path:?} is not valid configuration: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("`{0}` is missing or empty")]
    Missing(&'static str),
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("configure accounts either inline or through fakeids_file/names_file, not both")]
    AmbiguousAccounts,
    #[error("invalid account list: {0}")]
    Accounts(#[from] AccountListError),
}

#[derive(Debug, Deserialize)]
struct AccountEntry {
    fakeid: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    token: String,
    #[serde(default)]
    cookie: String,
    #[serde(default = "default_check_interval")]
    check_interval_minutes: u64,
    #[serde(default = "default_retry_interval")]
    retry_interval_minutes: u64,
    #[serde(default = "default_min_file_size")]
    min_file_size_kb: u64,
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    fakeids_file: Option<PathBuf>,
    names_file: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    archive_log: Option<PathBuf>,
    history_file: Option<PathBuf>,
    listing_endpoint: Option<String>,
}

fn default_check_interval() -> u64 {
    60
}

fn default_retry_interval() -> u64 {
    5
}

fn default_min_file_size() -> u64 {
    DEFAULT_MIN_FILE_SIZE_KB
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub token: String,
    pub cookie: String,
    pub check_interval: Duration,
    pub retry_interval: Duration,
    pub min_file_size_kb: u64,
    pub accounts: Vec<Account>,
    pub output_dir: PathBuf,
    pub archive_log: PathBuf,
    pub history_file: PathBuf,
    pub listing_endpoint: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::validate(raw)
    }

    pub fn min_file_size_bytes(&self) -> u64 {
        self.min_file_size_kb.saturating_mul(1024)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let token = raw.token.trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::Missing("token"));
        }
        let cookie = raw.cookie.trim().to_string();
        if cookie.is_empty() {
            return Err(ConfigError::Missing("cookie"));
        }
        if raw.check_interval_minutes == 0 {
            return Err(ConfigError::Zero("check_interval_minutes"));
        }
        if raw.retry_interval_minutes == 0 {
            return Err(ConfigError::Zero("retry_interval_minutes"));
        }

        let uses_files = raw.fakeids_file.is_some() || raw.names_file.is_some();
        let accounts = match (raw.accounts.is_empty(), uses_files) {
            (false, true) => return Err(ConfigError::AmbiguousAccounts),
            (false, false) => Account::from_pairs(
                raw.accounts
                    .into_iter()
                    .map(|entry| (entry.fakeid, entry.name)),
            )?,
            (true, _) => {
                let ids_path = raw.fakeids_file.ok_or(ConfigError::Missing("accounts"))?;
                let ids = read_lines(&ids_path)?;
                let names = match raw.names_file {
                    Some(names_path) => read_lines(&names_path)?,
                    // Folder names then come from the article pages.
                    None => vec![String::new(); ids.len()],
                };
                Account::join_lists(ids, names)?
            }
        };

        Ok(Self {
            token,
            cookie,
            check_interval: minutes(raw.check_interval_minutes),
            retry_interval: minutes(raw.retry_interval_minutes),
            min_file_size_kb: raw.min_file_size_kb,
            accounts,
            output_dir: raw.output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            archive_log: raw.archive_log.unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_LOG)),
            history_file: raw.history_file.unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE)),
            listing_endpoint: raw
                .listing_endpoint
                .filter(|endpoint| !endpoint.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LISTING_ENDPOINT.to_string()),
        })
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(60))
}

/// Non-blank lines, trimmed.
fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
