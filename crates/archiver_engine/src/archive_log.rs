//! Append-only text log of captured articles.
//!
//! The log is both the human-readable record of every archived article and the
//! source of truth for which links were already captured. Each flush appends one
//! block:
//!
//! ```text
//! ============================================================
//! account: <name>
//! count: <n>
//! first title: <title>
//! first link: <link>
//! ============================================================
//! title: <title>
//! link: <link>
//! --------------------------------------------------
//! ```

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use archiver_core::{Article, FirstMarkers};

use crate::persist::StoreError;

const BLOCK_RULE: &str = "============================================================";
const ENTRY_RULE: &str = "--------------------------------------------------";
const ACCOUNT_PREFIX: &str = "account: ";
const COUNT_PREFIX: &str = "count: ";
const FIRST_TITLE_PREFIX: &str = "first title: ";
const FIRST_LINK_PREFIX: &str = "first link: ";
const TITLE_PREFIX: &str = "title: ";
const LINK_PREFIX: &str = "link: ";

pub trait ArchiveLog: Send + Sync {
    /// Every link ever recorded.
    fn load_links(&self) -> Result<HashSet<String>, StoreError>;
    /// Account display name to the first link of its most recent block.
    fn load_first_markers(&self) -> Result<FirstMarkers, StoreError>;
    /// Record one flush. An empty slice appends nothing.
    fn append_block(&self, account_name: &str, articles: &[Article]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct TextArchiveLog {
    path: PathBuf,
}

impl TextArchiveLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as empty.
    fn read(&self) -> Result<String, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl ArchiveLog for TextArchiveLog {
    fn load_links(&self) -> Result<HashSet<String>, StoreError> {
        Ok(parse_links(&self.read()?))
    }

    fn load_first_markers(&self) -> Result<FirstMarkers, StoreError> {
        Ok(parse_first_markers(&self.read()?))
    }

    fn append_block(&self, account_name: &str, articles: &[Article]) -> Result<(), StoreError> {
        let Some(block) = render_block(account_name, articles) else {
            return Ok(());
        };
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(block.as_bytes()).map_err(write_err)?;
        file.sync_data().map_err(write_err)
    }
}

pub fn render_block(account_name: &str, articles: &[Article]) -> Option<String> {
    let first = articles.first()?;
    let mut block = String::new();
    block.push_str(BLOCK_RULE);
    block.push('\n');
    push_field(&mut block, ACCOUNT_PREFIX, account_name);
    push_field(&mut block, COUNT_PREFIX, &articles.len().to_string());
    push_field(&mut block, FIRST_TITLE_PREFIX, &first.title);
    push_field(&mut block, FIRST_LINK_PREFIX, first.link().unwrap_or_default());
    block.push_str(BLOCK_RULE);
    block.push('\n');
    for article in articles {
        push_field(&mut block, TITLE_PREFIX, &article.title);
        push_field(&mut block, LINK_PREFIX, article.link().unwrap_or_default());
        block.push_str(ENTRY_RULE);
        block.push('\n');
    }
    Some(block)
}

// One record per line, so embedded line breaks are flattened.
fn push_field(out: &mut String, prefix: &str, value: &str) {
    out.push_str(prefix);
    out.extend(value.chars().map(|c| if c == '\r' || c == '\n' { ' ' } else { c }));
    out.push('\n');
}

pub fn parse_links(text: &str) -> HashSet<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix(LINK_PREFIX))
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_first_markers(text: &str) -> FirstMarkers {
    let mut markers = FirstMarkers::new();
    let mut current_account: Option<String> = None;
    for line in text.lines() {
        if let Some(account) = line.strip_prefix(ACCOUNT_PREFIX) {
            current_account = Some(account.trim().to_string());
        } else if let Some(link) = line.strip_prefix(FIRST_LINK_PREFIX) {
            if let Some(account) = current_account.take() {
                let link = link.trim();
                if !link.is_empty() {
                    // Later blocks are newer.
                    markers.insert(account, link.to_string());
                }
            }
        }
    }
    markers
}
