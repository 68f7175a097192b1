use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use archiver_core::Article;
use archiver_logging::{engine_debug, engine_info};
use chrono::Local;
use thiserror::Error;

use crate::convert::{Converter, MarkdownConverter};
use crate::extract::{ArticleExtractor, Extractor};
use crate::fetch::Fetcher;
use crate::filename::{account_dir_name, document_path, publish_date};
use crate::frontmatter::{build_markdown_document, DocumentHeader};
use crate::persist::{AtomicFileWriter, CreateOutcome, PersistError};
use crate::FetchError;

pub const DEFAULT_OUTPUT_DIR: &str = "articles";
pub const DEFAULT_MIN_FILE_SIZE_KB: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterSettings {
    pub base_dir: PathBuf,
    /// Documents smaller than this are treated as empty shells and dropped.
    pub min_bytes: u64,
    /// Pause after every article fetch.
    pub fetch_pause: Duration,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            min_bytes: DEFAULT_MIN_FILE_SIZE_KB * 1024,
            fetch_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved { path: PathBuf, bytes: u64 },
    /// The document was written by an earlier run; nothing was touched.
    AlreadyExists { path: PathBuf },
    /// Rendered below the minimum size; no file is left behind.
    Discarded { path: PathBuf, bytes: u64 },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Saved { path, .. }
            | WriteOutcome::AlreadyExists { path }
            | WriteOutcome::Discarded { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("article has no link")]
    MissingLink,
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("write failed: {0}")]
    Persist(#[from] PersistError),
}

/// Fetches an article page and stores it as a Markdown document, at most once.
pub struct DocumentWriter {
    fetcher: Arc<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    converter: Box<dyn Converter>,
    settings: WriterSettings,
}

impl DocumentWriter {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: WriterSettings) -> Self {
        Self {
            fetcher,
            extractor: Box::new(ArticleExtractor::default()),
            converter: Box::new(MarkdownConverter),
            settings,
        }
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// Destination of `article` under a known account name.
    pub fn destination(&self, article: &Article, account_name: &str) -> PathBuf {
        document_path(
            &self.settings.base_dir,
            account_name,
            article.publish_time,
            &article.title,
            article.link().unwrap_or_default(),
            &Local,
        )
    }

    pub async fn write(
        &self,
        article: &Article,
        account_name: &str,
    ) -> Result<WriteOutcome, WriteError> {
        let link = article.link().ok_or(WriteError::MissingLink)?;
        let configured_name = account_name.trim();

        // Without a configured name the folder depends on the fetched page.
        if !configured_name.is_empty() {
            let path = self.destination(article, configured_name);
            if path.exists() {
                engine_debug!("Document already present: {}", path.display());
                return Ok(WriteOutcome::AlreadyExists { path });
            }
        }

        let page = self.fetcher.fetch(link).await?;
        let outcome = self.render_and_store(article, link, configured_name, &page.text());
        if !self.settings.fetch_pause.is_zero() {
            tokio::time::sleep(self.settings.fetch_pause).await;
        }
        outcome
    }

    fn render_and_store(
        &self,
        article: &Article,
        link: &str,
        configured_name: &str,
        html: &str,
    ) -> Result<WriteOutcome, WriteError> {
        let extracted = self.extractor.extract(html);

        let account = if configured_name.is_empty() {
            extracted
                .nickname
                .as_deref()
                .map(account_dir_name)
                .unwrap_or_else(|| account_dir_name(""))
        } else {
            configured_name.to_string()
        };
        let path = self.destination(article, &account);
        if path.exists() {
            engine_debug!("Document already present: {}", path.display());
            return Ok(WriteOutcome::AlreadyExists { path });
        }

        let body = self.converter.to_markdown(&extracted.content_html);
        let date = publish_date(article.publish_time, &Local);
        let header = DocumentHeader {
            title: &article.title,
            date: &date,
            link,
            account: &account,
            digest: &article.digest,
        };
        let document = build_markdown_document(&header, &body);
        let bytes = document.len() as u64;

        if bytes < self.settings.min_bytes {
            engine_info!("Discarding {} ({} bytes, below minimum)", path.display(), bytes);
            return Ok(WriteOutcome::Discarded { path, bytes });
        }

        let (dir, file_name) = split_destination(&path);
        match AtomicFileWriter::new(dir).create_new(&file_name, &document)? {
            CreateOutcome::Created(path) => {
                engine_info!("Saved {} ({} bytes)", path.display(), bytes);
                Ok(WriteOutcome::Saved { path, bytes })
            }
            CreateOutcome::AlreadyExists(path) => Ok(WriteOutcome::AlreadyExists { path }),
        }
    }
}

fn split_destination(path: &Path) -> (PathBuf, String) {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, file_name)
}
