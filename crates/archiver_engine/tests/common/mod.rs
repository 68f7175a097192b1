#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use archiver_core::{Account, Article, SyncMode};
use archiver_engine::{
    DocumentWriter, FailureKind, FetchError, FetchedPage, Fetcher, JsonHistoryStore, ListingPage,
    ListingSource, SyncController, SyncSettings, TextArchiveLog, WriterSettings,
};
use tempfile::TempDir;

/// Serves canned article pages and records every request.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Answer every unknown URL with `html` instead of 404.
    pub fn serving_all(html: &str) -> Self {
        Self {
            fallback: Some(html.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url).or(self.fallback.as_ref()) {
            Some(html) => Ok(FetchedPage {
                bytes: html.as_bytes().to_vec(),
                final_url: url.to_string(),
                content_type: Some("text/html; charset=utf-8".to_string()),
            }),
            None => Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "not found".to_string(),
            }),
        }
    }
}

/// Listing keyed by fakeid; pages are sliced out of one newest-first list.
#[derive(Default)]
pub struct FakeListing {
    listings: Mutex<HashMap<String, Vec<Article>>>,
    requests: Mutex<Vec<(String, u32, u32)>>,
}

impl FakeListing {
    pub fn set(&self, fakeid: &str, articles: Vec<Article>) {
        self.listings.lock().unwrap().insert(fakeid.to_string(), articles);
    }

    /// Publish new articles on top of the account's listing.
    pub fn publish(&self, fakeid: &str, mut newest_first: Vec<Article>) {
        let mut listings = self.listings.lock().unwrap();
        let existing = listings.remove(fakeid).unwrap_or_default();
        newest_first.extend(existing);
        listings.insert(fakeid.to_string(), newest_first);
    }

    pub fn requests(&self) -> Vec<(String, u32, u32)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl ListingSource for FakeListing {
    async fn list_page(&self, fakeid: &str, begin: u32, count: u32) -> ListingPage {
        self.requests
            .lock()
            .unwrap()
            .push((fakeid.to_string(), begin, count));
        let listings = self.listings.lock().unwrap();
        let all = listings.get(fakeid).cloned().unwrap_or_default();
        let articles: Vec<Article> = all
            .iter()
            .skip(begin as usize)
            .take(count as usize)
            .cloned()
            .collect();
        ListingPage {
            articles,
            total_count: all.len() as u64,
        }
    }
}

pub fn article(title: &str, link: &str) -> Article {
    Article {
        title: title.to_string(),
        link: Some(link.to_string()),
        publish_time: 1_700_000_000,
        digest: String::new(),
        author: String::new(),
    }
}

/// `count` articles `<prefix>N` with links `https://mp/s/<prefix>N`, newest first.
pub fn articles(prefix: &str, count: usize) -> Vec<Article> {
    (0..count)
        .map(|n| article(&format!("{prefix}{n}"), &format!("https://mp/s/{prefix}{n}")))
        .collect()
}

pub fn accounts(pairs: &[(&str, &str)]) -> Vec<Account> {
    Account::from_pairs(pairs.iter().copied()).unwrap()
}

pub const ARTICLE_PAGE: &str =
    r#"<html><body><div id="js_content"><p>Archived body text</p></div></body></html>"#;

/// Everything one sync test needs, rooted in a temp dir.
pub struct Harness {
    pub temp: TempDir,
    pub listing: Arc<FakeListing>,
    pub fetcher: Arc<FakeFetcher>,
}

impl Harness {
    pub fn new() -> Self {
        archiver_logging::initialize_for_tests();
        Self {
            temp: TempDir::new().unwrap(),
            listing: Arc::new(FakeListing::default()),
            fetcher: Arc::new(FakeFetcher::serving_all(ARTICLE_PAGE)),
        }
    }

    pub fn log_path(&self) -> std::path::PathBuf {
        self.temp.path().join("archive_log.txt")
    }

    pub fn history_path(&self) -> std::path::PathBuf {
        self.temp.path().join("history.json")
    }

    pub fn articles_dir(&self) -> std::path::PathBuf {
        self.temp.path().join("articles")
    }

    /// A fresh controller over the same files, as a new run would build it.
    pub fn controller(&self, mode: SyncMode) -> SyncController {
        let writer = DocumentWriter::new(
            self.fetcher.clone(),
            WriterSettings {
                base_dir: self.articles_dir(),
                min_bytes: 0,
                fetch_pause: Duration::ZERO,
            },
        );
        SyncController::new(
            self.listing.clone(),
            Arc::new(TextArchiveLog::new(self.log_path())),
            Arc::new(JsonHistoryStore::open(self.history_path()).unwrap()),
            writer,
            SyncSettings {
                mode,
                page_pause: Duration::ZERO,
                ..SyncSettings::default()
            },
        )
    }
}
