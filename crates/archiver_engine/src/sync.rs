//! Effect executor for the per-account paging state machine.
//!
//! `archiver_core::update` decides what to fetch next and when to stop; this
//! module performs those effects against the listing source, the two sync
//! stores and the document writer, one account at a time.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use archiver_core::{
    update, Account, Article, Effect, FirstMarkers, HistoryMarker, Msg, PassState, PassStats,
    SyncMode, DEFAULT_PAGE_SIZE,
};
use archiver_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;

use crate::archive_log::ArchiveLog;
use crate::history::HistoryStore;
use crate::listing::ListingSource;
use crate::persist::StoreError;
use crate::writer::{DocumentWriter, WriteOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub mode: SyncMode,
    pub page_size: u32,
    /// Pause between two page requests of the same account.
    pub page_pause: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            mode: SyncMode::Archive,
            page_size: DEFAULT_PAGE_SIZE,
            page_pause: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub title: String,
    pub link: String,
    /// Write errors are kept as text; they never abort the pass.
    pub outcome: Result<WriteOutcome, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub fakeid: String,
    pub display_name: String,
    pub stats: PassStats,
    /// Archive probe found the account unchanged.
    pub skipped: bool,
    /// Articles appended to the archive log.
    pub logged: usize,
    pub history: Option<HistoryMarker>,
    pub documents: Vec<DocumentReport>,
}

impl AccountReport {
    fn new(account: &Account) -> Self {
        Self {
            fakeid: account.fakeid.clone(),
            display_name: account.display_name.clone(),
            stats: PassStats::default(),
            skipped: false,
            logged: 0,
            history: None,
            documents: Vec::new(),
        }
    }

    pub fn saved(&self) -> usize {
        self.documents
            .iter()
            .filter(|doc| matches!(doc.outcome, Ok(WriteOutcome::Saved { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.documents.iter().filter(|doc| doc.outcome.is_err()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub mode: SyncMode,
    pub accounts: Vec<AccountReport>,
}

impl CycleReport {
    pub fn logged(&self) -> usize {
        self.accounts.iter().map(|a| a.logged).sum()
    }

    pub fn saved(&self) -> usize {
        self.accounts.iter().map(AccountReport::saved).sum()
    }

    pub fn failed(&self) -> usize {
        self.accounts.iter().map(AccountReport::failed).sum()
    }
}

pub struct SyncController {
    listing: Arc<dyn ListingSource>,
    archive_log: Arc<dyn ArchiveLog>,
    history: Arc<dyn HistoryStore>,
    writer: DocumentWriter,
    settings: SyncSettings,
}

impl SyncController {
    pub fn new(
        listing: Arc<dyn ListingSource>,
        archive_log: Arc<dyn ArchiveLog>,
        history: Arc<dyn HistoryStore>,
        writer: DocumentWriter,
        settings: SyncSettings,
    ) -> Self {
        Self {
            listing,
            archive_log,
            history,
            writer,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// One pass over every account, in configured order.
    ///
    /// Store failures abort the cycle; listing and document failures are
    /// absorbed into the report.
    pub async fn run_cycle(&self, accounts: &[Account]) -> Result<CycleReport, SyncError> {
        let mut captured = self.archive_log.load_links()?;
        let first_markers = match self.settings.mode {
            SyncMode::Archive => self.archive_log.load_first_markers()?,
            SyncMode::Update => FirstMarkers::new(),
        };
        engine_info!(
            "Starting {:?} cycle: {} accounts, {} captured links, {} first markers",
            self.settings.mode,
            accounts.len(),
            captured.len(),
            first_markers.len()
        );

        let mut report = CycleReport {
            mode: self.settings.mode,
            accounts: Vec::with_capacity(accounts.len()),
        };
        for account in accounts {
            let initial = self.initial_state(account, &first_markers);
            let account_report = self.sync_account(account, initial, &mut captured).await?;
            report.accounts.push(account_report);
        }

        engine_info!(
            "Cycle finished: {} logged, {} saved, {} failed",
            report.logged(),
            report.saved(),
            report.failed()
        );
        Ok(report)
    }

    fn initial_state(&self, account: &Account, first_markers: &FirstMarkers) -> PassState {
        let state = match self.settings.mode {
            // Blocks of unnamed accounts all share the empty key.
            SyncMode::Archive if account.display_name.is_empty() => PassState::archive(None),
            SyncMode::Archive => {
                PassState::archive(first_markers.get(&account.display_name).map(String::as_str))
            }
            SyncMode::Update => PassState::update(self.history.get(&account.fakeid).as_ref()),
        };
        state.with_page_size(self.settings.page_size)
    }

    async fn sync_account(
        &self,
        account: &Account,
        mut state: PassState,
        captured: &mut HashSet<String>,
    ) -> Result<AccountReport, SyncError> {
        engine_info!("Checking account {} ({})", account.display_name, account.fakeid);
        let mut report = AccountReport::new(account);

        let (next, effects) = update(state, Msg::Begin, captured);
        state = next;
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::FetchProbe { count } => {
                    let page = self.listing.list_page(&account.fakeid, 0, count).await;
                    Some(Msg::ProbeLoaded(page.articles))
                }
                Effect::FetchPage { begin, count } => {
                    let page = self.listing.list_page(&account.fakeid, begin, count).await;
                    engine_debug!(
                        "{}: page at {} returned {} articles",
                        account.display_name,
                        begin,
                        page.articles.len()
                    );
                    Some(Msg::PageLoaded(page.articles))
                }
                Effect::Pause => {
                    if !self.settings.page_pause.is_zero() {
                        tokio::time::sleep(self.settings.page_pause).await;
                    }
                    None
                }
                Effect::SkipAccount => {
                    engine_info!(
                        "{}: newest article already archived, skipping",
                        account.display_name
                    );
                    report.skipped = true;
                    None
                }
                Effect::NothingNew => {
                    engine_info!("{}: nothing new", account.display_name);
                    None
                }
                Effect::Flush { articles, history } => {
                    self.flush(account, articles, history, captured, &mut report).await?;
                    None
                }
            };

            if let Some(msg) = msg {
                let (next, effects) = update(state, msg, captured);
                state = next;
                queue.extend(effects);
            }
        }

        report.stats = state.stats();
        Ok(report)
    }

    async fn flush(
        &self,
        account: &Account,
        articles: Vec<Article>,
        history: Option<HistoryMarker>,
        captured: &mut HashSet<String>,
        report: &mut AccountReport,
    ) -> Result<(), SyncError> {
        if !articles.is_empty() {
            self.archive_log.append_block(&account.display_name, &articles)?;
            captured.extend(articles.iter().filter_map(|a| a.link().map(str::to_string)));
            report.logged = articles.len();
            engine_info!("{}: recorded {} new articles", account.display_name, articles.len());
        }

        for article in &articles {
            let outcome = self
                .writer
                .write(article, &account.display_name)
                .await
                .map_err(|err| {
                    engine_warn!(
                        "{}: failed to save '{}': {}",
                        account.display_name,
                        article.title,
                        err
                    );
                    err.to_string()
                });
            report.documents.push(DocumentReport {
                title: article.title.clone(),
                link: article.link().unwrap_or_default().to_string(),
                outcome,
            });
        }

        if let Some(marker) = history {
            self.history.put(&account.fakeid, marker.clone())?;
            engine_debug!(
                "{}: history now at '{}'",
                account.display_name,
                marker.last_article_title.as_deref().unwrap_or_default()
            );
            report.history = Some(marker);
        }
        Ok(())
    }
}
