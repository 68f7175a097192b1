use std::collections::HashSet;

use crate::{Article, HistoryMarker};

/// Listing page size used by both modes.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Page size of the archive-mode probe request.
pub const PROBE_SIZE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Full catch-up, bounded by the link-keyed first-article marker.
    #[default]
    Archive,
    /// Incremental update, bounded by the title-keyed history marker.
    Update,
}

/// Where paging stops for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopBoundary {
    None,
    Link(String),
    Title(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Probing,
    Paging,
    /// Archive probe matched the recorded marker.
    Skipped,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassStats {
    pub pages_fetched: u32,
    pub skipped_invalid: u32,
    pub skipped_known: u32,
    pub candidates: u32,
    pub boundary_reached: bool,
}

/// Paging state for one account in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassState {
    mode: SyncMode,
    boundary: StopBoundary,
    page_size: u32,
    phase: Phase,
    next_begin: u32,
    accepted: Vec<Article>,
    accepted_links: HashSet<String>,
    newest_candidate: Option<HistoryMarker>,
    stats: PassStats,
}

impl PassState {
    /// Archive pass bounded by the account's first-article marker, if any.
    pub fn archive(first_marker: Option<&str>) -> Self {
        let boundary = match first_marker.map(str::trim).filter(|l| !l.is_empty()) {
            Some(link) => StopBoundary::Link(link.to_string()),
            None => StopBoundary::None,
        };
        Self::new(SyncMode::Archive, boundary)
    }

    /// Update pass bounded by the account's history record, if any.
    pub fn update(history: Option<&HistoryMarker>) -> Self {
        let boundary = match history.and_then(|h| h.last_article_title.as_deref()) {
            Some(title) => StopBoundary::Title(title.to_string()),
            None => StopBoundary::None,
        };
        Self::new(SyncMode::Update, boundary)
    }

    fn new(mode: SyncMode, boundary: StopBoundary) -> Self {
        Self {
            mode,
            boundary,
            page_size: DEFAULT_PAGE_SIZE,
            phase: Phase::Idle,
            next_begin: 0,
            accepted: Vec::new(),
            accepted_links: HashSet::new(),
            newest_candidate: None,
            stats: PassStats::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn boundary(&self) -> &StopBoundary {
        &self.boundary
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn stats(&self) -> PassStats {
        self.stats
    }

    /// Articles accepted so far, in listing order.
    pub fn accepted(&self) -> &[Article] {
        &self.accepted
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Skipped | Phase::Finished)
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn next_begin(&self) -> u32 {
        self.next_begin
    }

    pub(crate) fn advance_page(&mut self) -> u32 {
        self.next_begin += self.page_size;
        self.next_begin
    }

    pub(crate) fn stats_mut(&mut self) -> &mut PassStats {
        &mut self.stats
    }

    pub(crate) fn hits_boundary(&self, article: &Article) -> bool {
        match &self.boundary {
            StopBoundary::None => false,
            StopBoundary::Link(link) => article.link() == Some(link.as_str()),
            StopBoundary::Title(title) => article.title == *title,
        }
    }

    pub(crate) fn note_candidate(&mut self, article: &Article) {
        self.stats.candidates += 1;
        if self.newest_candidate.is_none() {
            self.newest_candidate = Some(HistoryMarker {
                last_article_title: Some(article.title.clone()),
                last_article_url: article.link().map(str::to_string),
            });
        }
    }

    /// Returns false when the link was already accepted earlier in this pass.
    pub(crate) fn accept(&mut self, article: Article) -> bool {
        let Some(link) = article.link().map(str::to_string) else {
            return false;
        };
        if !self.accepted_links.insert(link) {
            return false;
        }
        self.accepted.push(article);
        true
    }

    pub(crate) fn take_flush(&mut self) -> (Vec<Article>, Option<HistoryMarker>) {
        let history = match self.mode {
            SyncMode::Update => self.newest_candidate.take(),
            SyncMode::Archive => None,
        };
        (std::mem::take(&mut self.accepted), history)
    }
}
