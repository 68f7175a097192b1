//! Archiver engine: listing transport, sync stores, document pipeline and the
//! effect executor that drives the core paging state machine.
mod archive_log;
pub mod convert;
mod decode;
mod extract;
mod fetch;
mod filename;
mod frontmatter;
mod history;
mod listing;
mod persist;
mod scheduler;
mod sync;
mod types;
mod writer;

pub use archive_log::{parse_first_markers, parse_links, render_block, ArchiveLog, TextArchiveLog};
pub use convert::{Converter, MarkdownConverter, MarkupBuffer};
pub use decode::decode_page;
pub use extract::{
    ArticleExtractor, ContentSource, ExtractedContent, Extractor, DEFAULT_CONTAINER_SELECTOR,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, Session, DEFAULT_USER_AGENT};
pub use filename::{
    account_dir_name, document_path, publish_date, sanitize_component, DOCUMENT_EXTENSION,
    UNKNOWN_DATE,
};
pub use frontmatter::{build_markdown_document, DocumentHeader};
pub use history::{HistoryStore, JsonHistoryStore};
pub use listing::{
    decode_listing, ListingError, ListingPage, ListingSource, MpListingClient,
    DEFAULT_LISTING_ENDPOINT,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, CreateOutcome, PersistError, StoreError};
pub use scheduler::{Scheduler, SchedulerSummary, DEFAULT_CHECK_INTERVAL, DEFAULT_RETRY_INTERVAL};
pub use sync::{AccountReport, CycleReport, DocumentReport, SyncController, SyncError, SyncSettings};
pub use types::{FailureKind, FetchError, FetchedPage};
pub use writer::{
    DocumentWriter, WriteError, WriteOutcome, WriterSettings, DEFAULT_MIN_FILE_SIZE_KB,
    DEFAULT_OUTPUT_DIR,
};
