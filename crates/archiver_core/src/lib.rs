//! Archiver core: domain records and the pure per-account paging state machine.
mod account;
mod article;
mod effect;
mod marker;
mod msg;
mod state;
mod update;
mod validity;

pub use account::{Account, AccountListError};
pub use article::Article;
pub use effect::Effect;
pub use marker::{FirstMarkers, HistoryMarker};
pub use msg::Msg;
pub use state::{PassState, PassStats, Phase, StopBoundary, SyncMode, DEFAULT_PAGE_SIZE, PROBE_SIZE};
pub use update::update;
pub use validity::{is_valid, TEMP_KEY_MARKER};
