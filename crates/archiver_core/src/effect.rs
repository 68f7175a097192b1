use crate::{Article, HistoryMarker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the newest article only.
    FetchProbe { count: u32 },
    FetchPage { begin: u32, count: u32 },
    /// Rate-control pause between two page fetches of the same account.
    Pause,
    /// The account is unchanged since its last archive block.
    SkipAccount,
    /// Persist a log block and documents for `articles`; in update mode also
    /// overwrite the account's history with `history`.
    Flush {
        articles: Vec<Article>,
        history: Option<HistoryMarker>,
    },
    NothingNew,
}
