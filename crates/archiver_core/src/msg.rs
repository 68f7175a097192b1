use crate::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Start the pass for the account.
    Begin,
    /// Result of the archive-mode probe request (page size 1 at offset 0).
    ProbeLoaded(Vec<Article>),
    /// One listing page, in listing order. An empty page is a soft failure.
    PageLoaded(Vec<Article>),
}
