/// One entry of an account's publish listing, newest first in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Article {
    pub title: String,
    /// Natural identity key. `None` when the listing carried no URL.
    pub link: Option<String>,
    /// Publish time in epoch seconds; `0` when the listing omitted it.
    pub publish_time: i64,
    pub digest: String,
    pub author: String,
}

impl Article {
    /// The link, if present and non-blank.
    pub fn link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}
