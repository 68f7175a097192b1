use crate::Article;

/// Query marker the listing API puts on links to revoked or expired content.
pub const TEMP_KEY_MARKER: &str = "tempkey=";

/// An article is usable iff it has a non-empty link without the temp-key marker.
pub fn is_valid(article: &Article) -> bool {
    match article.link() {
        Some(link) => !link.contains(TEMP_KEY_MARKER),
        None => false,
    }
}
