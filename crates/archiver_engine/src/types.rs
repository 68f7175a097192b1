//! Values shared by the article fetcher and the listing client.

use crate::decode::decode_page;

/// Raw article page as served, before charset decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub bytes: Vec<u8>,
    /// URL after redirects; article links often bounce through `mp.weixin.qq.com/s?__biz=`.
    pub final_url: String,
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Page markup as text, using the header charset when one was sent.
    pub fn text(&self) -> String {
        decode_page(&self.bytes, self.content_type.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn status(code: u16, reason: impl Into<String>) -> Self {
        Self::new(FailureKind::HttpStatus(code), reason)
    }

    pub(crate) fn too_large(max_bytes: u64, actual: u64) -> Self {
        Self::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(actual),
            },
            "body exceeds the configured cap",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimitExceeded,
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("unsupported content type {content_type}")]
    UnsupportedContentType { content_type: String },
    #[error("network error")]
    Network,
}
