use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};

use crate::{FailureKind, FetchError, FetchedPage};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36 Edg/143.0.0.0";

/// Credentials of the logged-in publisher session shared by every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub cookie: String,
    pub user_agent: String,
}

impl Session {
    pub fn new(token: impl Into<String>, cookie: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            cookie: cookie.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// Credentials must never reach the log.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("cookie", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
                "text/plain".to_string(),
            ],
        }
    }
}

/// Plain GET of an article page.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings, session: &Session) -> Result<Self, FetchError> {
        let client = build_client(&settings, session)?;
        Ok(Self { client, settings })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

/// HTTP client carrying the session's user agent and cookie on every request.
pub(crate) fn build_client(
    settings: &FetchSettings,
    session: &Session,
) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    let user_agent = if session.user_agent.is_empty() {
        DEFAULT_USER_AGENT
    } else {
        session.user_agent.as_str()
    };
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|err| FetchError::new(FailureKind::Network, format!("user agent: {err}")))?,
    );
    if !session.cookie.is_empty() {
        let mut cookie = HeaderValue::from_str(session.cookie.trim())
            .map_err(|err| FetchError::new(FailureKind::Network, format!("cookie: {err}")))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self.client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16(), status.to_string()));
        }

        let cap = self.settings.max_bytes;
        match response.content_length() {
            Some(declared) if declared > cap => return Err(FetchError::too_large(cap, declared)),
            _ => {}
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let received = (bytes.len() + chunk.len()) as u64;
            if received > cap {
                return Err(FetchError::too_large(cap, received));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            bytes,
            final_url,
            content_type,
        })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
