//! Publish-listing client.
//!
//! The listing endpoint answers with JSON whose `publish_page` field is itself a
//! JSON document encoded as a string, and every entry of its `publish_list`
//! carries a `publish_info` string that is encoded a third time. Decoding is a
//! pure function so it can be tested without HTTP.

use archiver_core::Article;
use archiver_logging::{engine_debug, engine_error, engine_warn};
use reqwest::header::{HeaderValue, ACCEPT, REFERER};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::fetch::{build_client, map_reqwest_error};
use crate::{FailureKind, FetchError, FetchSettings, Session};

pub const DEFAULT_LISTING_ENDPOINT: &str = "https://mp.weixin.qq.com/cgi-bin/appmsgpublish";

/// One page of an account's listing, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    pub articles: Vec<Article>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("transport: {0}")]
    Transport(#[from] FetchError),
    /// Non-zero status in the payload; expired sessions and throttling land here.
    #[error("api returned ret={ret}: {message}")]
    Api { ret: i64, message: String },
    #[error("unexpected payload: {0}")]
    Protocol(String),
}

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Soft-failing page fetch: errors are logged and reported as an empty page.
    async fn list_page(&self, fakeid: &str, begin: u32, count: u32) -> ListingPage;
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    base_resp: Option<BaseResp>,
    publish_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    #[serde(default)]
    ret: i64,
    #[serde(default)]
    err_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishPage {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    publish_list: Vec<PublishEntry>,
}

#[derive(Debug, Deserialize)]
struct PublishEntry {
    #[serde(default)]
    publish_info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PublishInfo {
    #[serde(default)]
    sent_info: SentInfo,
    #[serde(default)]
    appmsg_info: Vec<AppMsg>,
}

#[derive(Debug, Default, Deserialize)]
struct SentInfo {
    #[serde(default)]
    time: i64,
}

#[derive(Debug, Deserialize)]
struct AppMsg {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content_url: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

/// Decode a listing response body into a flat page of articles.
pub fn decode_listing(body: &str) -> Result<ListingPage, ListingError> {
    let response: PublishResponse = serde_json::from_str(body)
        .map_err(|err| ListingError::Protocol(format!("outer response: {err}")))?;

    if let Some(base) = response.base_resp.as_ref().filter(|base| base.ret != 0) {
        return Err(ListingError::Api {
            ret: base.ret,
            message: base.err_msg.clone().unwrap_or_default(),
        });
    }

    let encoded_page = response
        .publish_page
        .ok_or_else(|| ListingError::Protocol("missing publish_page".to_string()))?;
    let page: PublishPage = serde_json::from_str(&encoded_page)
        .map_err(|err| ListingError::Protocol(format!("publish_page: {err}")))?;

    let mut articles = Vec::new();
    for (position, entry) in page.publish_list.into_iter().enumerate() {
        let info = match entry.publish_info.as_deref().map(str::trim) {
            None | Some("") => PublishInfo::default(),
            // A partial page would end paging early and record a wrong first marker.
            Some(encoded) => serde_json::from_str::<PublishInfo>(encoded).map_err(|err| {
                ListingError::Protocol(format!("publish block {position}: {err}"))
            })?,
        };
        let sent_time = info.sent_info.time;
        articles.extend(info.appmsg_info.into_iter().map(|msg| Article {
            title: msg.title.unwrap_or_default(),
            link: msg.content_url.filter(|url| !url.trim().is_empty()),
            publish_time: sent_time,
            digest: msg.digest.unwrap_or_default(),
            author: msg.author.unwrap_or_default(),
        }));
    }

    Ok(ListingPage {
        articles,
        total_count: page.total_count,
    })
}

/// Listing client for the publisher backend.
#[derive(Debug, Clone)]
pub struct MpListingClient {
    client: reqwest::Client,
    endpoint: Url,
    session: Session,
}

impl MpListingClient {
    pub fn new(
        endpoint: &str,
        session: Session,
        settings: &FetchSettings,
    ) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = build_client(settings, &session)?;
        Ok(Self {
            client,
            endpoint,
            session,
        })
    }

    fn page_url(&self, fakeid: &str, begin: u32, count: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("sub", "list")
            .append_pair("begin", &begin.to_string())
            .append_pair("count", &count.to_string())
            .append_pair("fakeid", fakeid)
            .append_pair("token", &self.session.token)
            .append_pair("lang", "zh_CN")
            .append_pair("f", "json")
            .append_pair("ajax", "1");
        url
    }

    fn referer(&self) -> Option<HeaderValue> {
        let mut referer = self.endpoint.join("/cgi-bin/appmsg").ok()?;
        referer
            .query_pairs_mut()
            .append_pair("t", "media/appmsg_edit_v2")
            .append_pair("action", "edit")
            .append_pair("isNew", "1")
            .append_pair("type", "10")
            .append_pair("token", &self.session.token)
            .append_pair("lang", "zh_CN");
        HeaderValue::from_str(referer.as_str()).ok()
    }

    /// Fetch and decode one page, reporting why it failed.
    pub async fn fetch_page(
        &self,
        fakeid: &str,
        begin: u32,
        count: u32,
    ) -> Result<ListingPage, ListingError> {
        let mut request = self
            .client
            .get(self.page_url(fakeid, begin, count))
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest");
        if let Some(referer) = self.referer() {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16(), status.to_string()).into());
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        decode_listing(&body)
    }
}

#[async_trait::async_trait]
impl ListingSource for MpListingClient {
    async fn list_page(&self, fakeid: &str, begin: u32, count: u32) -> ListingPage {
        match self.fetch_page(fakeid, begin, count).await {
            Ok(page) => {
                engine_debug!(
                    "Listing fakeid={} begin={} count={} -> {} articles (total {})",
                    fakeid,
                    begin,
                    count,
                    page.articles.len(),
                    page.total_count
                );
                page
            }
            Err(err @ ListingError::Api { .. }) => {
                // Not retried here: an expired token needs new credentials.
                engine_error!("Listing rejected for fakeid={} begin={}: {}", fakeid, begin, err);
                ListingPage::default()
            }
            Err(err) => {
                engine_warn!("Listing failed for fakeid={} begin={}: {}", fakeid, begin, err);
                ListingPage::default()
            }
        }
    }
}
