use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Where the extracted region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// The article's content container.
    Container,
    /// The page `<body>`.
    Body,
    /// No recognizable structure; the whole fetched text.
    WholePage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub content_html: String,
    pub source: ContentSource,
    /// Account nickname embedded in the page, if any.
    pub nickname: Option<String>,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedContent;
}

pub const DEFAULT_CONTAINER_SELECTOR: &str = "#js_content";

/// Three-tier extractor: content container → `<body>` → whole page.
/// Never fails on missing structure.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    container_selector: String,
}

impl ArticleExtractor {
    pub fn new(container_selector: impl Into<String>) -> Self {
        Self {
            container_selector: container_selector.into(),
        }
    }
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_SELECTOR)
    }
}

impl Extractor for ArticleExtractor {
    fn extract(&self, html: &str) -> ExtractedContent {
        let doc = Html::parse_document(html);
        let nickname = extract_nickname(html, &doc);

        let container = Selector::parse(&self.container_selector)
            .ok()
            .and_then(|sel| doc.select(&sel).next().map(|node| node.inner_html()));
        if let Some(content_html) = container {
            return ExtractedContent {
                content_html,
                source: ContentSource::Container,
                nickname,
            };
        }

        // html5ever always synthesizes a <body>; only trust it when the page had one.
        if has_body_tag(html) {
            let body = Selector::parse("body")
                .ok()
                .and_then(|sel| doc.select(&sel).next().map(|node| node.inner_html()));
            if let Some(content_html) = body {
                return ExtractedContent {
                    content_html,
                    source: ContentSource::Body,
                    nickname,
                };
            }
        }

        ExtractedContent {
            content_html: html.to_string(),
            source: ContentSource::WholePage,
            nickname,
        }
    }
}

static BODY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body[\s>/]").expect("body regex"));
static NICKNAME_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"var\s+nickname\s*=\s*(?:htmlDecode\()?"([^"]+)""#).expect("nickname regex")
});

fn has_body_tag(html: &str) -> bool {
    BODY_TAG.is_match(html)
}

/// Nickname from the inline `var nickname = "…"` script, else the profile meta block.
fn extract_nickname(html: &str, doc: &Html) -> Option<String> {
    if let Some(found) = NICKNAME_VAR
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
    {
        return Some(found);
    }

    Selector::parse(".profile_meta_value")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
}
