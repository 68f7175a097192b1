//! The individual rewrite stages, in pipeline order.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::MarkupBuffer;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("stage regex")
}

static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| re(r"(?is)<style\b[^>]*>.*?</style\s*>"));
static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| re(r"(?is)<script\b[^>]*>.*?</script\s*>"));
static COMMENT: Lazy<Regex> = Lazy::new(|| re(r"(?s)<!--.*?-->"));

/// 1. Remove style, script and comment regions with their content.
pub fn strip_non_content(buf: &mut MarkupBuffer) {
    buf.rewrite(&STYLE_BLOCK, "");
    buf.rewrite(&SCRIPT_BLOCK, "");
    buf.rewrite(&COMMENT, "");
}

static IMG_TAG: Lazy<Regex> = Lazy::new(|| re(r"(?i)<img\b[^>]*>"));
static DATA_SRC_ATTR: Lazy<Regex> =
    Lazy::new(|| re(r#"(?i)\sdata-src\s*=\s*(?:"([^"]*)"|'([^']*)')"#));
static SRC_ATTR: Lazy<Regex> = Lazy::new(|| re(r#"(?i)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#));

fn attr_value(tag: &str, attr: &Regex) -> Option<String> {
    attr.captures(tag)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 2. Lift images out as `![](src)` lines. The lazy-loading `data-src` wins
/// over `src`; an image with neither is dropped.
pub fn extract_images(buf: &mut MarkupBuffer) {
    buf.rewrite(&IMG_TAG, |caps: &Captures| {
        let tag = &caps[0];
        attr_value(tag, &DATA_SRC_ATTR)
            .or_else(|| attr_value(tag, &SRC_ATTR))
            .map(|src| format!("\n![]({src})\n"))
            .unwrap_or_default()
    });
}

static PRE_BLOCK: Lazy<Regex> = Lazy::new(|| re(r"(?is)<pre\b[^>]*>(.*?)</pre\s*>"));
static CODE_TAG: Lazy<Regex> = Lazy::new(|| re(r"(?i)</?code\b[^>]*>"));
static BREAK_TAG: Lazy<Regex> = Lazy::new(|| re(r"(?i)<br\b[^>]*>"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| re(r"<[^>]+>"));

/// 3. Turn `<pre>` regions into fenced code. Inner `<code>` wrappers are
/// unwrapped, line breaks kept, other markup dropped, and entities decoded.
/// The result is held aside so later stages cannot rewrite it.
pub fn extract_code_blocks(buf: &mut MarkupBuffer) {
    if !PRE_BLOCK.is_match(buf.text()) {
        return;
    }
    let source = buf.text().to_string();
    let text = PRE_BLOCK
        .replace_all(&source, |caps: &Captures| {
            let inner = CODE_TAG.replace_all(&caps[1], "");
            let inner = BREAK_TAG.replace_all(&inner, "\n");
            let inner = ANY_TAG.replace_all(&inner, "");
            let code = decode_entity_set(&inner).trim_matches('\n').to_string();
            format!("\n{}\n", buf.stash_code(code))
        })
        .into_owned();
    buf.replace_text(text);
}

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<code\b[^>]*>(.*?)</code\s*>"));

/// 4. Inline `<code>` spans become backtick spans.
pub fn inline_code(buf: &mut MarkupBuffer) {
    buf.rewrite(&INLINE_CODE, "`$1`");
}

static ATTRIBUTE_LINE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?im)^[ \t]*(?:class|style|width|height|type|from|wx_fmt|data-[\w-]*)=[^>\n]*>[ \t]*$")
});

/// 5. Drop lines that are nothing but a leftover attribute tail such as
/// `data-ratio="0.5" data-w="1080">`.
pub fn drop_attribute_lines(buf: &mut MarkupBuffer) {
    buf.rewrite(&ATTRIBUTE_LINE, "");
}

static HEADINGS: Lazy<Vec<(usize, Regex)>> = Lazy::new(|| {
    (1..=6)
        .rev()
        .map(|level| (level, re(&format!(r"(?is)<h{level}\b[^>]*>(.*?)</h{level}\s*>"))))
        .collect()
});

/// 6. Headings, from level 6 down to level 1.
pub fn headings(buf: &mut MarkupBuffer) {
    for (level, pattern) in HEADINGS.iter() {
        let marker = "#".repeat(*level);
        buf.rewrite(pattern, |caps: &Captures| {
            format!("\n{marker} {}\n", caps[1].trim())
        });
    }
}

static PARAGRAPH_OPEN: Lazy<Regex> = Lazy::new(|| re(r"(?i)<p\b[^>]*>"));
static PARAGRAPH_CLOSE: Lazy<Regex> = Lazy::new(|| re(r"(?i)</p\s*>"));

/// 7. Paragraph boundaries and line breaks become newlines.
pub fn paragraphs(buf: &mut MarkupBuffer) {
    buf.rewrite(&PARAGRAPH_OPEN, "\n");
    buf.rewrite(&PARAGRAPH_CLOSE, "\n");
    buf.rewrite(&BREAK_TAG, "\n");
}

static BOLD: Lazy<Regex> = Lazy::new(|| re(r"(?is)<b\b[^>]*>(.*?)</b\s*>"));
static STRONG: Lazy<Regex> = Lazy::new(|| re(r"(?is)<strong\b[^>]*>(.*?)</strong\s*>"));

fn emphasize(caps: &Captures) -> String {
    let inner = &caps[1];
    // Empty or whitespace-only emphasis is layout filler, not text.
    if inner.trim().is_empty() {
        inner.to_string()
    } else {
        format!("**{inner}**")
    }
}

/// 8. `<b>` and `<strong>` spans become `**text**`.
pub fn bold(buf: &mut MarkupBuffer) {
    buf.rewrite(&STRONG, emphasize);
    buf.rewrite(&BOLD, emphasize);
}

static LIST_OPEN: Lazy<Regex> = Lazy::new(|| re(r"(?i)<(?:ul|ol)\b[^>]*>"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| re(r"(?is)[ \t]*<li\b[^>]*>(.*?)</li\s*>"));

/// 9. List items become `- text` lines.
pub fn list_items(buf: &mut MarkupBuffer) {
    buf.rewrite(&LIST_OPEN, "\n");
    buf.rewrite(&LIST_ITEM, |caps: &Captures| format!("- {}\n", caps[1].trim()));
}

/// 10. Remove every remaining tag.
pub fn strip_tags(buf: &mut MarkupBuffer) {
    buf.rewrite(&ANY_TAG, "");
}

/// 11. Decode the entity set again; stripping tags can expose new entities.
pub fn decode_entities(buf: &mut MarkupBuffer) {
    let decoded = decode_entity_set(buf.text());
    buf.replace_text(decoded);
}

static LINE_EDGE: Lazy<Regex> = Lazy::new(|| re(r"[ \t]*\n[ \t]*"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| re(r"\n{3,}"));
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| re(r" {2,}"));

/// 12. Collapse 3+ newlines to 2 and space runs to one, then trim.
///
/// Indentation left behind by the source markup is dropped first, otherwise
/// whitespace-only lines would keep blank runs from collapsing.
pub fn normalize_whitespace(buf: &mut MarkupBuffer) {
    buf.rewrite(&LINE_EDGE, "\n");
    buf.rewrite(&BLANK_RUN, "\n\n");
    buf.rewrite(&SPACE_RUN, " ");
    let trimmed = buf.text().trim().to_string();
    buf.replace_text(trimmed);
}

/// `&lt; &gt; &quot; &nbsp; &amp;`. `&amp;` goes last so `&amp;lt;` decodes
/// to the literal text `&lt;`.
pub fn decode_entity_set(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
