//! Markup → Markdown conversion as an ordered pipeline of rewrite stages.
//!
//! Each stage rewrites a [`MarkupBuffer`] in place. Order matters: images are
//! lifted out before any tag stripping, code blocks are set aside before inline
//! rewrites can touch them, headings run from level 6 down to 1, and the
//! strip-all pass runs last. Unmatched markup simply falls through to the
//! strip-all pass; conversion never fails.
pub mod stages;

use once_cell::sync::Lazy;
use regex::{Captures, Regex, Replacer};

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// A named stage of the pipeline.
pub type Stage = fn(&mut MarkupBuffer);

/// The pipeline, in execution order.
pub const STAGES: [(&str, Stage); 12] = [
    ("strip_non_content", stages::strip_non_content),
    ("extract_images", stages::extract_images),
    ("extract_code_blocks", stages::extract_code_blocks),
    ("inline_code", stages::inline_code),
    ("drop_attribute_lines", stages::drop_attribute_lines),
    ("headings", stages::headings),
    ("paragraphs", stages::paragraphs),
    ("bold", stages::bold),
    ("list_items", stages::list_items),
    ("strip_tags", stages::strip_tags),
    ("decode_entities", stages::decode_entities),
    ("normalize_whitespace", stages::normalize_whitespace),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str) -> String {
        let mut buffer = MarkupBuffer::new(html);
        for (_, stage) in STAGES {
            stage(&mut buffer);
        }
        buffer.finish()
    }
}

const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

static SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}CODE(\\d+)\u{E001}").expect("slot regex"));

/// Intermediate text plus the fenced code bodies held out of later stages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupBuffer {
    text: String,
    code_blocks: Vec<String>,
}

impl MarkupBuffer {
    pub fn new(html: &str) -> Self {
        // Slot delimiters are reserved for code placeholders.
        let text = html.replace([SLOT_OPEN, SLOT_CLOSE], "");
        Self {
            text,
            code_blocks: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn code_blocks(&self) -> &[String] {
        &self.code_blocks
    }

    /// Replace every match of `re` in the working text.
    pub(crate) fn rewrite<R: Replacer>(&mut self, re: &Regex, rep: R) {
        if re.is_match(&self.text) {
            self.text = re.replace_all(&self.text, rep).into_owned();
        }
    }

    pub(crate) fn replace_text(&mut self, text: String) {
        self.text = text;
    }

    /// Set `code` aside and return the placeholder that stands in for it.
    pub(crate) fn stash_code(&mut self, code: String) -> String {
        let slot = format!("{SLOT_OPEN}CODE{}{SLOT_CLOSE}", self.code_blocks.len());
        self.code_blocks.push(code);
        slot
    }

    /// Restore stashed code as fenced blocks and return the document text.
    pub fn finish(self) -> String {
        let code_blocks = self.code_blocks;
        SLOT.replace_all(&self.text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| code_blocks.get(idx))
                .map(|code| format!("```\n{code}\n```"))
                .unwrap_or_default()
        })
        .into_owned()
    }
}
