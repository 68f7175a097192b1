/// Metadata rendered above the converted article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHeader<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub link: &'a str,
    pub account: &'a str,
    pub digest: &'a str,
}

pub fn build_markdown_document(header: &DocumentHeader<'_>, body_markdown: &str) -> String {
    let mut doc = format!(
        "# {title}\n\n**Date:** {date}\n**Link:** {link}\n**Account:** {account}\n",
        title = header.title,
        date = header.date,
        link = header.link,
        account = header.account,
    );
    let digest = header.digest.trim();
    if !digest.is_empty() {
        doc.push_str(&format!("**Summary:** {digest}\n"));
    }
    doc.push('\n');
    doc.push_str(body_markdown);
    doc
}
