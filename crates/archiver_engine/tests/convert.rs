use archiver_engine::convert::STAGES;
use archiver_engine::{Converter, MarkdownConverter};
use pretty_assertions::assert_eq;

fn md(html: &str) -> String {
    MarkdownConverter.to_markdown(html)
}

#[test]
fn heading_and_paragraph() {
    assert_eq!(md("<h1>Title</h1><p>Body</p>"), "# Title\n\nBody");
}

#[test]
fn escaped_code_survives_as_fenced_block() {
    assert_eq!(md("<pre><code>&lt;x&gt;</code></pre>"), "```\n<x>\n```");
}

#[test]
fn text_only_fragment_is_trimmed_and_space_runs_collapse() {
    assert_eq!(md("   hello    world  \t "), "hello world");
    assert_eq!(md("  a   b  c  "), "a b c");
}

#[test]
fn code_indentation_is_not_collapsed() {
    let html = "<p>Example:</p><pre><code>fn main() {\n    let   x = 1;\n}</code></pre><p>Done</p>";
    assert_eq!(
        md(html),
        "Example:\n\n```\nfn main() {\n    let   x = 1;\n}\n```\n\nDone"
    );
}

#[test]
fn typical_article_body() {
    let html = r#"
<section style="margin:0">
  <h2 style="font-size:18px">Intro</h2>
  <p>First <strong>bold</strong> and <code>inline</code>.</p>
  <p><img data-src="https://img.example/1.png" src="data:image/gif;base64,AA"></p>
  <ul><li> one </li><li>two</li></ul>
  <p>a &amp;&nbsp;b</p>
</section>
<script>var x = "<p>not text</p>";</script>
"#;
    let out = md(html);
    assert_eq!(
        out,
        "## Intro\n\nFirst **bold** and `inline`.\n\n![](https://img.example/1.png)\n\n- one\n- two\n\na & b"
    );
}

#[test]
fn headings_of_every_level() {
    for level in 1..=6 {
        let html = format!("<h{level} class=\"x\">T</h{level}>");
        assert_eq!(md(&html), format!("{} T", "#".repeat(level)));
    }
}

#[test]
fn pipeline_order_is_fixed() {
    let names: Vec<&str> = STAGES.iter().map(|(name, _)| *name).collect();
    assert_eq!(names.first(), Some(&"strip_non_content"));
    assert_eq!(names.last(), Some(&"normalize_whitespace"));
    let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
    assert!(pos("extract_images") < pos("strip_tags"));
    assert!(pos("extract_code_blocks") < pos("inline_code"));
    assert!(pos("strip_tags") < pos("decode_entities"));
}

#[test]
fn malformed_markup_never_panics() {
    for html in [
        "<p",
        "</b></b><b>",
        "<pre>unterminated",
        "<<>>",
        "",
        "&",
        "\u{E000}CODE0\u{E001}",
    ] {
        let _ = md(html);
    }
    assert_eq!(md("\u{E000}CODE0\u{E001}"), "CODE0");
}
