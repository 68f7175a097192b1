use std::path::{Path, PathBuf};

use chrono::TimeZone;
use sha2::{Digest, Sha256};

/// Date token used when the publish time is missing or out of range.
pub const UNKNOWN_DATE: &str = "Unknown";
pub const DOCUMENT_EXTENSION: &str = "md";

const MAX_COMPONENT_CHARS: usize = 120;

/// `<base>/<account>/<date>_<title>.md`, deterministic for a given article.
pub fn document_path<Tz: TimeZone>(
    base: &Path,
    account_name: &str,
    publish_time: i64,
    title: &str,
    link: &str,
    tz: &Tz,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let date = publish_date(publish_time, tz);
    let title = match sanitize_component(title) {
        Some(clean) => clean,
        // Untitled articles would all collide on one name per day.
        None => format!("untitled-{}", short_hash(link)),
    };
    base.join(account_dir_name(account_name))
        .join(format!("{date}_{title}.{DOCUMENT_EXTENSION}"))
}

pub fn account_dir_name(account_name: &str) -> String {
    sanitize_component(account_name).unwrap_or_else(|| "Unknown_Account".to_string())
}

/// `YYYY-MM-DD` of `publish_time` in `tz`, or [`UNKNOWN_DATE`].
pub fn publish_date<Tz: TimeZone>(publish_time: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if publish_time <= 0 {
        return UNKNOWN_DATE.to_string();
    }
    match tz.timestamp_opt(publish_time, 0).single() {
        Some(moment) => moment.format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Strip path-hostile characters; `None` when nothing usable is left.
pub fn sanitize_component(input: &str) -> Option<String> {
    let cleaned: String = input
        .chars()
        .filter(|c| !is_forbidden(*c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        return None;
    }

    // Truncate on a char boundary; titles are frequently CJK.
    let mut bounded: String = cleaned.chars().take(MAX_COMPONENT_CHARS).collect();
    let trimmed_len = bounded.trim_end().len();
    bounded.truncate(trimmed_len);
    if is_reserved_windows_name(&bounded) {
        bounded.push('_');
    }
    Some(bounded)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
