use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Decode a fetched page to text.
///
/// Order: BOM → `Content-Type` charset → strict UTF-8 → chardetng guess.
/// Malformed sequences are replaced, never rejected: a page with a few bad
/// bytes is still worth archiving.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_lossy(bytes, encoding);
    }

    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_lossy(bytes, encoding);
    }

    // Article pages are served as UTF-8; only sniff when that fails.
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_lossy(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\'']).to_string())
        } else {
            None
        }
    })
}

fn decode_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
