//! Lenient scanner for the `{"status": .., "result": ..}` envelope.
//!
//! The site and the codec service both wrap their payloads in this envelope,
//! but the nested content is not guaranteed to be strict JSON. Only the
//! `result` field is ever needed, so it is located by its key marker and
//! copied out character by character.

const RESULT_KEY: &str = "\"result\":";
const URL_KEY: &str = "\"url\":\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    Escaped,
}

/// Extracts the string value of the `result` field, resolving escapes.
///
/// Returns `None` when the key marker or the opening quote of the value is
/// missing. An unterminated string yields whatever was scanned so far.
pub fn extract_result_field(raw: &str) -> Option<String> {
    let key = raw.find(RESULT_KEY)?;
    let after_key = key + RESULT_KEY.len();
    let open = after_key + raw[after_key..].find('"')?;

    Some(unescape_until_quote(&raw[open + 1..]))
}

/// Extracts the `result` field when its value is a nested object.
///
/// The returned text spans from the opening `{` to its matching `}`.
/// Truncated input returns the accumulated prefix.
pub fn extract_balanced_object_result(raw: &str) -> Option<String> {
    scan_object_result(raw).map(|(object, _)| object)
}

/// Like [`extract_balanced_object_result`], but only when every opened brace
/// was closed again.
pub fn extract_closed_object_result(raw: &str) -> Option<String> {
    scan_object_result(raw).and_then(|(object, closed)| closed.then_some(object))
}

fn scan_object_result(raw: &str) -> Option<(String, bool)> {
    let key = raw.find(RESULT_KEY)?;
    let rest = raw[key + RESULT_KEY.len()..].trim_start();
    if !rest.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut out = String::new();
    for c in rest.chars() {
        out.push(c);
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((out, true));
                }
            }
            _ => {}
        }
    }

    Some((out, false))
}

/// Extracts a `"url":"..."` value, un-escaping `\/`.
pub fn extract_url_field(raw: &str) -> Option<String> {
    let start = raw.find(URL_KEY)? + URL_KEY.len();
    let end = start + raw[start..].find('"')?;

    Some(raw[start..end].replace("\\/", "/"))
}

fn unescape_until_quote(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut state = ScanState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            ScanState::Escaped => {
                match c {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'u' => match decode_unicode(&chars[i + 1..]) {
                        Some((decoded, consumed)) => {
                            out.push(decoded);
                            i += consumed;
                        }
                        None => out.push('u'),
                    },
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
                state = ScanState::Normal;
            }
            ScanState::Normal => match c {
                '\\' => state = ScanState::Escaped,
                '"' => break,
                other => out.push(other),
            },
        }
        i += 1;
    }

    out
}

fn hex4(hex: &[char]) -> Option<u32> {
    let digits = hex.get(..4)?;
    if !digits.iter().all(char::is_ascii_hexdigit) {
        return None;
    }
    u32::from_str_radix(&digits.iter().collect::<String>(), 16).ok()
}

/// Decodes the hex after a `\u`, joining a UTF-16 surrogate pair when the
/// low half follows as a second escape. Returns the char and the number of
/// input chars it consumed.
fn decode_unicode(rest: &[char]) -> Option<(char, usize)> {
    let code = hex4(rest)?;
    if !(0xD800..=0xDBFF).contains(&code) {
        return char::from_u32(code).map(|c| (c, 4));
    }

    if rest.get(4..6) != Some(&['\\', 'u'][..]) {
        return None;
    }
    let low = rest.get(6..).and_then(hex4)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return None;
    }
    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(combined).map(|c| (c, 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_result() {
        let raw = r#"{"status":true,"result":"abc123"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("abc123"));
    }

    #[test]
    fn resolves_escapes() {
        let raw = r#"{"status":true,"result":"a\nb \"q\" café \/x\\y\tz"}"#;
        assert_eq!(
            extract_result_field(raw).as_deref(),
            Some("a\nb \"q\" café /x\\y\tz")
        );
        let raw = r#"{"status":true,"result":"line\nquote\"caf\u00e9"}"#;
        assert_eq!(
            extract_result_field(raw).as_deref(),
            Some("line\nquote\"café")
        );
    }

    #[test]
    fn html_result_with_escaped_markup() {
        let raw = r#"{"status":true,"result":"<div class=\"eplist\"><a token=\"t1\">1<\/a><\/div>"}"#;
        assert_eq!(
            extract_result_field(raw).as_deref(),
            Some(r#"<div class="eplist"><a token="t1">1</a></div>"#)
        );
    }

    #[test]
    fn missing_key_is_none() {
        assert_eq!(extract_result_field(r#"{"status":false}"#), None);
        assert_eq!(extract_result_field(""), None);
    }

    #[test]
    fn missing_opening_quote_is_none() {
        assert_eq!(extract_result_field(r#"{"result": 12}"#), None);
    }

    #[test]
    fn truncated_unicode_degrades() {
        let raw = r#"{"result":"ab\u00"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("abu00"));
    }

    #[test]
    fn malformed_unicode_degrades() {
        let raw = r#"{"result":"x\uzzzzy"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("xuzzzzy"));
    }

    #[test]
    fn unknown_escape_kept_literal() {
        let raw = r#"{"result":"a\qb"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("a\\qb"));
    }

    #[test]
    fn unterminated_string_returns_prefix() {
        assert_eq!(
            extract_result_field(r#"{"result":"partial"#).as_deref(),
            Some("partial")
        );
    }

    #[test]
    fn idempotent() {
        let raw = r#"{"status":true,"result":"same"}"#;
        assert_eq!(extract_result_field(raw), extract_result_field(raw));
    }

    #[test]
    fn balanced_object() {
        let raw = r#"{"status":true,"result": {"sources":[{"file":"a"}],"tracks":{}} ,"x":1}"#;
        assert_eq!(
            extract_balanced_object_result(raw).as_deref(),
            Some(r#"{"sources":[{"file":"a"}],"tracks":{}}"#)
        );
    }

    #[test]
    fn balanced_object_requires_brace() {
        assert_eq!(extract_balanced_object_result(r#"{"result":"str"}"#), None);
        assert_eq!(extract_balanced_object_result(r#"{"status":1}"#), None);
    }

    #[test]
    fn balanced_object_truncated_is_lenient() {
        let raw = r#"{"result":{"sources":[{"file":"a"#;
        assert_eq!(
            extract_balanced_object_result(raw).as_deref(),
            Some(r#"{"sources":[{"file":"a"#)
        );
    }

    #[test]
    fn truncated_object_is_not_closed() {
        let raw = r#"{"status":200,"result":{"sources":{"file":"https://a.test/x.m3u8"}"#;
        assert_eq!(
            extract_balanced_object_result(raw).as_deref(),
            Some(r#"{"sources":{"file":"https://a.test/x.m3u8"}"#)
        );
        assert_eq!(extract_closed_object_result(raw), None);

        let closed = r#"{"result":{"sources":{"file":"x"}},"status":200}"#;
        assert_eq!(
            extract_closed_object_result(closed).as_deref(),
            Some(r#"{"sources":{"file":"x"}}"#)
        );
    }

    #[test]
    fn surrogate_pair_becomes_one_char() {
        let raw = r#"{"status":true,"result":"Frieren \ud83d\ude00!"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("Frieren \u{1F600}!"));
    }

    #[test]
    fn lone_surrogate_degrades() {
        let raw = r#"{"result":"a\ud83db"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("aud83db"));
        let raw = r#"{"result":"a\ud83d\u0041"}"#;
        assert_eq!(extract_result_field(raw).as_deref(), Some("aud83dA"));
    }

    #[test]
    fn url_field() {
        let raw = r#"{"status":true,"result":{"url":"https:\/\/mega.test\/e\/abc","skip":{}}}"#;
        assert_eq!(
            extract_url_field(raw).as_deref(),
            Some("https://mega.test/e/abc")
        );
        assert_eq!(extract_url_field(r#"{"result":{}}"#), None);
    }
}
