//! Query-string parsing: a fast linear-pass decoder with a lenient fallback.
//!
//! Two parsers share one contract: given the raw bytes following `?` (no
//! leading `?`), produce an ordered multimap of `key -> values`, preserving
//! the order keys were first seen while still accepting repeated keys.
//!
//! The fast path never allocates more than the output needs: no `+` and no
//! `%` in a segment means no intermediate buffer is needed for that
//! segment, the slice is used directly. It bails out to
//! [`form_urlencoded`] — the standard lenient parser the `url` crate family
//! already ships — the moment it sees a `;` separator or a `%` escape with
//! invalid hex, rather than trying to special-case those itself.

use std::collections::HashMap;

/// Reject queries longer than this many bytes outright, returning an empty
/// map rather than doing unbounded work on an attacker-controlled string.
pub const MAX_QUERY_LEN: usize = 4096;

/// An ordered multimap of query parameters.
///
/// Iteration order follows first-insertion order of each key; values for a
/// repeated key are appended in the order they appeared.
#[derive(Debug, Clone, Default)]
pub struct Query {
    order: Vec<String>,
    values: HashMap<String, Vec<String>>,
}

impl Query {
    fn push(&mut self, key: String, value: String) {
        match self.values.get_mut(&key) {
            Some(v) => v.push(value),
            None => {
                self.order.push(key.clone());
                self.values.insert(key, vec![value]);
            }
        }
    }

    /// The last value for `key` ("last wins" on singular access), matching
    /// how repeated form fields and repeated query keys are conventionally
    /// resolved.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.last().map(String::as_str)
    }

    /// All values for `key`, in the order they appeared.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Parse a raw query string (no leading `?`) into a [`Query`].
///
/// Truncates to an empty map if `raw` exceeds [`MAX_QUERY_LEN`] — a
/// pathologically long query string is rejected up front rather than
/// walked twice.
pub fn parse(raw: &str) -> Query {
    if raw.len() > MAX_QUERY_LEN {
        return Query::default();
    }
    if needs_fallback(raw) {
        return parse_fallback(raw);
    }
    parse_fast(raw)
}

/// True if the fast path cannot safely handle this input: a `;` separator
/// (some stacks still treat it as equivalent to `&`) or a `%` escape whose
/// two following characters are not both valid hex digits.
fn needs_fallback(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return true,
            b'%' => {
                let ok = bytes.get(i + 1).is_some_and(|b| b.is_ascii_hexdigit())
                    && bytes.get(i + 2).is_some_and(|b| b.is_ascii_hexdigit());
                if !ok {
                    return true;
                }
                i += 3;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

fn parse_fast(raw: &str) -> Query {
    let mut out = Query::default();
    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = match segment.split_once('=') {
            Some((k, v)) => (k, v),
            None => (segment, ""),
        };
        out.push(decode_fast(key), decode_fast(value));
    }
    out
}

/// Decode `+` to space and `%XX` to the corresponding byte. Only called
/// once [`needs_fallback`] has confirmed every `%` escape is well-formed,
/// so the unwraps here cannot fail.
fn decode_fast(s: &str) -> String {
    if !s.as_bytes().iter().any(|&b| b == b'+' || b == b'%') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = hex_val(bytes[i + 1]);
                let lo = hex_val(bytes[i + 2]);
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Lenient fallback: delegate to `form_urlencoded`, which tolerates `;`,
/// malformed escapes (passing the raw byte through via lossy UTF-8), and
/// anything else the fast path refuses to guess at. May partially succeed;
/// whatever it decodes is returned.
fn parse_fallback(raw: &str) -> Query {
    let mut out = Query::default();
    let normalized = raw.replace(';', "&");
    for (k, v) in form_urlencoded::parse(normalized.as_bytes()) {
        out.push(k.into_owned(), v.into_owned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_repeated_keys_last_wins_and_all_values() {
        let q = parse("q=hello+world&q=bye&cat=images%2Fpng");
        assert_eq!(q.get("q"), Some("bye"));
        assert_eq!(q.get_all("q"), &["hello world".to_string(), "bye".to_string()]);
        assert_eq!(q.get("cat"), Some("images/png"));
    }

    #[test]
    fn preserves_first_insertion_key_order() {
        let q = parse("b=2&a=1&b=3");
        assert_eq!(q.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn empty_segments_are_skipped() {
        let q = parse("a=1&&b=2&");
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn missing_equals_yields_empty_value() {
        let q = parse("flag&other=1");
        assert_eq!(q.get("flag"), Some(""));
    }

    #[test]
    fn semicolon_triggers_fallback() {
        let q = parse("a=1;b=2");
        assert_eq!(q.get("a"), Some("1"));
        assert_eq!(q.get("b"), Some("2"));
    }

    #[test]
    fn invalid_hex_triggers_fallback_without_erroring() {
        let q = parse("a=100%zz");
        assert_eq!(q.get("a").is_some(), true);
    }

    #[test]
    fn oversized_query_yields_empty_map() {
        let raw = "a=".to_string() + &"x".repeat(MAX_QUERY_LEN + 10);
        let q = parse(&raw);
        assert!(q.is_empty());
    }

    #[test]
    fn idempotent_roundtrip_for_unreserved_and_plus() {
        let raw = "name=John+Doe&tag=rust";
        let q1 = parse(raw);
        let reencoded = format!(
            "name={}&tag={}",
            q1.get("name").unwrap().replace(' ', "+"),
            q1.get("tag").unwrap()
        );
        let q2 = parse(&reencoded);
        assert_eq!(q1.get("name"), q2.get("name"));
        assert_eq!(q1.get("tag"), q2.get("tag"));
    }
}
