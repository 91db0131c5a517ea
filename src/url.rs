//! URL construction for the client: path-param substitution, base-URL join,
//! and query-string appending.
//!
//! Kept as a thin leaf over the `url` and `percent-encoding` crates rather
//! than hand-rolling URL parsing — the router's own path/query split in
//! [`crate::router::matcher`] only ever sees already-resolved request
//! targets, so it has no need for this module; this side exists purely to
//! build *outgoing* client URLs correctly.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::Error;

/// Everything `NON_ALPHANUMERIC` except the handful of characters that are
/// safe to leave bare in a path segment.
const PATH_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn percent_encode_path_param(value: &str) -> String {
    utf8_percent_encode(value, PATH_PARAM).to_string()
}

/// Substitutes `:name` and `{name}` placeholders in `template` with
/// percent-encoded values looked up from `params`. Placeholders with no
/// matching param are left untouched — the caller decides whether that's
/// an error.
pub fn substitute_path_params(template: &str, params: &[(String, String)]) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        let marker = bytes[i];
        if marker != b':' && marker != b'{' {
            i += 1;
            continue;
        }
        let braced = marker == b'{';
        let name_start = i + 1;
        let mut end = name_start;
        while end < bytes.len() {
            let b = bytes[end];
            let stop = if braced { b == b'}' } else { !(b.is_ascii_alphanumeric() || b == b'_') };
            if stop {
                break;
            }
            end += 1;
        }
        let closed = !braced || bytes.get(end) == Some(&b'}');
        let name = &template[name_start..end];

        if closed && !name.is_empty() {
            if let Some((_, value)) = params.iter().find(|(k, _)| k == name) {
                out.push_str(&template[copied..i]);
                out.push_str(&percent_encode_path_param(value));
                i = if braced { end + 1 } else { end };
                copied = i;
                continue;
            }
        }
        i = end.max(i + 1);
    }

    out.push_str(&template[copied..]);
    out
}

/// Resolves `target` against `base`: an absolute URL in `target` wins
/// outright; a relative one is joined onto `base`.
pub fn resolve(base: Option<&str>, target: &str) -> Result<url::Url, Error> {
    if let Ok(absolute) = url::Url::parse(target) {
        return Ok(absolute);
    }
    let base = base.ok_or_else(|| {
        Error::InvalidUrl(format!("relative path `{target}` given with no base url configured"))
    })?;
    let base_url = url::Url::parse(base)
        .map_err(|e| Error::InvalidUrl(format!("invalid base url `{base}`: {e}")))?;
    base_url
        .join(target)
        .map_err(|e| Error::InvalidUrl(format!("cannot resolve `{target}` against `{base}`: {e}")))
}

/// Appends `pairs` to `url`'s query string, preserving repeated keys.
pub fn append_query(url: &mut url::Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut appender = url.query_pairs_mut();
    for (k, v) in pairs {
        appender.append_pair(k, v);
    }
}
