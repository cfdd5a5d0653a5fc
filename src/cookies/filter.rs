//! Normalization filters applied to every `Set-Cookie` line before it
//! reaches the [`CookieJar`](crate::cookies::jar::CookieJar).
//!
//! Servers in the wild send cookies that strict parsers reject or scope
//! too narrowly. Two filters make them storable:
//!
//! - [`filter_cookie`] rewrites the raw header line: a value ending in a bare
//!   comma gets the comma percent-encoded, and a sub-resource `Path` is
//!   widened to `/`.
//! - [`filter_domain`] validates a `Domain` attribute and collapses a
//!   wildcard on a single-label host (`.localhost`) to the bare label.
//!
//! Both are pure and idempotent.

use std::borrow::Cow;

const PATH_ATTRIBUTE: &str = "path";
const ESCAPED_COMMA: &str = "%2C";

/// Filter a full `Set-Cookie` line.
///
/// ```
/// use agentnet::cookies::filter::filter_cookie;
///
/// let raw = "MS_LOGIN_COOKIE_10151=-1,R,L,null,; Expires=Sun, 30-Dec-18 16:57:13 GMT; Path=/RemovedPath";
/// assert_eq!(
///     filter_cookie(raw),
///     "MS_LOGIN_COOKIE_10151=-1,R,L,null%2C; Expires=Sun, 30-Dec-18 16:57:13 GMT; Path=/"
/// );
/// ```
pub fn filter_cookie(raw: &str) -> String {
    let line = raw.trim();
    let line = filter_path(line);
    escape_trailing_comma(&line).into_owned()
}

/// Widen a `Path=/something` attribute to `Path=/`.
///
/// Only attribute segments (after the first `;`) are inspected so a value
/// that happens to contain `path=` is left alone. No `Path` is added when
/// the line has none.
fn filter_path(line: &str) -> Cow<'_, str> {
    let Some(attrs_start) = line.find(';') else {
        return Cow::Borrowed(line);
    };

    let mut offset = attrs_start + 1;
    for segment in line[attrs_start + 1..].split(';') {
        let segment_start = offset;
        offset += segment.len() + 1;

        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case(PATH_ATTRIBUTE) {
            continue;
        }

        let value = value.trim();
        if !value.starts_with('/') || value == "/" {
            return Cow::Borrowed(line);
        }

        // Keep the key exactly as the server wrote it, then the root path.
        let key_end = segment_start + key.len() + 1;
        let segment_end = segment_start + segment.len();
        let mut out = String::with_capacity(line.len());
        out.push_str(&line[..key_end]);
        out.push('/');
        out.push_str(&line[segment_end..]);
        return Cow::Owned(out);
    }

    Cow::Borrowed(line)
}

/// Percent-encode a comma that terminates the value token.
///
/// The value token spans from the first `=` to the next `;`. Commas inside
/// the value and anywhere in the attributes (e.g. `Expires`) are kept.
fn escape_trailing_comma(line: &str) -> Cow<'_, str> {
    let Some(eq) = line.find('=') else {
        return Cow::Borrowed(line);
    };
    let value_end = line[eq + 1..]
        .find(';')
        .map(|i| eq + 1 + i)
        .unwrap_or(line.len());

    if value_end == eq + 1 || !line[..value_end].ends_with(',') {
        return Cow::Borrowed(line);
    }

    let comma = value_end - 1;
    let mut out = String::with_capacity(line.len() + 2);
    out.push_str(&line[..comma]);
    out.push_str(ESCAPED_COMMA);
    out.push_str(&line[value_end..]);
    Cow::Owned(out)
}

/// Validate and normalize a cookie domain.
///
/// Returns `None` (reject the cookie) for a missing domain, an empty one,
/// one made only of whitespace or control characters, or one with
/// whitespace inside it. A wildcard on a first-level host is meaningless,
/// so `.localhost` becomes `localhost`; multi-level domains keep their
/// leading dot.
///
/// ```
/// use agentnet::cookies::filter::filter_domain;
///
/// assert_eq!(filter_domain(Some("  .localhost")).as_deref(), Some("localhost"));
/// assert_eq!(filter_domain(Some(".google.com")).as_deref(), Some(".google.com"));
/// assert_eq!(filter_domain(Some("\r\n\t\t")), None);
/// assert_eq!(filter_domain(None), None);
/// ```
pub fn filter_domain(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim_matches(|c: char| c.is_whitespace() || c.is_control());
    if trimmed.is_empty() || trimmed.contains(|c: char| c.is_whitespace() || c.is_control()) {
        return None;
    }

    match trimmed.strip_prefix('.') {
        Some("") => None,
        Some(label) if is_first_level(label) => Some(label.to_string()),
        _ => Some(trimmed.to_string()),
    }
}

/// A single label host such as `localhost`.
fn is_first_level(domain: &str) -> bool {
    !domain.contains('.')
}
