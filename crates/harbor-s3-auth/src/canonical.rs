//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! \n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Query values are decoded and re-encoded so that clients which escape
//! differently still produce the same canonical form. Canonical headers follow
//! the order of the client's `SignedHeaders` list.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except the unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Assemble the canonical request from already-canonicalized parts.
///
/// `canonical_headers` must be the output of [`build_canonical_headers`], which
/// ends with a newline; the blank separator line comes from that newline.
///
/// # Examples
///
/// ```
/// use harbor_s3_auth::canonical::{build_canonical_headers, build_canonical_request};
///
/// let headers = build_canonical_headers(&[("host", "example.com".to_owned())]);
/// let canonical = build_canonical_request(
///     "get",
///     "/bucket/key",
///     "",
///     &headers,
///     "host",
///     "UNSIGNED-PAYLOAD",
/// );
/// assert_eq!(canonical, "GET\n/bucket/key\n\nhost:example.com\n\nhost\nUNSIGNED-PAYLOAD");
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let method = method.to_ascii_uppercase();
    let canonical_uri = build_canonical_uri(path);
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    )
}

/// Build the canonical URI by decoding and re-encoding each path segment.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use harbor_s3_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/bucket/my key"), "/bucket/my%20key");
/// assert_eq!(build_canonical_uri("/bucket/my%20key"), "/bucket/my%20key");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| uri_encode(&percent_decode_str(segment).decode_utf8_lossy()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string.
///
/// Parameter names are sorted; names and values are percent-decoded and then
/// re-encoded with the unreserved set. When a name repeats, the last value
/// wins. Names listed in `exclude` are dropped, which is how the presigned
/// `X-Amz-Signature` parameter stays out of its own signing input.
///
/// # Examples
///
/// ```
/// use harbor_s3_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("b=2&a=1", &[]), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("uploads", &[]), "uploads=");
/// assert_eq!(build_canonical_query_string("", &[]), "");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str, exclude: &[&str]) -> String {
    let params: BTreeMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| !exclude.contains(&name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    params
        .iter()
        .map(|(name, value)| format!("{}={}", uri_encode(name), uri_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block from `(lowercase name, raw value)` pairs.
///
/// Pairs are emitted in the given order, one `name:value` line each, with
/// surrounding whitespace trimmed and inner runs collapsed to one space. The
/// block ends with a newline.
///
/// # Examples
///
/// ```
/// use harbor_s3_auth::canonical::build_canonical_headers;
///
/// let block = build_canonical_headers(&[
///     ("x-amz-date", "20130524T000000Z".to_owned()),
///     ("host", "  example.com  ".to_owned()),
/// ]);
/// assert_eq!(block, "x-amz-date:20130524T000000Z\nhost:example.com\n");
/// ```
#[must_use]
pub fn build_canonical_headers<N: AsRef<str>, V: AsRef<str>>(headers: &[(N, V)]) -> String {
    headers.iter().fold(String::new(), |mut acc, (name, value)| {
        acc.push_str(name.as_ref());
        acc.push(':');
        acc.push_str(&collapse_whitespace(value.as_ref().trim()));
        acc.push('\n');
        acc
    })
}

/// URI-encode a single value using the AWS SigV4 encoding rules.
pub(crate) fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
