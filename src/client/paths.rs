//! Resource path construction.
//!
//! CouchDB addresses everything through path segments (database, document
//! id, attachment name, design doc, view name) plus a query string. Ids
//! may contain any character, so every segment is percent-encoded
//! independently: a `/` or `%` inside an id must never split it into
//! multiple segments. Building is pure and deterministic: same inputs,
//! same path.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

/// Everything except unreserved characters (RFC 3986) is encoded, both in
/// path segments and query values.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single component with the same alphabet path
/// segments use.
pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Builder for a `path?query` string relative to the server root.
///
/// # Examples
///
/// ```
/// use settee::client::ResourcePath;
///
/// let path = ResourcePath::new()
///     .at("db")
///     .at("some/doc id")
///     .with_query("rev", "1-abc");
/// assert_eq!(path.build(), "db/some%2Fdoc%20id?rev=1-abc");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one path segment, percent-encoding it as a whole.
    pub fn at(mut self, segment: &str) -> Self {
        self.segments
            .push(utf8_percent_encode(segment, COMPONENT).to_string());
        self
    }

    /// Append one query parameter. The value is encoded at build time.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append query parameters in the given order.
    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Render the final `path?query` string.
    pub fn build(&self) -> String {
        let mut out = self.segments.join("/");
        for (i, (key, value)) in self.query.iter().enumerate() {
            out.push(if i == 0 { '?' } else { '&' });
            out.push_str(&utf8_percent_encode(key, COMPONENT).to_string());
            out.push('=');
            out.push_str(&utf8_percent_encode(value, COMPONENT).to_string());
        }
        out
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}
