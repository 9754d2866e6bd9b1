//! Change feed options and entries.

use crate::types::document::Document;
use serde::Deserialize;
use serde_json::Value;

/// Feed mode for `_changes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeFeed {
    /// One-shot fetch, materialized into a [`CouchChanges`].
    #[default]
    Normal,
    /// Long-lived feed delivered incrementally over an open connection.
    Continuous,
}

impl ChangeFeed {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ChangeFeed::Normal => "normal",
            ChangeFeed::Continuous => "continuous",
        }
    }
}

/// Options for `_changes` requests.
///
/// As with [`ViewOptions`](crate::types::ViewOptions), absent options are
/// omitted from the query string entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeOptions {
    /// Start streaming after this update sequence.
    pub since: Option<Value>,
    pub limit: Option<u64>,
    pub descending: Option<bool>,
    /// Name of a server-side filter function (`design/filter`).
    pub filter: Option<String>,
    /// Server heartbeat period for continuous feeds, milliseconds.
    pub heartbeat_ms: Option<u64>,
    /// Server-side long-poll timeout, milliseconds.
    pub timeout_ms: Option<u64>,
    pub include_docs: Option<bool>,
    /// Set by the change-feed operations; callers never need to touch it.
    pub feed: ChangeFeed,
}

impl ChangeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, seq: Value) -> Self {
        self.since = Some(seq);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn heartbeat_ms(mut self, ms: u64) -> Self {
        self.heartbeat_ms = Some(ms);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn include_docs(mut self, include_docs: bool) -> Self {
        self.include_docs = Some(include_docs);
        self
    }

    /// Query parameters in fixed order, `feed` always last.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(since) = &self.since {
            pairs.push(("since".to_string(), query_value(since)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending".to_string(), descending.to_string()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        if let Some(ms) = self.heartbeat_ms {
            pairs.push(("heartbeat".to_string(), ms.to_string()));
        }
        if let Some(ms) = self.timeout_ms {
            pairs.push(("timeout".to_string(), ms.to_string()));
        }
        if let Some(include_docs) = self.include_docs {
            pairs.push(("include_docs".to_string(), include_docs.to_string()));
        }
        pairs.push(("feed".to_string(), self.feed.as_str().to_string()));
        pairs
    }
}

/// Sequence ids are strings in CouchDB 2.x+ and integers in 1.x; send
/// strings bare and everything else JSON-encoded.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One revision listed in a change entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRev {
    pub rev: String,
}

/// A single entry of the change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEntry<D = Document> {
    /// Update sequence at which this change happened.
    #[serde(default)]
    pub seq: Value,
    /// Id of the changed document.
    pub id: String,
    /// Leaf revisions resulting from the change.
    #[serde(default = "Vec::new")]
    pub changes: Vec<ChangeRev>,
    /// Whether the change is a deletion (server tombstone).
    #[serde(default)]
    pub deleted: bool,
    /// The document body, present only when `include_docs` was requested.
    pub doc: Option<D>,
}

impl<D> ChangeEntry<D> {
    /// Winning revision of the change, when the server listed one.
    pub fn rev(&self) -> Option<&str> {
        self.changes.first().map(|c| c.rev.as_str())
    }
}

/// A materialized one-shot change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct CouchChanges<D = Document> {
    #[serde(default = "Vec::new")]
    pub results: Vec<ChangeEntry<D>>,
    #[serde(default)]
    pub last_seq: Value,
}
