//! View queries and results.

use crate::types::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for view and all-docs queries.
///
/// Every option maps to exactly one query parameter (or, for
/// [`etag`](ViewOptions::etag), the `If-None-Match` header) when present;
/// absent options are omitted entirely, never sent with a default
/// placeholder value.
///
/// # Examples
///
/// ```
/// use settee::types::ViewOptions;
///
/// let options = ViewOptions::new().limit(20).descending(true);
/// assert_eq!(options.query_pairs(), vec![
///     ("limit".to_string(), "20".to_string()),
///     ("descending".to_string(), "true".to_string()),
/// ]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    /// Lower bound key, JSON-encoded into the query string.
    pub start_key: Option<Value>,
    /// Upper bound key, JSON-encoded into the query string.
    pub end_key: Option<Value>,
    /// Exact keys to fetch, sent as one JSON-encoded array value.
    pub keys: Option<Vec<Value>>,
    pub descending: Option<bool>,
    pub include_docs: Option<bool>,
    pub reduce: Option<bool>,
    pub group: Option<bool>,
    /// Allow a stale (not yet reindexed) view.
    pub stale_ok: bool,
    /// Previously seen ETag, sent as `If-None-Match` for a conditional
    /// fetch. A match yields a not-modified result shell.
    pub etag: Option<String>,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn start_key(mut self, key: Value) -> Self {
        self.start_key = Some(key);
        self
    }

    pub fn end_key(mut self, key: Value) -> Self {
        self.end_key = Some(key);
        self
    }

    pub fn keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn include_docs(mut self, include_docs: bool) -> Self {
        self.include_docs = Some(include_docs);
        self
    }

    pub fn reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    pub fn group(mut self, group: bool) -> Self {
        self.group = Some(group);
        self
    }

    pub fn stale_ok(mut self) -> Self {
        self.stale_ok = true;
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Query parameters in fixed order. Pure and deterministic.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(key) = &self.start_key {
            pairs.push(("startkey".to_string(), key.to_string()));
        }
        if let Some(key) = &self.end_key {
            pairs.push(("endkey".to_string(), key.to_string()));
        }
        if let Some(keys) = &self.keys {
            pairs.push(("keys".to_string(), Value::Array(keys.clone()).to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending".to_string(), descending.to_string()));
        }
        if let Some(include_docs) = self.include_docs {
            pairs.push(("include_docs".to_string(), include_docs.to_string()));
        }
        if let Some(reduce) = self.reduce {
            pairs.push(("reduce".to_string(), reduce.to_string()));
        }
        if let Some(group) = self.group {
            pairs.push(("group".to_string(), group.to_string()));
        }
        if self.stale_ok {
            pairs.push(("stale".to_string(), "ok".to_string()));
        }
        pairs
    }
}

/// An ad-hoc (temporary) map/reduce view definition, posted to
/// `_temp_view` instead of referencing a stored design document.
#[derive(Debug, Clone, Serialize)]
pub struct CouchView {
    pub map: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl CouchView {
    pub fn new(map: impl Into<String>) -> Self {
        CouchView {
            map: map.into(),
            reduce: None,
        }
    }

    pub fn with_reduce(mut self, reduce: impl Into<String>) -> Self {
        self.reduce = Some(reduce.into());
        self
    }
}

/// One row of a view result.
///
/// `id` is present for mapped rows and absent for reduced rows. `doc` is
/// populated only when `include_docs` was requested.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow<V = Value, D = Document> {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    pub value: Option<V>,
    pub doc: Option<D>,
}

/// Decoded view result envelope.
///
/// Rows preserve server order; they are never re-sorted client-side.
/// When a conditional fetch short-circuits, [`status`](ViewResult::status)
/// is 304, rows are empty and no body was decoded;
/// [`is_not_modified`](ViewResult::is_not_modified) is the field callers
/// branch on.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewResult<V = Value, D = Document> {
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default = "Vec::new")]
    pub rows: Vec<ViewRow<V, D>>,
    /// HTTP status of the fetch: 200, or 304 for a conditional hit.
    #[serde(skip)]
    pub status: u16,
    /// ETag of the result set, usable for a later conditional fetch.
    #[serde(skip)]
    pub etag: Option<String>,
}

impl<V, D> ViewResult<V, D> {
    /// Result shell for a 304 response: status and etag only, no rows.
    pub(crate) fn not_modified(status: u16, etag: Option<String>) -> Self {
        ViewResult {
            total_rows: None,
            offset: None,
            rows: Vec::new(),
            status,
            etag,
        }
    }

    #[inline]
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========== Option Encoding ==========

    #[test]
    fn test_absent_options_emit_nothing() {
        assert!(ViewOptions::new().query_pairs().is_empty());
    }

    #[test]
    fn test_descending_false_still_sent_when_set() {
        let pairs = ViewOptions::new().descending(false).query_pairs();
        assert_eq!(pairs, vec![("descending".to_string(), "false".to_string())]);
    }

    #[test]
    fn test_string_keys_json_encoded() {
        let pairs = ViewOptions::new()
            .start_key(json!("alpha"))
            .end_key(json!(["a", 1]))
            .query_pairs();
        assert_eq!(pairs[0], ("startkey".to_string(), "\"alpha\"".to_string()));
        assert_eq!(pairs[1], ("endkey".to_string(), "[\"a\",1]".to_string()));
    }

    #[test]
    fn test_keys_array_json_encoded() {
        let pairs = ViewOptions::new()
            .keys(vec![json!("x"), json!("y")])
            .query_pairs();
        assert_eq!(pairs, vec![("keys".to_string(), "[\"x\",\"y\"]".to_string())]);
    }

    #[test]
    fn test_stale_ok() {
        let pairs = ViewOptions::new().stale_ok().query_pairs();
        assert_eq!(pairs, vec![("stale".to_string(), "ok".to_string())]);
    }

    #[test]
    fn test_etag_not_a_query_pair() {
        assert!(ViewOptions::new().etag("\"abc\"").query_pairs().is_empty());
    }

    // ========== Result Decoding ==========

    #[test]
    fn test_view_result_decode_preserves_row_order() {
        let body = r#"{"total_rows":3,"offset":0,"rows":[
            {"id":"b","key":"b","value":2},
            {"id":"a","key":"a","value":1},
            {"id":"c","key":"c","value":3}]}"#;
        let result: ViewResult<u32> = serde_json::from_str(body).unwrap();
        assert_eq!(result.total_rows, Some(3));
        let ids: Vec<_> = result.rows.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("b"), Some("a"), Some("c")]);
    }

    #[test]
    fn test_reduced_row_has_no_id() {
        let body = r#"{"rows":[{"key":null,"value":42}]}"#;
        let result: ViewResult<u64> = serde_json::from_str(body).unwrap();
        assert_eq!(result.rows[0].id, None);
        assert_eq!(result.rows[0].value, Some(42));
    }

    #[test]
    fn test_row_with_doc() {
        let body = r#"{"rows":[{"id":"d","key":"d","value":{"rev":"1-a"},
            "doc":{"_id":"d","_rev":"1-a","test":"prop"}}]}"#;
        let result: ViewResult = serde_json::from_str(body).unwrap();
        let doc = result.rows[0].doc.as_ref().unwrap();
        assert_eq!(doc.id, "d");
        assert_eq!(doc.get("test").unwrap(), "prop");
    }

    #[test]
    fn test_rows_decode_with_plain_doc_type() {
        // Deserialize is the only bound a joined doc type needs.
        #[derive(Deserialize)]
        struct Plain {
            name: String,
        }

        let body = r#"{"rows":[{"id":"d","key":"d","value":1,
            "doc":{"_id":"d","_rev":"1-a","name":"acme"}}]}"#;
        let result: ViewResult<u32, Plain> = serde_json::from_str(body).unwrap();
        assert_eq!(result.rows[0].doc.as_ref().unwrap().name, "acme");
        assert_eq!(result.rows[0].value, Some(1));
    }

    #[test]
    fn test_not_modified_shell() {
        let shell: ViewResult = ViewResult::not_modified(304, Some("\"e\"".into()));
        assert!(shell.is_not_modified());
        assert!(shell.rows.is_empty());
        assert_eq!(shell.etag.as_deref(), Some("\"e\""));
    }

    #[test]
    fn test_temp_view_serialization() {
        let view = CouchView::new("function(doc) { emit(doc._id, 1); }");
        let text = serde_json::to_string(&view).unwrap();
        assert!(text.contains("\"map\""));
        assert!(!text.contains("reduce"));
        let with_reduce = view.with_reduce("_count");
        assert!(serde_json::to_string(&with_reduce)
            .unwrap()
            .contains("\"reduce\":\"_count\""));
    }
}
