//! Documents and their identity fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed CouchDB document.
///
/// Implement this for any serde type to use the typed operations on
/// [`CouchDatabase`](crate::client::CouchDatabase). The accessors carry
/// the `_id`/`_rev` pair; after a successful create or save the client
/// overwrites both from the server's response, since the server is
/// authoritative for identity even when the caller supplied a tentative
/// id.
///
/// An update or delete requires both id and revision to be non-empty.
/// The revision changes on every successful mutation and is the
/// optimistic concurrency token.
pub trait CouchDocument: Serialize + DeserializeOwned {
    /// Document id (`_id`). Empty until first create.
    fn id(&self) -> &str;
    /// Revision token (`_rev`). Empty until first save.
    fn rev(&self) -> &str;
    fn set_id(&mut self, id: &str);
    fn set_rev(&mut self, rev: &str);
}

/// A generic JSON document: identity plus arbitrary fields.
///
/// `_id` and `_rev` are hoisted onto [`id`](Document::id) and
/// [`rev`](Document::rev); everything else lives in the flattened field
/// map in server order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// An empty document with no identity; the server assigns the id on
    /// first create.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON text. The text must be a JSON object.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        crate::codec::decode_document(json)
    }

    /// Serialize to JSON text, identity fields included when present.
    pub fn to_json(&self) -> crate::error::Result<String> {
        crate::codec::encode_document(self)
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Whether the document carries at least one attachment stub.
    pub fn has_attachments(&self) -> bool {
        self.fields
            .get("_attachments")
            .and_then(Value::as_object)
            .map(|a| !a.is_empty())
            .unwrap_or(false)
    }

    /// Names of the document's attachments, in server order.
    pub fn attachment_names(&self) -> Vec<&str> {
        self.fields
            .get("_attachments")
            .and_then(Value::as_object)
            .map(|a| a.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl CouchDocument for Document {
    fn id(&self) -> &str {
        &self.id
    }
    fn rev(&self) -> &str {
        &self.rev
    }
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
    fn set_rev(&mut self, rev: &str) {
        self.rev = rev.to_string();
    }
}

/// Server acknowledgment of a document write.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub ok: bool,
    pub id: String,
    pub rev: String,
}
