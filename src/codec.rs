//! Document codec: JSON text ⇄ typed shapes.
//!
//! One canonical parse-to-object step, with typed decoding layered on top.
//! All operations route their payloads through here so the structurally
//! aware path (a type that carries `_id`/`_rev` natively) and the
//! structurally opaque path (any serde type, identity hoisted afterwards)
//! agree on outcome.

use crate::error::{CouchError, Result};
use crate::types::document::CouchDocument;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Identity fields of a CouchDB document body.
#[derive(Debug, Deserialize)]
struct IdRev {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_rev", default)]
    rev: String,
}

/// Parse `json` into a JSON object map.
///
/// A payload that is not a single well-formed JSON object is a local
/// validation fault; it never reaches the network.
pub fn parse_object(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CouchError::Validation(format!(
            "document body must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(err) => Err(CouchError::Validation(format!("malformed JSON: {err}"))),
    }
}

/// Parse `json` and remove any caller-supplied `_rev`.
///
/// The server, not the caller, assigns the revision on create.
pub fn strip_rev(json: &str) -> Result<String> {
    let mut map = parse_object(json)?;
    map.remove("_rev");
    Ok(serde_json::to_string(&Value::Object(map))?)
}

/// Serialize a typed document to JSON text, identity fields included
/// whenever the type emits them.
pub fn encode_document<T: CouchDocument>(doc: &T) -> Result<String> {
    Ok(serde_json::to_string(doc)?)
}

/// Decode a document body into `T`, hoisting `_id`/`_rev` onto it.
///
/// Types that declare the identity fields themselves get them populated
/// by serde; the hoist then rewrites the same values, so both kinds of
/// type observe identical results.
pub fn decode_document<T: CouchDocument>(json: &str) -> Result<T> {
    let mut doc: T = serde_json::from_str(json)?;
    let idrev: IdRev = serde_json::from_str(json)?;
    doc.set_id(&idrev.id);
    doc.set_rev(&idrev.rev);
    Ok(doc)
}

/// Decode an arbitrary serde shape (view envelopes, server acks).
pub fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::Document;

    // ========== Object Validation ==========

    #[test]
    fn test_parse_object_accepts_object() {
        let map = parse_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_parse_object_rejects_array() {
        let err = parse_object("[1, 2]").unwrap_err();
        assert!(matches!(err, CouchError::Validation(_)));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_parse_object_rejects_malformed() {
        let err = parse_object(r#"{"a":"#).unwrap_err();
        assert!(matches!(err, CouchError::Validation(_)));
    }

    // ========== Revision Stripping ==========

    #[test]
    fn test_strip_rev_removes_rev_only() {
        let out = strip_rev(r#"{"_id":"x","_rev":"1-a","v":2}"#).unwrap();
        let map = parse_object(&out).unwrap();
        assert!(map.contains_key("_id"));
        assert!(!map.contains_key("_rev"));
        assert_eq!(map["v"], 2);
    }

    #[test]
    fn test_strip_rev_without_rev_is_noop() {
        let out = strip_rev(r#"{"v":2}"#).unwrap();
        assert_eq!(parse_object(&out).unwrap()["v"], 2);
    }

    // ========== Identity Hoisting ==========

    #[test]
    fn test_decode_generic_document_hoists_identity() {
        let doc: Document = decode_document(r#"{"_id":"d1","_rev":"1-a","test":"prop"}"#).unwrap();
        assert_eq!(doc.id, "d1");
        assert_eq!(doc.rev, "1-a");
        assert_eq!(doc.get("test").unwrap(), "prop");
    }

    #[test]
    fn test_decode_opaque_type_hoists_identity() {
        use serde::{Deserialize, Serialize};

        #[derive(Default, Serialize, Deserialize)]
        struct Company {
            #[serde(skip)]
            id: String,
            #[serde(skip)]
            rev: String,
            name: String,
        }
        impl CouchDocument for Company {
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

        let c: Company = decode_document(r#"{"_id":"c1","_rev":"3-z","name":"acme"}"#).unwrap();
        assert_eq!(c.id, "c1");
        assert_eq!(c.rev, "3-z");
        assert_eq!(c.name, "acme");
    }

    #[test]
    fn test_encode_document_roundtrip() {
        let mut doc = Document::new();
        doc.set_id("d2");
        doc.set_rev("2-b");
        doc.insert("k", serde_json::json!(true));
        let text = encode_document(&doc).unwrap();
        let back: Document = decode_document(&text).unwrap();
        assert_eq!(back, doc);
    }
}
