//! Database metadata.

use serde::Deserialize;
use serde_json::Value;

/// Metadata returned by `GET /{db}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub doc_del_count: u64,
    /// Opaque update sequence; a string on modern servers, an integer on
    /// old ones.
    #[serde(default)]
    pub update_seq: Value,
    #[serde(default)]
    pub compact_running: bool,
    #[serde(default)]
    pub disk_size: u64,
}
