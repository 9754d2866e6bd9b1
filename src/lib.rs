//! Typed asynchronous CouchDB client.
//!
//! Settee maps the CouchDB HTTP API onto typed Rust calls: documents,
//! attachments, map/reduce views, and change feeds, with strongly typed
//! deserialization wherever the server answers JSON.
//!
//! # Overview
//!
//! - **Documents**: create, fetch, update, and delete, either as the
//!   schemaless [`Document`](types::Document) or any type implementing
//!   [`CouchDocument`](types::CouchDocument)
//! - **Attachments**: binary bodies per document, buffered or streamed
//! - **Views**: `_all_docs`, design-document views, and ad-hoc temp
//!   views, with ETag-aware conditional requests
//! - **Changes**: bounded batches or a live continuous feed
//!
//! # Modules
//!
//! - [`client`] - server and database handles, transport, path building
//! - [`types`] - documents, view options and results, change entries
//! - [`codec`] - JSON validation and id/rev bookkeeping
//! - [`completion`] - one-shot result handoff between tasks
//! - [`error`] - the crate-wide error type
//!
//! # Quick Start
//!
//! ```ignore
//! use settee::{ClientConfig, CouchClient, Document};
//! use serde_json::json;
//!
//! let client = CouchClient::new(ClientConfig::default());
//! let db = client.database("widgets");
//!
//! let saved = db.create_document(r#"{"kind":"widget"}"#).await?;
//! let mut doc = db.get_document(&saved.id).await?.unwrap();
//! doc.insert("color", json!("red"));
//! db.save_document(&doc.id, &doc.rev, &doc.to_json()?).await?;
//! ```

pub mod client;
pub mod codec;
pub mod completion;
pub mod error;
pub mod types;

pub use client::{
    ClientConfig, ContinuousChanges, CouchClient, CouchDatabase, CouchRequest, CouchResponse,
    HttpTransport, ResourcePath, Transport,
};
pub use completion::{completion, Completer, Completion};
pub use error::{CouchError, Result};
pub use types::{
    ChangeEntry, ChangeFeed, ChangeOptions, CouchChanges, CouchDocument, CouchView, DatabaseInfo,
    Document, SaveResponse, ViewOptions, ViewResult, ViewRow,
};
