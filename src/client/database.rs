//! Database-scoped operations.
//!
//! A [`CouchDatabase`] is a cheap handle naming one database on one server.
//! It carries no open connection of its own; every operation builds a
//! request and issues it through the shared [`Transport`].
//!
//! | Area        | Operations |
//! |-------------|------------|
//! | Documents   | `create_document`, `save_document`, `get_document`, `delete_document` |
//! | Typed docs  | `create_doc`, `save_doc`, `get_doc` |
//! | Attachments | `put_attachment`, `get_attachment`, `delete_attachment` and rev-resolving conveniences |
//! | Views       | `get_all_documents`, `get_view`, `view`, `get_temp_view` |
//! | Changes     | `get_changes`, `get_continuous_changes` |
//! | Maintenance | `get_info`, `compact`, `compact_view` |

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec;
use crate::error::{CouchError, Result};
use crate::types::{
    ChangeFeed, ChangeOptions, CouchChanges, CouchDocument, CouchView, DatabaseInfo, Document,
    SaveResponse, ViewOptions, ViewResult,
};

use super::changes::ContinuousChanges;
use super::paths::ResourcePath;
use super::status;
use super::status::ViewOutcome;
use super::transport::{ByteStream, CouchRequest, Transport};

const JSON: &str = "application/json";

/// Required string arguments are rejected locally; an empty id or rev
/// would otherwise address the wrong resource entirely (an empty id
/// turns a document path into a database path).
fn require_arg(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CouchError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Handle on a single database.
///
/// Obtained from [`CouchClient::database`](super::CouchClient::database).
/// Clones share the same transport.
#[derive(Clone)]
pub struct CouchDatabase {
    transport: Arc<dyn Transport>,
    name: String,
    default_design_doc: Option<String>,
}

impl CouchDatabase {
    pub(crate) fn new(transport: Arc<dyn Transport>, name: impl Into<String>) -> Self {
        CouchDatabase {
            transport,
            name: name.into(),
            default_design_doc: None,
        }
    }

    /// Database name this handle addresses.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the design document that [`view`](CouchDatabase::view) resolves
    /// against.
    pub fn set_default_design_doc(&mut self, design_doc: impl Into<String>) {
        self.default_design_doc = Some(design_doc.into());
    }

    fn path(&self) -> ResourcePath {
        ResourcePath::new().at(&self.name)
    }

    // ========== Maintenance ==========

    /// Fetch the database summary (`GET /{db}`).
    pub async fn get_info(&self) -> Result<DatabaseInfo> {
        let request = CouchRequest::new(Method::GET, self.path().build());
        let response = status::require(self.transport.issue(request).await?, status::OK)?;
        codec::decode(&response.text()?)
    }

    /// Start compaction of the database. The server acknowledges with
    /// 202 Accepted and compacts in the background.
    pub async fn compact(&self) -> Result<()> {
        let path = self.path().at("_compact").build();
        let request = CouchRequest::new(Method::POST, path).with_content_type(JSON);
        status::require(self.transport.issue(request).await?, status::ACCEPTED)?;
        Ok(())
    }

    /// Start compaction of one design document's view indexes.
    pub async fn compact_view(&self, design_doc: &str) -> Result<()> {
        let path = self.path().at("_compact").at(design_doc).build();
        let request = CouchRequest::new(Method::POST, path).with_content_type(JSON);
        status::require(self.transport.issue(request).await?, status::ACCEPTED)?;
        Ok(())
    }

    // ========== Documents ==========

    /// Create a document, letting the server assign its id.
    ///
    /// Any `_rev` in `json` is stripped first so the write cannot be
    /// mistaken for an update.
    pub async fn create_document(&self, json: &str) -> Result<SaveResponse> {
        let body = codec::strip_rev(json)?;
        let request = CouchRequest::new(Method::POST, self.path().build())
            .with_content_type(JSON)
            .with_body(body);
        let response = status::require(self.transport.issue(request).await?, status::CREATED)?;
        codec::decode(&response.text()?)
    }

    /// Create a document under a caller-chosen id.
    pub async fn create_document_with_id(&self, id: &str, json: &str) -> Result<SaveResponse> {
        let body = codec::strip_rev(json)?;
        let request = CouchRequest::new(Method::PUT, self.path().at(id).build())
            .with_content_type(JSON)
            .with_body(body);
        let response = status::require(self.transport.issue(request).await?, status::CREATED)?;
        codec::decode(&response.text()?)
    }

    /// Update an existing document at `id`, asserting revision `rev`.
    ///
    /// A stale `rev` surfaces as a 409 server error; check with
    /// [`CouchError::is_conflict`].
    pub async fn save_document(&self, id: &str, rev: &str, json: &str) -> Result<SaveResponse> {
        require_arg(id, "document id")?;
        require_arg(rev, "document rev")?;
        // Revalidate the body even though it came in as a string.
        codec::parse_object(json)?;
        let path = self.path().at(id).with_query("rev", rev).build();
        let request = CouchRequest::new(Method::PUT, path)
            .with_content_type(JSON)
            .with_body(json.to_owned());
        let response = status::require(self.transport.issue(request).await?, status::CREATED)?;
        codec::decode(&response.text()?)
    }

    /// Fetch a document, or `None` when the server answers 404.
    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.get_doc(id).await
    }

    /// Fetch a document into a caller-chosen type.
    ///
    /// `_id` and `_rev` are written back through [`CouchDocument`] even
    /// when `T` does not map those fields itself.
    pub async fn get_doc<T: CouchDocument>(&self, id: &str) -> Result<Option<T>> {
        require_arg(id, "document id")?;
        let request = CouchRequest::new(Method::GET, self.path().at(id).build());
        let response = status::ok_or_missing(self.transport.issue(request).await?)?;
        match response {
            Some(response) => Ok(Some(codec::decode_document(&response.text()?)?)),
            None => Ok(None),
        }
    }

    /// Delete revision `rev` of the document at `id`.
    pub async fn delete_document(&self, id: &str, rev: &str) -> Result<SaveResponse> {
        require_arg(id, "document id")?;
        require_arg(rev, "document rev")?;
        let path = self.path().at(id).with_query("rev", rev).build();
        let request = CouchRequest::new(Method::DELETE, path);
        let response = status::require(self.transport.issue(request).await?, status::OK)?;
        codec::decode(&response.text()?)
    }

    // ========== Typed documents ==========

    /// Create `doc`, then write the server-assigned id and new revision
    /// back into it.
    pub async fn create_doc<T: CouchDocument>(&self, doc: &mut T) -> Result<SaveResponse> {
        let json = codec::encode_document(doc)?;
        let saved = if doc.id().is_empty() {
            self.create_document(&json).await?
        } else {
            self.create_document_with_id(&doc.id().to_owned(), &json).await?
        };
        doc.set_id(&saved.id);
        doc.set_rev(&saved.rev);
        Ok(saved)
    }

    /// Save `doc` under its current id and revision, then advance the
    /// revision in place.
    pub async fn save_doc<T: CouchDocument>(&self, doc: &mut T) -> Result<SaveResponse> {
        let json = codec::encode_document(doc)?;
        let saved = self
            .save_document(&doc.id().to_owned(), &doc.rev().to_owned(), &json)
            .await?;
        doc.set_rev(&saved.rev);
        Ok(saved)
    }

    // ========== Attachments ==========

    fn attachment_path(&self, id: &str, name: &str) -> ResourcePath {
        self.path().at(id).at(name)
    }

    /// Attach `content` to revision `rev` of the document at `id`.
    pub async fn put_attachment(
        &self,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        content: impl Into<Bytes>,
    ) -> Result<SaveResponse> {
        require_arg(id, "document id")?;
        require_arg(rev, "document rev")?;
        require_arg(name, "attachment name")?;
        let path = self.attachment_path(id, name).with_query("rev", rev).build();
        let request = CouchRequest::new(Method::PUT, path)
            .with_content_type(content_type)
            .with_body(content);
        let response = status::require(self.transport.issue(request).await?, status::CREATED)?;
        codec::decode(&response.text()?)
    }

    /// Attach a streamed body of known length. The stream is forwarded
    /// without buffering.
    pub async fn put_attachment_stream(
        &self,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        content: ByteStream,
        length: u64,
    ) -> Result<SaveResponse> {
        require_arg(id, "document id")?;
        require_arg(rev, "document rev")?;
        require_arg(name, "attachment name")?;
        let path = self.attachment_path(id, name).with_query("rev", rev).build();
        let request = CouchRequest::new(Method::PUT, path)
            .with_content_type(content_type)
            .with_stream(content, length);
        let response = status::require(self.transport.issue(request).await?, status::CREATED)?;
        codec::decode(&response.text()?)
    }

    /// Attach `content` to the current revision of the document.
    ///
    /// Resolves the revision with a read first, so a concurrent writer
    /// can still win the race and produce a conflict.
    pub async fn add_attachment(
        &self,
        id: &str,
        name: &str,
        content_type: &str,
        content: impl Into<Bytes>,
    ) -> Result<SaveResponse> {
        let rev = self.current_rev(id).await?;
        self.put_attachment(id, &rev, name, content_type, content).await
    }

    /// Fetch an attachment body, or `None` when the document or the
    /// attachment does not exist.
    pub async fn get_attachment(&self, id: &str, name: &str) -> Result<Option<Bytes>> {
        require_arg(id, "document id")?;
        require_arg(name, "attachment name")?;
        let request = CouchRequest::new(Method::GET, self.attachment_path(id, name).build());
        let response = status::ok_or_missing(self.transport.issue(request).await?)?;
        Ok(response.map(|r| r.body))
    }

    /// Fetch an attachment as a byte stream, or `None` when the document
    /// or the attachment does not exist. Large attachments do not transit
    /// memory whole.
    pub async fn get_attachment_stream(&self, id: &str, name: &str) -> Result<Option<ByteStream>> {
        require_arg(id, "document id")?;
        require_arg(name, "attachment name")?;
        let request = CouchRequest::new(Method::GET, self.attachment_path(id, name).build());
        let response = self.transport.issue_streaming(request).await?;
        match response.status {
            status::OK => Ok(Some(response.body)),
            status::NOT_FOUND => Ok(None),
            _ => Err(response.into_server_error().await),
        }
    }

    /// Remove an attachment from revision `rev` of the document.
    pub async fn delete_attachment(&self, id: &str, rev: &str, name: &str) -> Result<SaveResponse> {
        require_arg(id, "document id")?;
        require_arg(rev, "document rev")?;
        require_arg(name, "attachment name")?;
        let path = self.attachment_path(id, name).with_query("rev", rev).build();
        let request = CouchRequest::new(Method::DELETE, path);
        let response = status::require(self.transport.issue(request).await?, status::OK)?;
        codec::decode(&response.text()?)
    }

    /// Remove an attachment from the current revision of the document.
    /// Same read-then-write race as [`add_attachment`](CouchDatabase::add_attachment).
    pub async fn remove_attachment(&self, id: &str, name: &str) -> Result<SaveResponse> {
        let rev = self.current_rev(id).await?;
        self.delete_attachment(id, &rev, name).await
    }

    async fn current_rev(&self, id: &str) -> Result<String> {
        let doc = self.get_document(id).await?.ok_or_else(|| {
            CouchError::Validation(format!("document {id:?} does not exist"))
        })?;
        Ok(doc.rev)
    }

    // ========== Views ==========

    /// Query `_all_docs`.
    pub async fn get_all_documents(&self, options: &ViewOptions) -> Result<ViewResult> {
        let path = self
            .path()
            .at("_all_docs")
            .with_query_pairs(options.query_pairs());
        self.run_view(path, options).await
    }

    /// Query `_all_docs` with full documents joined onto each row.
    pub async fn get_all_documents_with_docs<D: DeserializeOwned>(
        &self,
        options: &ViewOptions,
    ) -> Result<ViewResult<Value, D>> {
        let options = options.clone().include_docs(true);
        let path = self
            .path()
            .at("_all_docs")
            .with_query_pairs(options.query_pairs());
        self.run_view(path, &options).await
    }

    /// Query a named view in a design document.
    pub async fn get_view<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        design_doc: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult<V, D>> {
        let path = self
            .view_path(design_doc, view)
            .with_query_pairs(options.query_pairs());
        self.run_view(path, options).await
    }

    /// Query a named view with full documents joined onto each row.
    pub async fn get_view_with_docs<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        design_doc: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult<V, D>> {
        let options = options.clone().include_docs(true);
        self.get_view(design_doc, view, &options).await
    }

    /// Query a named view in the default design document.
    ///
    /// Fails with a validation error when no default was set with
    /// [`set_default_design_doc`](CouchDatabase::set_default_design_doc).
    pub async fn view<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        view: &str,
        options: &ViewOptions,
    ) -> Result<ViewResult<V, D>> {
        let design_doc = self.default_design_doc.as_deref().ok_or_else(|| {
            CouchError::Validation("no default design document set".into())
        })?;
        let path = ResourcePath::new()
            .at(&self.name)
            .at("_design")
            .at(design_doc)
            .at("_view")
            .at(view)
            .with_query_pairs(options.query_pairs());
        self.run_view(path, options).await
    }

    /// Query a named view and hand back the raw response object.
    pub async fn get_view_raw(
        &self,
        design_doc: &str,
        view: &str,
        options: &ViewOptions,
    ) -> Result<Value> {
        let path = self
            .view_path(design_doc, view)
            .with_query_pairs(options.query_pairs())
            .build();
        let request = CouchRequest::new(Method::GET, path);
        let response = status::require(self.transport.issue(request).await?, status::OK)?;
        codec::decode(&response.text()?)
    }

    /// Run an ad-hoc view without installing a design document
    /// (`POST /{db}/_temp_view`). Slow on the server, intended for
    /// development.
    pub async fn get_temp_view<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        view: &CouchView,
        options: &ViewOptions,
    ) -> Result<ViewResult<V, D>> {
        let path = self
            .path()
            .at("_temp_view")
            .with_query_pairs(options.query_pairs())
            .build();
        let body = serde_json::to_string(view)?;
        let mut request = CouchRequest::new(Method::POST, path)
            .with_content_type(JSON)
            .with_body(body);
        if let Some(etag) = &options.etag {
            request = request.with_header("If-None-Match", etag.clone());
        }
        self.decode_view(self.transport.issue(request).await?).await
    }

    fn view_path(&self, design_doc: &str, view: &str) -> ResourcePath {
        self.path().at("_design").at(design_doc).at("_view").at(view)
    }

    async fn run_view<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        path: ResourcePath,
        options: &ViewOptions,
    ) -> Result<ViewResult<V, D>> {
        let mut request = CouchRequest::new(Method::GET, path.build());
        if let Some(etag) = &options.etag {
            request = request.with_header("If-None-Match", etag.clone());
        }
        self.decode_view(self.transport.issue(request).await?).await
    }

    async fn decode_view<V: DeserializeOwned, D: DeserializeOwned>(
        &self,
        response: super::transport::CouchResponse,
    ) -> Result<ViewResult<V, D>> {
        match status::view_outcome(response)? {
            ViewOutcome::Fresh(response) => {
                let etag = response.etag().map(str::to_owned);
                let mut result: ViewResult<V, D> = codec::decode(&response.text()?)?;
                result.status = response.status;
                result.etag = etag;
                Ok(result)
            }
            ViewOutcome::NotModified { status, etag } => {
                Ok(ViewResult::not_modified(status, etag))
            }
        }
    }

    // ========== Changes ==========

    /// Fetch a bounded batch of changes (`feed=normal`).
    pub async fn get_changes(&self, options: &ChangeOptions) -> Result<CouchChanges> {
        self.fetch_changes(options).await
    }

    /// Fetch a bounded batch of changes with full documents joined on.
    pub async fn get_changes_with_docs<D: DeserializeOwned>(
        &self,
        options: &ChangeOptions,
    ) -> Result<CouchChanges<D>> {
        let options = options.clone().include_docs(true);
        self.fetch_changes(&options).await
    }

    async fn fetch_changes<D: DeserializeOwned>(
        &self,
        options: &ChangeOptions,
    ) -> Result<CouchChanges<D>> {
        let mut options = options.clone();
        options.feed = ChangeFeed::Normal;
        let path = self
            .path()
            .at("_changes")
            .with_query_pairs(options.query_pairs())
            .build();
        let request = CouchRequest::new(Method::GET, path);
        let response = status::require(self.transport.issue(request).await?, status::OK)?;
        codec::decode(&response.text()?)
    }

    /// Open a continuous change feed, reading entries over a channel.
    pub async fn get_continuous_changes(
        &self,
        options: &ChangeOptions,
    ) -> Result<ContinuousChanges> {
        let stream = self.open_feed(options).await?;
        Ok(ContinuousChanges::spawn(stream))
    }

    /// Open a continuous change feed, invoking `callback` per entry.
    pub async fn get_continuous_changes_with<F>(
        &self,
        options: &ChangeOptions,
        callback: F,
    ) -> Result<ContinuousChanges>
    where
        F: Fn(crate::types::ChangeEntry) + Send + Sync + 'static,
    {
        let stream = self.open_feed(options).await?;
        Ok(ContinuousChanges::spawn_with(stream, callback))
    }

    async fn open_feed(&self, options: &ChangeOptions) -> Result<ByteStream> {
        let mut options = options.clone();
        options.feed = ChangeFeed::Continuous;
        let path = self
            .path()
            .at("_changes")
            .with_query_pairs(options.query_pairs())
            .build();
        let request = CouchRequest::new(Method::GET, path).long_lived();
        let response = self.transport.issue_streaming(request).await?;
        if response.status != status::OK {
            return Err(response.into_server_error().await);
        }
        Ok(response.body)
    }
}

impl std::fmt::Debug for CouchDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchDatabase")
            .field("name", &self.name)
            .field("default_design_doc", &self.default_design_doc)
            .finish()
    }
}
