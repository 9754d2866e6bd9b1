//! HTTP transport collaborator.
//!
//! Everything above this module speaks [`CouchRequest`]/[`CouchResponse`];
//! the [`Transport`] trait is the seam between client logic and the
//! network, so tests drive the full request/decode pipeline through a
//! scripted implementation while production uses the reqwest-backed
//! [`HttpTransport`].

use crate::client::config::ClientConfig;
use crate::error::{CouchError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Method;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

/// A streamed response or request body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of an outgoing request.
pub enum RequestBody {
    Empty,
    /// Buffered body.
    Full(Bytes),
    /// Streamed body with a declared length, consumed exactly once.
    /// Used for attachment upload.
    Stream { body: ByteStream, length: u64 },
}

/// One outgoing HTTP exchange: method, pre-built `path?query` relative to
/// the server root, headers and body.
pub struct CouchRequest {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub body: RequestBody,
    /// Replace the per-request timeout with a day-long one; set for
    /// continuous change feeds, which stay open until closed.
    pub long_lived: bool,
}

impl CouchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        CouchRequest {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            content_type: None,
            body: RequestBody::Empty,
            long_lived: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Full(body.into());
        self
    }

    pub fn with_stream(mut self, body: ByteStream, length: u64) -> Self {
        self.body = RequestBody::Stream { body, length };
        self
    }

    pub fn long_lived(mut self) -> Self {
        self.long_lived = true;
        self
    }
}

impl std::fmt::Debug for CouchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body_len = match &self.body {
            RequestBody::Empty => 0,
            RequestBody::Full(bytes) => bytes.len() as u64,
            RequestBody::Stream { length, .. } => *length,
        };
        f.debug_struct("CouchRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("body_len", &body_len)
            .field("long_lived", &self.long_lived)
            .finish()
    }
}

/// A fully buffered HTTP response.
#[derive(Clone, Debug)]
pub struct CouchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl CouchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        CouchResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The response's `ETag` header, verbatim (quotes included).
    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status and headers up front, body as a stream. Used by attachment
/// download and the continuous change feed.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ByteStream,
}

impl StreamingResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drain the stream into an error carrying whatever body arrived.
    pub(crate) async fn into_server_error(mut self) -> CouchError {
        let mut body = Vec::new();
        while let Some(Ok(chunk)) = self.body.next().await {
            body.extend_from_slice(&chunk);
        }
        CouchError::server(self.status, &body)
    }
}

/// Reliable request/response transport the client calls into.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issue a request and buffer the whole response.
    async fn issue(&self, request: CouchRequest) -> Result<CouchResponse>;

    /// Issue a request and hand back the body as a stream.
    async fn issue_streaming(&self, request: CouchRequest) -> Result<StreamingResponse>;
}

/// reqwest-backed [`Transport`] applying base URL and basic-auth
/// credentials from the shared, immutable configuration.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    enable_logging: bool,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("failed to initialize HTTP client");
        HttpTransport {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            enable_logging: config.enable_logging,
        }
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        HttpTransport {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            enable_logging: config.enable_logging,
        }
    }

    fn prepare(&self, request: CouchRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, request.path);
        if self.enable_logging {
            tracing::debug!(method = %request.method, %url, "couchdb request");
        }

        let mut builder = self.client.request(request.method, &url);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = &request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if request.long_lived {
            // Continuous feeds stay open until closed by the caller.
            builder = builder.timeout(Duration::from_secs(86400));
        }
        match request.body {
            RequestBody::Empty => builder,
            RequestBody::Full(bytes) => builder.body(bytes),
            RequestBody::Stream { body, length } => builder
                .header(reqwest::header::CONTENT_LENGTH, length)
                .body(reqwest::Body::wrap_stream(body)),
        }
    }
}

fn header_map(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(text) = value.to_str() {
            map.insert(name.as_str().to_string(), text.to_string());
        }
    }
    map
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, request: CouchRequest) -> Result<CouchResponse> {
        let response = self.prepare(request).send().await?;
        let status = response.status().as_u16();
        let headers = header_map(response.headers());
        let body = response.bytes().await?;
        if self.enable_logging {
            tracing::debug!(status, body_len = body.len(), "couchdb response");
        }
        Ok(CouchResponse {
            status,
            headers,
            body,
        })
    }

    async fn issue_streaming(&self, request: CouchRequest) -> Result<StreamingResponse> {
        let response = self.prepare(request).send().await?;
        let status = response.status().as_u16();
        let headers = header_map(response.headers());
        if self.enable_logging {
            tracing::debug!(status, "couchdb streaming response");
        }
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(CouchError::from))
            .boxed();
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Response Helpers ==========

    #[test]
    fn test_header_case_insensitive() {
        let resp = CouchResponse::new(200, "").with_header("ETag", "\"1-a\"");
        assert_eq!(resp.header("etag"), Some("\"1-a\""));
        assert_eq!(resp.header("ETAG"), Some("\"1-a\""));
        assert_eq!(resp.etag(), Some("\"1-a\""));
    }

    #[test]
    fn test_header_missing() {
        let resp = CouchResponse::new(200, "");
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_text_utf8() {
        let resp = CouchResponse::new(200, "{\"ok\":true}");
        assert_eq!(resp.text().unwrap(), "{\"ok\":true}");
    }

    #[test]
    fn test_text_invalid_utf8() {
        let resp = CouchResponse::new(200, vec![0x80, 0x81]);
        assert!(resp.text().is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(CouchResponse::new(201, "").is_success());
        assert!(!CouchResponse::new(404, "").is_success());
    }

    // ========== Request Builder ==========

    #[test]
    fn test_request_debug_hides_stream() {
        let req = CouchRequest::new(Method::PUT, "db/doc")
            .with_content_type("application/json")
            .with_body("{}");
        let text = format!("{:?}", req);
        assert!(text.contains("db/doc"));
        assert!(text.contains("body_len: 2"));
    }

    #[test]
    fn test_long_lived_flag() {
        let req = CouchRequest::new(Method::GET, "db/_changes").long_lived();
        assert!(req.long_lived);
    }
}
