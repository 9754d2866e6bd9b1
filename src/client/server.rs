//! Server-scoped operations.
//!
//! [`CouchClient`] talks to the server root: session checks, database
//! lifecycle, replication, and admin users. Database handles are minted
//! with [`database`](CouchClient::database) and share this client's
//! transport.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};

use crate::codec;
use crate::error::Result;

use super::config::ClientConfig;
use super::database::CouchDatabase;
use super::paths::ResourcePath;
use super::status;
use super::transport::{CouchRequest, HttpTransport, Transport};

const JSON: &str = "application/json";

/// Entry point for talking to one server.
#[derive(Clone)]
pub struct CouchClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl CouchClient {
    /// Connect to the server described by `config`.
    ///
    /// No request is issued yet; the first operation opens the connection.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config));
        CouchClient { transport, config }
    }

    /// Build a client over a caller-supplied transport. Tests use this to
    /// script responses without a server.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        CouchClient { transport, config }
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle on the named database. Cheap; no request is issued.
    pub fn database(&self, name: impl Into<String>) -> CouchDatabase {
        CouchDatabase::new(self.transport.clone(), name)
    }

    /// Verify a name and password against `POST /_session`.
    ///
    /// `Ok(true)` on success, `Ok(false)` when the server rejects the
    /// credentials, an error for anything else.
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<bool> {
        let body = format!(
            "name={}&password={}",
            super::paths::encode_component(name),
            super::paths::encode_component(password),
        );
        let request = CouchRequest::new(Method::POST, "_session")
            .with_content_type("application/x-www-form-urlencoded")
            .with_body(body);
        let response = self.transport.issue(request).await?;
        match response.status {
            status::OK => Ok(true),
            401 => Ok(false),
            _ => Err(crate::error::CouchError::server(response.status, &response.body)),
        }
    }

    // ========== Database lifecycle ==========

    /// Whether the named database exists.
    pub async fn has_database(&self, name: &str) -> Result<bool> {
        let path = ResourcePath::new().at(name).build();
        let request = CouchRequest::new(Method::GET, path);
        let response = status::ok_or_missing(self.transport.issue(request).await?)?;
        Ok(response.is_some())
    }

    /// Create the named database (`PUT /{db}`).
    pub async fn create_database(&self, name: &str) -> Result<()> {
        let path = ResourcePath::new().at(name).build();
        let request = CouchRequest::new(Method::PUT, path);
        status::require(self.transport.issue(request).await?, status::CREATED)?;
        Ok(())
    }

    /// Delete the named database and everything in it.
    pub async fn delete_database(&self, name: &str) -> Result<()> {
        let path = ResourcePath::new().at(name).build();
        let request = CouchRequest::new(Method::DELETE, path);
        status::require(self.transport.issue(request).await?, status::OK)?;
        Ok(())
    }

    // ========== Replication ==========

    /// Ask the server to replicate `source` into `target`.
    ///
    /// Either side may be a local database name or a remote URL. With
    /// `continuous` the server keeps the replication running after the
    /// initial catch-up. The raw status object is handed back.
    pub async fn trigger_replication(
        &self,
        source: &str,
        target: &str,
        continuous: bool,
    ) -> Result<Value> {
        let body = json!({
            "source": source,
            "target": target,
            "continuous": continuous,
        });
        let request = CouchRequest::new(Method::POST, "_replicate")
            .with_content_type(JSON)
            .with_body(body.to_string());
        let response = self.transport.issue(request).await?;
        match response.status {
            status::OK | status::ACCEPTED => codec::decode(&response.text()?),
            _ => Err(crate::error::CouchError::server(response.status, &response.body)),
        }
    }

    // ========== Admin users ==========

    /// Register a server admin in the configuration
    /// (`PUT /_config/admins/{name}`).
    pub async fn create_admin_user(&self, name: &str, password: &str) -> Result<()> {
        let path = ResourcePath::new().at("_config").at("admins").at(name).build();
        let request = CouchRequest::new(Method::PUT, path)
            .with_content_type(JSON)
            .with_body(Value::String(password.to_owned()).to_string());
        status::require(self.transport.issue(request).await?, status::OK)?;
        Ok(())
    }

    /// Remove a server admin from the configuration.
    pub async fn delete_admin_user(&self, name: &str) -> Result<()> {
        let path = ResourcePath::new().at("_config").at("admins").at(name).build();
        let request = CouchRequest::new(Method::DELETE, path);
        status::require(self.transport.issue(request).await?, status::OK)?;
        Ok(())
    }
}

impl std::fmt::Debug for CouchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouchClient")
            .field("base_url", &self.config.base_url())
            .finish()
    }
}
