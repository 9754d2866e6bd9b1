//! HTTP client layer.
//!
//! [`CouchClient`] owns the connection to one server; [`CouchDatabase`]
//! scopes operations to one database. Both issue requests through the
//! [`Transport`] trait, whose production implementation is the
//! reqwest-backed [`HttpTransport`]. Tests swap in a scripted transport.

pub mod changes;
pub mod config;
pub mod database;
pub mod paths;
pub(crate) mod status;
pub mod server;
pub mod transport;

pub use changes::ContinuousChanges;
pub use config::ClientConfig;
pub use database::CouchDatabase;
pub use paths::ResourcePath;
pub use server::CouchClient;
pub use transport::{
    ByteStream, CouchRequest, CouchResponse, HttpTransport, RequestBody, StreamingResponse,
    Transport,
};
