//! Error types for CouchDB client operations.
//!
//! The [`Result`] type alias is used throughout the crate. Two expected
//! outcomes are deliberately *not* errors and never appear here: a 404 on
//! a document fetch (absence, surfaced as `Ok(None)`) and a 304 on a
//! conditional view fetch (surfaced through the result's status field).
//!
//! # Error Categories
//!
//! | Category | Variants | Raised |
//! |----------|----------|--------|
//! | Local validation | `Validation` | before any network call |
//! | Server rejection | `Server` | non-success HTTP status |
//! | Transport | `Transport`, `Io` | connection/socket failures |
//! | Decode | `Json`, `InvalidUtf8` | malformed response bodies |
//! | Change feed | `ChangesClosed` | peer ended a continuous feed |

use std::io;
use thiserror::Error;

/// Result type for CouchDB client operations.
pub type Result<T> = std::result::Result<T, CouchError>;

/// Errors that can occur while talking to a CouchDB server.
///
/// Server-rejected requests are always surfaced as [`CouchError::Server`]
/// carrying the raw status code and the verbatim response body; the body
/// is never reinterpreted beyond that.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CouchError {
    /// A required argument was missing or malformed.
    ///
    /// Raised synchronously before any network call; never retried.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// The server rejected the request.
    ///
    /// Carries the HTTP status code and the raw error body exactly as the
    /// server sent it. A 409 here means a stale revision on save, delete
    /// or attach; the caller must re-read and redecide.
    #[error("server returned {status}: {body}")]
    Server {
        /// HTTP status code of the rejection.
        status: u16,
        /// Raw response body, verbatim.
        body: String,
    },

    /// The HTTP transport failed before a response was received.
    ///
    /// Connection refused, DNS failure, broken stream and the like,
    /// propagated unchanged from the transport collaborator.
    #[error("transport error: {0}")]
    Transport(String),

    /// Network I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body or header contained invalid UTF-8.
    #[error("invalid UTF-8 in response: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A continuous change feed was closed by the peer.
    #[error("change feed closed")]
    ChangesClosed,
}

impl From<reqwest::Error> for CouchError {
    fn from(err: reqwest::Error) -> Self {
        CouchError::Transport(err.to_string())
    }
}

impl CouchError {
    /// Build a [`CouchError::Server`] from a status code and raw body bytes.
    pub(crate) fn server(status: u16, body: &[u8]) -> Self {
        CouchError::Server {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// HTTP status code of a server rejection, if this is one.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CouchError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a 409 revision conflict.
    ///
    /// A conflict means the supplied revision was stale. It is never
    /// auto-retried or auto-merged by this crate.
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Whether this is a 404 rejection.
    ///
    /// Only operations where absence is unexpected (delete or attach
    /// against a missing document) produce this; document and attachment
    /// gets map 404 to `Ok(None)` instead.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
