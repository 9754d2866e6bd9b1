//! Status-to-outcome mapping.
//!
//! Each operation family maps HTTP statuses to exactly one of four
//! outcomes: decode-and-return, absence (`None`), not-modified shell, or
//! a typed [`CouchError::Server`] carrying status and body verbatim.
//!
//! | Family | Success | Special | Otherwise |
//! |---|---|---|---|
//! | create/save document | 201 | none | error (409 = conflict) |
//! | get document / get attachment | 200 | 404 → `None` | error |
//! | delete document, delete attachment | 200 | none | error |
//! | view / all-docs | 200 | 304 → shell | error |
//! | add attachment | 201 | none | error |
//! | compact | 202 | none | error |

use crate::client::transport::CouchResponse;
use crate::error::{CouchError, Result};

pub(crate) const OK: u16 = 200;
pub(crate) const CREATED: u16 = 201;
pub(crate) const ACCEPTED: u16 = 202;
pub(crate) const NOT_MODIFIED: u16 = 304;
pub(crate) const NOT_FOUND: u16 = 404;

/// Require exactly `expected`; anything else is a server rejection.
pub(crate) fn require(response: CouchResponse, expected: u16) -> Result<CouchResponse> {
    if response.status == expected {
        Ok(response)
    } else {
        Err(CouchError::server(response.status, &response.body))
    }
}

/// 200 → response, 404 → `None` (absence is normal control flow, never a
/// fault), otherwise a server rejection.
pub(crate) fn ok_or_missing(response: CouchResponse) -> Result<Option<CouchResponse>> {
    match response.status {
        OK => Ok(Some(response)),
        NOT_FOUND => Ok(None),
        status => Err(CouchError::server(status, &response.body)),
    }
}

/// Outcome of a conditional view fetch.
pub(crate) enum ViewOutcome {
    /// 200: a fresh body to decode.
    Fresh(CouchResponse),
    /// 304: the caller's etag still matches; the body was not decoded.
    NotModified { status: u16, etag: Option<String> },
}

/// 200 → fresh, 304 → not-modified shell (no decoding), otherwise a
/// server rejection.
pub(crate) fn view_outcome(response: CouchResponse) -> Result<ViewOutcome> {
    match response.status {
        OK => Ok(ViewOutcome::Fresh(response)),
        NOT_MODIFIED => Ok(ViewOutcome::NotModified {
            status: NOT_MODIFIED,
            etag: response.etag().map(str::to_string),
        }),
        status => Err(CouchError::server(status, &response.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> CouchResponse {
        CouchResponse::new(status, body)
    }

    // ========== require ==========

    #[test]
    fn test_require_matching_status() {
        let resp = require(response(201, "{}"), CREATED).unwrap();
        assert_eq!(resp.status, 201);
    }

    #[test]
    fn test_require_conflict_is_typed_error() {
        let err = require(response(409, r#"{"error":"conflict"}"#), CREATED).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_require_carries_body_verbatim() {
        let err = require(response(500, "boom"), OK).unwrap_err();
        assert_eq!(err.to_string(), "server returned 500: boom");
    }

    // ========== ok_or_missing ==========

    #[test]
    fn test_missing_document_is_none_not_error() {
        assert!(ok_or_missing(response(404, r#"{"error":"not_found"}"#))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_present_document() {
        let resp = ok_or_missing(response(200, "{}")).unwrap().unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn test_other_status_is_error() {
        assert!(ok_or_missing(response(401, "{}")).is_err());
    }

    // ========== view_outcome ==========

    #[test]
    fn test_view_fresh() {
        match view_outcome(response(200, r#"{"rows":[]}"#)).unwrap() {
            ViewOutcome::Fresh(resp) => assert_eq!(resp.status, 200),
            _ => panic!("expected fresh"),
        }
    }

    #[test]
    fn test_view_not_modified_keeps_etag() {
        let resp = response(304, "").with_header("ETag", "\"1-abc\"");
        match view_outcome(resp).unwrap() {
            ViewOutcome::NotModified { status, etag } => {
                assert_eq!(status, 304);
                assert_eq!(etag.as_deref(), Some("\"1-abc\""));
            }
            _ => panic!("expected not-modified"),
        }
    }

    #[test]
    fn test_view_error() {
        assert!(view_outcome(response(500, "{}")).is_err());
    }
}
