//! HTTP status values and the JSON error body.
//!
//! [`Status`] is the value handlers pass to
//! [`RequestContext::output_status`](crate::context::RequestContext::output_status)
//! and friends. Its serialized form doubles as the error body written for
//! codes `>= 400`:
//!
//! ```json
//! {"status":400,"error":"Bad Request","error_description":"Bad Request"}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical reason phrase for `code`, or `"Unknown"`.
#[must_use]
pub fn status_reason(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Response status with a description and an optional error description
/// override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "status")]
    pub code: u16,
    #[serde(rename = "error", default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl Status {
    /// Status with the canonical reason phrase as description.
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self {
            code,
            description: status_reason(code).to_string(),
            error_description: None,
        }
    }

    /// Replace the `error_description` reported in the error body.
    #[must_use]
    pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::new(200)
    }

    #[must_use]
    pub fn created() -> Self {
        Self::new(201)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204)
    }

    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(400)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(403)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404)
    }

    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(405)
    }

    #[must_use]
    pub fn payload_too_large() -> Self {
        Self::new(413)
    }

    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new(503)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }

    /// Body written for error statuses, keys in wire order.
    #[must_use]
    pub fn error_body(&self) -> ErrorBody<'_> {
        ErrorBody {
            status: self.code,
            error: &self.description,
            error_description: self
                .error_description
                .as_deref()
                .unwrap_or(&self.description),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.description)
    }
}

/// Serialized JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: u16,
    pub error: &'a str,
    pub error_description: &'a str,
}

impl ErrorBody<'_> {
    /// Encode as JSON bytes.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        // Only integers and strings; encoding cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
