//! # Request Context
//!
//! Per-request view handed to route handlers.
//!
//! A [`RequestContext`] is built from a [`RawRequest`] once the router has
//! matched it. Construction:
//!
//! 1. lower-cases the method and normalizes the path
//! 2. lower-cases header names (duplicates resolve last-write-wins)
//! 3. parses the query string into the unified parameter map
//! 4. merges URL-encoded or multipart form fields into the same map,
//!    leaving any other body raw for [`RequestContext::bind_json`]
//!
//! Path parameters live apart from the unified map. A map with no entries
//! is reported as absent (`None`), never as an empty map.
//!
//! Handlers read through the accessors, bind with
//! [`bind_form`](RequestContext::bind_form) /
//! [`bind_json`](RequestContext::bind_json), and respond with the
//! `output_*` helpers. The status and body are written at most once.

mod binder;
mod form;

pub use binder::{from_params, BindError};
pub use form::{
    ensure_form_body, parse_multipart_fields, parse_urlencoded, ContentError, ContentKind,
    FORM_URLENCODED, MULTIPART_FORM_DATA,
};

use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::{HttpMethod, ParamVec};
use crate::server::request::{header_map, normalize_path, parse_query_params, RawRequest};
use crate::server::response::{
    HeaderError, HttpResponse, ResponseWriter, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
    MAX_HANDLER_HEADERS,
};
use crate::status::Status;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Normalized request plus the response being written for it.
#[derive(Debug)]
pub struct RequestContext {
    method: String,
    http_method: Option<HttpMethod>,
    path: String,
    headers: HashMap<String, String>,
    path_params: Option<ParamVec>,
    params: Option<HashMap<String, String>>,
    raw_body: Vec<u8>,
    body_consumed: bool,
    request_id: RequestId,
    response: ResponseWriter,
}

impl RequestContext {
    /// Build a context with no path parameters.
    ///
    /// # Errors
    ///
    /// See [`RequestContext::from_raw`].
    pub fn new(raw: RawRequest) -> Result<Self, ContentError> {
        Self::from_raw(raw, None)
    }

    /// Build a context for a matched request.
    ///
    /// An absent or empty form body contributes no entries.
    ///
    /// # Errors
    ///
    /// [`ContentError`] when a multipart body has no boundary or does not
    /// follow it.
    pub fn from_raw(raw: RawRequest, path_params: Option<ParamVec>) -> Result<Self, ContentError> {
        let request_id = RequestId::from_header_or_new(raw.header(REQUEST_ID_HEADER));
        Self::build(raw, path_params, request_id)
    }

    pub(crate) fn build(
        raw: RawRequest,
        path_params: Option<ParamVec>,
        request_id: RequestId,
    ) -> Result<Self, ContentError> {
        let method = raw.method.to_ascii_lowercase();
        let http_method = method.parse().ok();
        let path = normalize_path(raw.path());
        let headers = header_map(&raw.headers);

        let mut params = raw.query().map(parse_query_params).unwrap_or_default();

        match ContentKind::from_header(raw.content_type()) {
            ContentKind::UrlEncoded if !raw.body.is_empty() => {
                parse_urlencoded(&raw.body, &mut params);
            }
            ContentKind::Multipart { boundary } if !raw.body.is_empty() => {
                parse_multipart_fields(&raw.body, boundary.as_deref(), &mut params)?;
            }
            _ => {}
        }

        debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            header_count = headers.len(),
            param_count = params.len(),
            path_param_count = path_params.as_ref().map_or(0, |p| p.len()),
            body_size_bytes = raw.body.len(),
            "Request context built"
        );

        Ok(Self {
            method,
            http_method,
            path,
            headers,
            path_params,
            params: (!params.is_empty()).then_some(params),
            raw_body: raw.body,
            body_consumed: false,
            request_id,
            response: ResponseWriter::new(),
        })
    }

    /// Lower-cased method token.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Parsed method, `None` for tokens outside [`HttpMethod`].
    #[must_use]
    pub fn http_method(&self) -> Option<HttpMethod> {
        self.http_method
    }

    /// Normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers keyed by lower-cased name.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Named path captures, absent when the route has no placeholders.
    #[must_use]
    pub fn path_params(&self) -> Option<&ParamVec> {
        self.path_params.as_ref()
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .as_ref()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Unified query and form parameters, absent when empty.
    #[must_use]
    pub fn query_params(&self) -> Option<&HashMap<String, String>> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name).map(String::as_str)
    }

    /// Raw body bytes; empty once [`bind_json`](Self::bind_json) has run.
    #[must_use]
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Bind the unified parameters into `T`, best effort.
    ///
    /// # Errors
    ///
    /// [`BindError::Form`] only for targets flat parameters cannot describe.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        from_params(self.params.as_ref())
    }

    /// Decode the whole body as one JSON document, consuming it.
    ///
    /// # Errors
    ///
    /// [`BindError::Json`] for malformed JSON or a shape mismatch,
    /// [`BindError::BodyConsumed`] on a second call.
    pub fn bind_json<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        if self.body_consumed {
            return Err(BindError::BodyConsumed);
        }
        self.body_consumed = true;
        let body = std::mem::take(&mut self.raw_body);
        serde_json::from_slice(&body).map_err(|e| {
            debug!(request_id = %self.request_id, error = %e, "JSON body rejected");
            BindError::Json(e)
        })
    }

    /// Set a response header; ignored once the status is written or when
    /// [`MAX_HANDLER_HEADERS`] names are already set.
    pub fn output_header(&mut self, name: &str, value: impl Into<String>) {
        match self.response.set_header(name, value) {
            Ok(()) => {}
            Err(HeaderError::AlreadyWritten) => debug!(
                request_id = %self.request_id,
                header = %name,
                "Header ignored after status was written"
            ),
            Err(HeaderError::LimitReached) => warn!(
                request_id = %self.request_id,
                header = %name,
                limit = MAX_HANDLER_HEADERS,
                "Header ignored, response header limit reached"
            ),
        }
    }

    /// Write `status`; codes `>= 400` also get the JSON error body.
    pub fn output_status(&mut self, status: &Status) {
        if status.is_error() {
            let body = status.error_body().to_vec();
            self.write(status.code, Some(CONTENT_TYPE_JSON), body);
        } else {
            self.write(status.code, None, Vec::new());
        }
    }

    /// Write `status` with a plain-text body.
    pub fn output_text(&mut self, status: &Status, text: &str) {
        self.write(status.code, Some(CONTENT_TYPE_TEXT), text.as_bytes().to_vec());
    }

    /// Write `status` with `value` encoded as JSON.
    ///
    /// An encoding failure writes a `500` error body instead.
    pub fn output_json<T: Serialize + ?Sized>(&mut self, status: &Status, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.write(status.code, Some(CONTENT_TYPE_JSON), body),
            Err(e) => {
                error!(request_id = %self.request_id, error = %e, "JSON response encoding failed");
                self.output_status(&Status::internal_server_error());
            }
        }
    }

    fn write(&mut self, code: u16, content_type: Option<&str>, body: Vec<u8>) {
        if !self.response.write(code, content_type, body) {
            warn!(
                request_id = %self.request_id,
                status = code,
                written_status = ?self.response.status(),
                "Response already written"
            );
        }
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.response.is_written()
    }

    /// Finish the response; nothing written means `200` with an empty body.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.response.into_response()
    }
}
