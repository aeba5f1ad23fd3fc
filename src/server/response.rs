use crate::ids::REQUEST_ID_HEADER;
use crate::status::{status_reason, Status};
use may_minihttp::Response;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Header lines `may_minihttp` can hold for one response.
pub const MAX_RESPONSE_HEADERS: usize = 16;

/// Headers a handler may set; one slot stays free for `Content-Type`.
pub const MAX_HANDLER_HEADERS: usize = MAX_RESPONSE_HEADERS - 1;

/// Distinct dynamic header lines kept for the life of the process.
pub const MAX_INTERNED_HEADER_LINES: usize = 1024;

/// Response headers in insertion order.
pub type HeaderVec = SmallVec<[(String, String); 8]>;

/// Transport-neutral response produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// JSON error body response for `status`.
    #[must_use]
    pub fn error(status: &Status) -> Self {
        let mut response = Self::new(status.code);
        response.set_header("Content-Type", CONTENT_TYPE_JSON);
        response.body = status.error_body().to_vec();
        response
    }

    /// Set `name`, replacing any earlier value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        set_header(&mut self.headers, name, value.into());
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

fn set_header(headers: &mut HeaderVec, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Why a header was not set on a [`ResponseWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The status has already been written
    AlreadyWritten,
    /// [`MAX_HANDLER_HEADERS`] distinct names are already set
    LimitReached,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::AlreadyWritten => write!(f, "status already written"),
            HeaderError::LimitReached => {
                write!(f, "response header limit of {MAX_HANDLER_HEADERS} reached")
            }
        }
    }
}

impl std::error::Error for HeaderError {}

/// Per-request response under construction.
///
/// Headers can be set until the status is written; the status and body are
/// written at most once.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<u16>,
    headers: HeaderVec,
    body: Vec<u8>,
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Set a header, replacing an earlier value with the same name.
    ///
    /// # Errors
    ///
    /// [`HeaderError::AlreadyWritten`] once the status is written,
    /// [`HeaderError::LimitReached`] for a new name past [`MAX_HANDLER_HEADERS`].
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> Result<(), HeaderError> {
        if self.is_written() {
            return Err(HeaderError::AlreadyWritten);
        }
        let known = self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name));
        if !known && self.headers.len() >= MAX_HANDLER_HEADERS {
            return Err(HeaderError::LimitReached);
        }
        set_header(&mut self.headers, name, value.into());
        Ok(())
    }

    /// Write status and body. Returns `false` if already written.
    pub fn write(&mut self, status: u16, content_type: Option<&str>, body: Vec<u8>) -> bool {
        if self.is_written() {
            return false;
        }
        if let Some(ct) = content_type {
            set_header(&mut self.headers, "Content-Type", ct.to_string());
        }
        self.status = Some(status);
        self.body = body;
        true
    }

    /// Finish the response; an unwritten response becomes `200` with an empty body.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status.unwrap_or(200),
            headers: self.headers,
            body: self.body,
        }
    }
}

static HEADER_LINES: Lazy<Mutex<HashMap<String, &'static str>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn static_header_line(name: &str, value: &str) -> Option<&'static str> {
    if !name.eq_ignore_ascii_case("content-type") {
        return None;
    }
    let line = match value {
        CONTENT_TYPE_JSON => "Content-Type: application/json",
        CONTENT_TYPE_TEXT => "Content-Type: text/plain; charset=utf-8",
        "text/plain" => "Content-Type: text/plain",
        "text/html" => "Content-Type: text/html",
        "text/css" => "Content-Type: text/css",
        "application/javascript" => "Content-Type: application/javascript",
        "application/octet-stream" => "Content-Type: application/octet-stream",
        "image/svg+xml" => "Content-Type: image/svg+xml",
        "image/png" => "Content-Type: image/png",
        "image/jpeg" => "Content-Type: image/jpeg",
        "image/gif" => "Content-Type: image/gif",
        "image/x-icon" => "Content-Type: image/x-icon",
        _ => return None,
    };
    Some(line)
}

/// `'static` header line for `may_minihttp`.
///
/// Lines outside the static set are interned; once
/// [`MAX_INTERNED_HEADER_LINES`] distinct lines exist, new ones are refused
/// with `None`.
fn header_line(name: &str, value: &str) -> Option<&'static str> {
    if let Some(line) = static_header_line(name, value) {
        return Some(line);
    }
    // CR/LF would split the header block.
    let line = format!("{name}: {}", value.replace(['\r', '\n'], " "));
    let mut lines = HEADER_LINES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(interned) = lines.get(&line) {
        return Some(*interned);
    }
    if lines.len() >= MAX_INTERNED_HEADER_LINES {
        return None;
    }
    let interned: &'static str = Box::leak(line.clone().into_boxed_str());
    lines.insert(line, interned);
    Some(interned)
}

/// Copy `response` onto the `may_minihttp` response.
///
/// `x-request-id` is not written. At most [`MAX_RESPONSE_HEADERS`] lines
/// are written; the rest are dropped with a warning.
pub fn write_response(res: &mut Response, response: HttpResponse) {
    res.status_code(response.status as usize, status_reason(response.status));
    let mut written = 0;
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            continue;
        }
        if written == MAX_RESPONSE_HEADERS {
            warn!(
                header = %name,
                limit = MAX_RESPONSE_HEADERS,
                "Response header dropped, transport limit reached"
            );
            continue;
        }
        match header_line(name, value) {
            Some(line) => {
                res.header(line);
                written += 1;
            }
            None => warn!(
                header = %name,
                limit = MAX_INTERNED_HEADER_LINES,
                "Response header dropped, distinct header line limit reached"
            ),
        }
    }
    res.body_vec(response.body);
}
