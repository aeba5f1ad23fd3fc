use may_minihttp::Request;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Read};
use std::fmt;
use tracing::{debug, info, warn};

/// Transport-neutral view of an incoming HTTP request.
///
/// Built by the `may_minihttp` adapter ([`parse_request`]) or directly by
/// tests and embedding code, then handed to
/// [`Dispatcher::serve`](crate::dispatcher::Dispatcher::serve).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// Method token as received (any case)
    pub method: String,
    /// Request target: path plus optional `?query`
    pub target: String,
    /// Header lines in arrival order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes, empty when absent
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Path portion of the target, without query or fragment.
    #[must_use]
    pub fn path(&self) -> &str {
        let end = self
            .target
            .find(['?', '#'])
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// Query string after `?`, without the fragment.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        let start = self.target.find('?')? + 1;
        let rest = &self.target[start..];
        Some(rest.split('#').next().unwrap_or(rest))
    }

    /// Header value by case-insensitive name; the last occurrence wins.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Canonical form of a request path.
///
/// Percent-decodes the path, collapses repeated slashes, resolves `.` and
/// `..` segments (never above the root) and drops any trailing slash except
/// for the root itself.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut path = String::with_capacity(decoded.len());
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Build the header map with lower-cased names.
///
/// Repeated names resolve last-write-wins in arrival order.
#[must_use]
pub fn header_map(headers: &[(String, String)]) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Parse a URL-encoded query string.
///
/// Repeated keys resolve last-write-wins.
#[must_use]
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Why a request could not be taken off the transport.
#[derive(Debug)]
pub enum RequestError {
    /// `Content-Length` is not a decimal byte count
    InvalidContentLength(String),
    /// Declared body exceeds the limit; the body was discarded unread
    BodyTooLarge { length: usize, limit: usize },
    /// Reading the body failed
    Io(io::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidContentLength(value) => {
                write!(f, "invalid Content-Length: {value:?}")
            }
            RequestError::BodyTooLarge { length, limit } => {
                write!(f, "body of {length} bytes exceeds limit of {limit} bytes")
            }
            RequestError::Io(e) => write!(f, "failed to read request body: {e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RequestError {
    fn from(e: io::Error) -> Self {
        RequestError::Io(e)
    }
}

/// Body length declared by the first `Content-Length` header, `None` when absent.
///
/// # Errors
///
/// [`RequestError::InvalidContentLength`] when the value is not a plain
/// decimal number.
pub fn content_length(headers: &[(String, String)]) -> Result<Option<usize>, RequestError> {
    let Some((_, value)) = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
    else {
        return Ok(None);
    };
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| RequestError::InvalidContentLength(value.clone()))
}

/// Extract a [`RawRequest`] from a `may_minihttp::Request`.
///
/// The declared `Content-Length` is checked against `max_body_bytes` before
/// any body byte is buffered. An oversized body is drained from the
/// connection and discarded so the next request on it parses cleanly.
///
/// # Errors
///
/// [`RequestError::InvalidContentLength`], [`RequestError::BodyTooLarge`],
/// or [`RequestError::Io`] from reading the body.
pub fn parse_request(req: Request, max_body_bytes: usize) -> Result<RawRequest, RequestError> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let http_version = req.version();

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let size_bytes: usize = headers.iter().map(|(k, v)| k.len() + v.len()).sum();
    debug!(
        header_count = headers.len(),
        size_bytes = size_bytes,
        "Headers extracted"
    );

    // The transport panics on a malformed length, so the body is left unread.
    let length = content_length(&headers)?.unwrap_or(0);
    if length > max_body_bytes {
        warn!(
            method = %method,
            target = %target,
            body_size_bytes = length,
            max_body_bytes = max_body_bytes,
            "Request body too large, discarding"
        );
        // Dropping the reader drains the body without buffering it.
        drop(req.body());
        return Err(RequestError::BodyTooLarge {
            length,
            limit: max_body_bytes,
        });
    }

    let mut body = Vec::with_capacity(length);
    let size = req.body().take(length as u64).read_to_end(&mut body)?;
    if size > 0 {
        debug!(body_size_bytes = size, "Request body read");
    }

    info!(
        method = %method,
        target = %target,
        http_version = http_version,
        headers_count = headers.len(),
        "HTTP request parsed"
    );

    Ok(RawRequest {
        method,
        target,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_content_length() {
        assert_eq!(content_length(&headers(&[("Host", "x")])).unwrap(), None);
        assert_eq!(
            content_length(&headers(&[("content-length", "64"), ("Content-Length", "1")])).unwrap(),
            Some(64)
        );
        assert!(matches!(
            content_length(&headers(&[("Content-Length", "12abc")])),
            Err(RequestError::InvalidContentLength(v)) if v == "12abc"
        ));
        assert!(matches!(
            content_length(&headers(&[("Content-Length", "-1")])),
            Err(RequestError::InvalidContentLength(_))
        ));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//user///profile/"), "/user/profile");
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("/../../etc"), "/etc");
        assert_eq!(normalize_path("/caf%C3%A9"), "/café");
    }

    #[test]
    fn test_target_split() {
        let req = RawRequest::new("GET", "/p/q?x=1&y=2#frag");
        assert_eq!(req.path(), "/p/q");
        assert_eq!(req.query(), Some("x=1&y=2"));
        assert_eq!(RawRequest::new("GET", "/p").query(), None);
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("x=1&y=hello%20world&x=3");
        assert_eq!(q.get("x"), Some(&"3".to_string()));
        assert_eq!(q.get("y"), Some(&"hello world".to_string()));
    }

    #[test]
    fn test_header_map_lowercases_names_last_wins() {
        let headers = vec![
            ("X-Token".to_string(), "a".to_string()),
            ("x-token".to_string(), "b".to_string()),
            ("User-Agent".to_string(), "Test/1.0".to_string()),
        ];
        let map = header_map(&headers);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("x-token"), Some(&"b".to_string()));
        assert_eq!(map.get("user-agent"), Some(&"Test/1.0".to_string()));
    }
}
