//! Content-type driven body parsing.
//!
//! Only the two form encodings feed the unified parameter map. Every other
//! content type leaves the body untouched for [`bind_json`] style decoding.
//!
//! [`bind_json`]: super::RequestContext::bind_json

use crate::router::HttpMethod;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Failure to interpret a body against its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Form encoding declared for a body-carrying method but no body sent
    MissingBody { content_type: String },
    /// `multipart/form-data` without a usable `boundary` parameter
    MissingBoundary,
    /// Multipart body that does not follow the declared boundary
    MalformedMultipart(String),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::MissingBody { content_type } => {
                write!(f, "missing request body for content type {content_type}")
            }
            ContentError::MissingBoundary => write!(f, "multipart body without boundary"),
            ContentError::MalformedMultipart(reason) => {
                write!(f, "malformed multipart body: {reason}")
            }
        }
    }
}

impl std::error::Error for ContentError {}

/// Body interpretation selected from the `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    UrlEncoded,
    Multipart { boundary: Option<String> },
    /// JSON or anything unrecognized; the body stays raw
    Other,
}

impl ContentKind {
    /// Classify a `Content-Type` value.
    ///
    /// The media type is compared case-insensitively; the boundary is taken
    /// verbatim with surrounding quotes removed.
    #[must_use]
    pub fn from_header(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return ContentKind::Other;
        };
        let mut parts = value.split(';');
        let media_type = parts.next().unwrap_or("").trim();

        if media_type.eq_ignore_ascii_case(FORM_URLENCODED) {
            return ContentKind::UrlEncoded;
        }
        if media_type.eq_ignore_ascii_case(MULTIPART_FORM_DATA) {
            let boundary = parts.find_map(|param| {
                let (name, value) = param.split_once('=')?;
                if !name.trim().eq_ignore_ascii_case("boundary") {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                (!value.is_empty()).then(|| value.to_string())
            });
            return ContentKind::Multipart { boundary };
        }
        ContentKind::Other
    }

    #[must_use]
    pub fn is_form(&self) -> bool {
        !matches!(self, ContentKind::Other)
    }
}

/// Reject a form-encoded request on a body-carrying method with no body.
///
/// # Errors
///
/// [`ContentError::MissingBody`] when parsing was required but impossible.
pub fn ensure_form_body(
    method: HttpMethod,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(), ContentError> {
    if method.carries_body() && body.is_empty() && ContentKind::from_header(content_type).is_form()
    {
        return Err(ContentError::MissingBody {
            content_type: content_type.unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

/// Merge an `application/x-www-form-urlencoded` body into `params`.
///
/// Later keys overwrite earlier ones, including query entries.
pub fn parse_urlencoded(body: &[u8], params: &mut HashMap<String, String>) {
    let before = params.len();
    for (k, v) in url::form_urlencoded::parse(body) {
        params.insert(k.into_owned(), v.into_owned());
    }
    debug!(
        body_size_bytes = body.len(),
        new_keys = params.len() - before,
        "URL-encoded body parsed"
    );
}

/// Merge the non-file fields of a `multipart/form-data` body into `params`.
///
/// Parts carrying a `filename` are skipped.
///
/// # Errors
///
/// [`ContentError::MissingBoundary`] or [`ContentError::MalformedMultipart`].
pub fn parse_multipart_fields(
    body: &[u8],
    boundary: Option<&str>,
    params: &mut HashMap<String, String>,
) -> Result<(), ContentError> {
    let boundary = boundary.ok_or(ContentError::MissingBoundary)?;
    if body.is_empty() {
        return Ok(());
    }

    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let first = find(body, delimiter, 0).ok_or_else(|| {
        ContentError::MalformedMultipart("opening boundary not found".to_string())
    })?;
    let mut cursor = first + delimiter.len();
    let mut fields = 0usize;

    loop {
        if body[cursor..].starts_with(b"--") {
            break;
        }
        cursor = skip_crlf(body, cursor).ok_or_else(|| {
            ContentError::MalformedMultipart("boundary not followed by CRLF".to_string())
        })?;

        let next = find(body, delimiter, cursor).ok_or_else(|| {
            ContentError::MalformedMultipart("closing boundary not found".to_string())
        })?;
        // Part content ends with the CRLF that precedes the next delimiter.
        let part_end = if next >= 2 && &body[next - 2..next] == b"\r\n" {
            next - 2
        } else {
            next
        };
        let part = body.get(cursor..part_end).unwrap_or_default();

        let header_end = find(part, b"\r\n\r\n", 0).ok_or_else(|| {
            ContentError::MalformedMultipart("part headers not terminated".to_string())
        })?;
        let headers = std::str::from_utf8(&part[..header_end]).map_err(|_| {
            ContentError::MalformedMultipart("part headers are not UTF-8".to_string())
        })?;
        let content = &part[header_end + 4..];

        if let Some((name, is_file)) = disposition(headers) {
            if !is_file {
                params.insert(name, String::from_utf8_lossy(content).into_owned());
                fields += 1;
            }
        }

        cursor = next + delimiter.len();
        if cursor >= body.len() {
            return Err(ContentError::MalformedMultipart(
                "body ends without closing boundary".to_string(),
            ));
        }
    }

    debug!(
        body_size_bytes = body.len(),
        field_count = fields,
        "Multipart body parsed"
    );
    Ok(())
}

/// `(name, is_file)` from a part's `Content-Disposition: form-data` header.
fn disposition(headers: &str) -> Option<(String, bool)> {
    let line = headers.split("\r\n").find(|line| {
        line.split_once(':')
            .is_some_and(|(k, _)| k.trim().eq_ignore_ascii_case("content-disposition"))
    })?;
    let (_, value) = line.split_once(':')?;

    let mut name = None;
    let mut is_file = false;
    for param in value.split(';').skip(1) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(val.to_string()),
            "filename" => is_file = true,
            _ => {}
        }
    }
    name.map(|n| (n, is_file))
}

fn skip_crlf(body: &[u8], at: usize) -> Option<usize> {
    body.get(at..at + 2)
        .filter(|s| *s == b"\r\n")
        .map(|_| at + 2)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
