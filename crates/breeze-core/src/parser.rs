//! HTTP/1.1 request parser
//!
//! Turns accumulated connection bytes into a [`Request`]. The entry
//! point is incremental: the dispatcher feeds it the whole read buffer
//! after every read and gets back either a complete request (plus how
//! many bytes it consumed), a signal to keep reading, or a framing
//! error that maps to `400 Bad Request`.
//!
//! Framing: `METHOD SP target SP HTTP/1.x CRLF`, `Name: value` header
//! lines, a blank line, then a body of exactly `Content-Length` bytes.
//! No `Content-Length` means no body. Chunked transfer-encoding is not
//! supported.

use crate::request::{Method, Request};
use bytes::Bytes;
use smallvec::SmallVec;
use thiserror::Error;

/// Request framing failure. Recovered locally into a 400 response;
/// never crosses the connection boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid request line")]
    InvalidRequestLine,

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("unsupported HTTP version {0:?}")]
    UnsupportedVersion(String),

    #[error("malformed header line {0:?}")]
    MalformedHeader(String),

    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),

    #[error("request head is not valid UTF-8")]
    NotUtf8,
}

/// Outcome of one parse attempt over the read buffer.
#[derive(Debug)]
pub enum ParseOutcome {
    /// The buffer does not yet hold a complete request; read more.
    Incomplete,
    /// A full request (headers plus Content-Length body) was parsed.
    Complete {
        request: Request,
        /// Bytes of the buffer the request occupied.
        consumed: usize,
    },
}

const CRLF: &str = "\r\n";
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Parse a request out of `buf`.
///
/// Pure function of the buffer contents; safe to call repeatedly as
/// bytes accumulate.
pub fn parse_request(buf: &[u8]) -> Result<ParseOutcome, ParseError> {
    let head_end = match find_terminator(buf) {
        Some(i) => i,
        None => return Ok(ParseOutcome::Incomplete),
    };
    let body_start = head_end + HEAD_TERMINATOR.len();

    let head = std::str::from_utf8(&buf[..head_end]).map_err(|_| ParseError::NotUtf8)?;
    let mut lines = head.split(CRLF);

    let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
    let (method, path, query) = parse_request_line(request_line)?;

    let mut headers: SmallVec<[(String, String); 16]> = SmallVec::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;
        if name.is_empty() || name.contains(' ') || name.contains('\t') {
            return Err(ParseError::MalformedHeader(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    // Last occurrence wins, consistent with Request::header.
    let content_length = match headers
        .iter()
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
    {
        Some((_, v)) => v
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(v.clone()))?,
        None => 0,
    };

    if buf.len() < body_start + content_length {
        return Ok(ParseOutcome::Incomplete);
    }

    let body = Bytes::copy_from_slice(&buf[body_start..body_start + content_length]);

    let mut request = Request::new(method, path);
    request.query = query;
    request.headers = headers;
    request.body = body;

    Ok(ParseOutcome::Complete {
        request,
        consumed: body_start + content_length,
    })
}

fn parse_request_line(line: &str) -> Result<(Method, String, Option<String>), ParseError> {
    let mut parts = line.split(' ');
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) => (m, t, v),
        _ => return Err(ParseError::InvalidRequestLine),
    };

    let method = Method::from_bytes(method.as_bytes())
        .ok_or_else(|| ParseError::UnknownMethod(method.to_string()))?;

    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    if !target.starts_with('/') {
        return Err(ParseError::InvalidRequestLine);
    }

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (target.to_string(), None),
    };

    Ok((method, path, query))
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
}
