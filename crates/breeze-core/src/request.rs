//! HTTP Request types

use breeze_router::{ParamError, ParamKind, ParamValue};
use smallvec::SmallVec;

/// HTTP Methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Parse from raw request-line bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Method::Get),
            b"POST" => Some(Method::Post),
            b"PUT" => Some(Method::Put),
            b"DELETE" => Some(Method::Delete),
            b"PATCH" => Some(Method::Patch),
            b"HEAD" => Some(Method::Head),
            b"OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP Request
///
/// Built by the parser from raw connection bytes; `params` is empty
/// until the route table has matched the path, after which it holds the
/// decoded captures in template order.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Request headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body
    pub body: bytes::Bytes,
    /// Decoded route parameters, aligned with the matched route's
    /// declared kinds
    pub params: Vec<ParamValue>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
            params: Vec::new(),
        }
    }

    /// Get a header value (case-insensitive).
    ///
    /// Duplicate header names are last-write-wins, so the scan runs
    /// from the end.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-length header
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// Number of decoded route parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Route parameter `index` as an integer.
    pub fn param_int(&self, index: usize) -> std::result::Result<i64, ParamError> {
        match self.param(index)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(ParamError::TypeMismatch {
                index,
                expected: ParamKind::Int,
                found: other.kind(),
            }),
        }
    }

    /// Route parameter `index` as text.
    pub fn param_text(&self, index: usize) -> std::result::Result<&str, ParamError> {
        match self.param(index)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(ParamError::TypeMismatch {
                index,
                expected: ParamKind::Text,
                found: other.kind(),
            }),
        }
    }

    fn param(&self, index: usize) -> std::result::Result<&ParamValue, ParamError> {
        self.params.get(index).ok_or(ParamError::OutOfRange {
            index,
            len: self.params.len(),
        })
    }
}

/// Builder for constructing requests (mostly for tests and handlers
/// that synthesize sub-requests)
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    pub fn params(mut self, params: Vec<ParamValue>) -> Self {
        self.request.params = params;
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_bytes() {
        assert_eq!(Method::from_bytes(b"GET"), Some(Method::Get));
        assert_eq!(Method::from_bytes(b"DELETE"), Some(Method::Delete));
        assert_eq!(Method::from_bytes(b"BOGUS"), None);
        // Methods are case-sensitive on the wire
        assert_eq!(Method::from_bytes(b"get"), None);
    }

    #[test]
    fn test_header_case_insensitive() {
        let req = RequestBuilder::new(Method::Get, "/")
            .header("Content-Type", "application/json")
            .build();

        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let req = RequestBuilder::new(Method::Get, "/")
            .header("X-Tag", "first")
            .header("x-tag", "second")
            .build();

        assert_eq!(req.header("x-tag"), Some("second"));
    }

    #[test]
    fn test_typed_param_access() {
        let req = RequestBuilder::new(Method::Get, "/users/42/posts/intro")
            .params(vec![ParamValue::Int(42), ParamValue::Text("intro".to_string())])
            .build();

        assert_eq!(req.param_int(0).unwrap(), 42);
        assert_eq!(req.param_text(1).unwrap(), "intro");
    }

    #[test]
    fn test_param_type_mismatch() {
        let req = RequestBuilder::new(Method::Get, "/users/42")
            .params(vec![ParamValue::Int(42)])
            .build();

        assert!(matches!(
            req.param_text(0).unwrap_err(),
            ParamError::TypeMismatch { index: 0, .. }
        ));
    }

    #[test]
    fn test_param_index_out_of_range() {
        let req = RequestBuilder::new(Method::Get, "/").build();
        assert!(matches!(
            req.param_int(3).unwrap_err(),
            ParamError::OutOfRange { index: 3, len: 0 }
        ));
    }
}
