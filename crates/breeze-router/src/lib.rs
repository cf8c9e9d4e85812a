//! breeze-router: typed path-template compiler and route table
//!
//! Compiles route templates with typed placeholders into positional
//! matchers and looks paths up against an ordered table of them.
//!
//! ## Template Syntax
//! - Literal segments match verbatim: `/users`, `/api/health`
//! - `<int>` captures one segment of decimal digits, decoded to `i64`
//! - `<string>` (or any other type name) captures one opaque segment
//! - `/` is the zero-segment template and matches only the root path
//!
//! ## Matching
//! Routes are scanned in registration order and the first pattern that
//! accepts the whole path wins, even when a later route would also
//! accept it. Registering two templates with an identical
//! literal/placeholder shape is rejected up front.
//!
//! ## Example
//! ```
//! use breeze_router::{ParamValue, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.register("/users/<int>/posts/<string>", 7).unwrap();
//!
//! let found = table.lookup("/users/42/posts/intro").unwrap().unwrap();
//! assert_eq!(*found.value, 7);
//! assert_eq!(found.params[0], ParamValue::Int(42));
//! assert_eq!(found.params[1], ParamValue::Text("intro".to_string()));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

use thiserror::Error;

/// Template compilation failure. Registration-time only; a process
/// should treat this as fatal configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template string was empty.
    #[error("route template is empty")]
    Empty,

    /// Template did not start at the root.
    #[error("route template {0:?} must start with '/'")]
    NotAbsolute(String),

    /// A segment opened a placeholder without closing it, or used
    /// `<`/`>` outside a well-formed placeholder.
    #[error("malformed placeholder in segment {0:?}")]
    MalformedPlaceholder(String),

    /// A placeholder had no type name (`<>`).
    #[error("empty placeholder type in template")]
    EmptyPlaceholder,

    /// A template with the same literal/placeholder shape is already
    /// registered.
    #[error("route template {0:?} duplicates an existing route")]
    Duplicate(String),
}

/// Capture decode failure: the path segment matched the coarse pattern
/// but could not be converted to the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Digits matched but the value does not fit in an `i64`.
    #[error("integer capture {0:?} out of range")]
    IntOutOfRange(String),
}

/// Typed access failure on decoded parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Parameter exists but holds a different type.
    #[error("param {index} is {found}, not {expected}")]
    TypeMismatch {
        index: usize,
        expected: ParamKind,
        found: ParamKind,
    },

    /// Index past the end of the decoded parameter list.
    #[error("param index {index} out of range (route has {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Declared type of one placeholder, in template order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `<int>`: one-or-more decimal digits, decoded to `i64`.
    Int,
    /// Any other type name: one-or-more non-`/` characters, kept as text.
    Text,
}

impl ParamKind {
    fn from_name(name: &str) -> Self {
        match name {
            "int" => ParamKind::Int,
            _ => ParamKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Text => "text",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded value of one capture. Tagged so mismatched access is a
/// checked error instead of a cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }
}

/// One compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(ParamKind),
}

/// A compiled route template: positional matcher plus the ordered list
/// of declared parameter kinds.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    template: String,
    segments: Vec<Segment>,
    kinds: Vec<ParamKind>,
}

impl CompiledRoute {
    /// Compile a template string.
    ///
    /// Splits on `/` and drops empty segments, so `/users` and
    /// `/users/` compile identically and `/` is the zero-segment root
    /// template. Pure function of the input.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        if template.is_empty() {
            return Err(TemplateError::Empty);
        }
        if !template.starts_with('/') {
            return Err(TemplateError::NotAbsolute(template.to_string()));
        }

        let mut segments = Vec::new();
        let mut kinds = Vec::new();

        for part in template.split('/').filter(|s| !s.is_empty()) {
            if let Some(inner) = part.strip_prefix('<') {
                let name = inner
                    .strip_suffix('>')
                    .ok_or_else(|| TemplateError::MalformedPlaceholder(part.to_string()))?;
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder);
                }
                if name.contains('<') || name.contains('>') {
                    return Err(TemplateError::MalformedPlaceholder(part.to_string()));
                }
                let kind = ParamKind::from_name(name);
                segments.push(Segment::Param(kind));
                kinds.push(kind);
            } else if part.contains('<') || part.contains('>') {
                return Err(TemplateError::MalformedPlaceholder(part.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            kinds,
        })
    }

    /// The source template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Declared parameter kinds, one per placeholder in template order.
    pub fn param_kinds(&self) -> &[ParamKind] {
        &self.kinds
    }

    /// Match a concrete path against this route, anchored to the whole
    /// path.
    ///
    /// Returns `None` when the pattern rejects the path, and
    /// `Some(Err(_))` when the pattern accepted but a capture could not
    /// be decoded into its declared type.
    pub fn matches(&self, path: &str) -> Option<Result<Vec<ParamValue>, DecodeError>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::with_capacity(self.kinds.len());
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(ParamKind::Int) => {
                    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                        return None;
                    }
                    match part.parse::<i64>() {
                        Ok(v) => params.push(ParamValue::Int(v)),
                        Err(_) => {
                            return Some(Err(DecodeError::IntOutOfRange(part.to_string())))
                        }
                    }
                }
                Segment::Param(ParamKind::Text) => {
                    params.push(ParamValue::Text(part.to_string()));
                }
            }
        }

        Some(Ok(params))
    }

    /// Structural identity: same literal/placeholder shape, including
    /// declared kinds.
    fn same_shape(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

/// A successful lookup: the registered value plus decoded captures,
/// aligned with the route's declared parameter kinds.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub route: &'a CompiledRoute,
    pub value: &'a T,
    pub params: Vec<ParamValue>,
}

/// Ordered collection of compiled routes.
///
/// Insertion order is registration order and lookup returns the first
/// accepting route. The table is meant to be fully populated during
/// setup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct RouteTable<T> {
    routes: Vec<(CompiledRoute, T)>,
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile `template` and append it bound to `value`.
    ///
    /// Rejects templates structurally identical to one already
    /// registered; distinct-but-overlapping templates are allowed and
    /// resolved first-registered-wins at lookup.
    pub fn register(&mut self, template: &str, value: T) -> Result<(), TemplateError> {
        let compiled = CompiledRoute::compile(template)?;
        if self.routes.iter().any(|(r, _)| r.same_shape(&compiled)) {
            return Err(TemplateError::Duplicate(template.to_string()));
        }
        self.routes.push((compiled, value));
        Ok(())
    }

    /// Scan routes in registration order for the first accepting
    /// pattern.
    ///
    /// `Ok(None)` means no route accepts the path. A decode failure on
    /// the accepting route is an error, not a fall-through to later
    /// routes.
    pub fn lookup(&self, path: &str) -> Result<Option<RouteMatch<'_, T>>, DecodeError> {
        for (route, value) in &self.routes {
            if let Some(decoded) = route.matches(path) {
                let params = decoded?;
                return Ok(Some(RouteMatch {
                    route,
                    value,
                    params,
                }));
            }
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(r, _)| r.template())
    }
}
