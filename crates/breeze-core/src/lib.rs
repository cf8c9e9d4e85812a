//! breeze-core: minimal HTTP/1.1 server core
//!
//! Request/response models, an incremental request parser, a
//! per-connection dispatcher, and a tokio-based listener, all routed
//! through the path templates of `breeze-router`.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod conn;
pub mod error;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;

// Re-exports
pub use conn::{Handler, HandlerFuture, Routes};
pub use error::{Error, Result};
pub use parser::{ParseError, ParseOutcome};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use server::{App, ServerConfig, DEFAULT_PORT};

pub use breeze_router::{
    CompiledRoute, DecodeError, ParamError, ParamKind, ParamValue, RouteMatch, RouteTable,
    TemplateError,
};
