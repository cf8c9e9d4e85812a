//! Connection dispatcher
//!
//! One task per accepted connection, driven through a fixed sequence:
//! read until a full request is buffered, match it against the route
//! table, invoke the handler, write the serialized response, close.
//!
//! Every request-scoped failure is converted to a response here (parse
//! error and capture decode error to 400, no route to 404, handler
//! error to 500); nothing propagates back to the accept loop. The
//! connection is closed after one exchange; keep-alive negotiation is
//! an extension point, not implemented in this core.

use crate::error::Result;
use crate::parser::{self, ParseOutcome};
use crate::request::Request;
use crate::response::Response;
use breeze_router::RouteTable;
use bytes::BytesMut;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

/// Boxed future a handler returns
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

/// Route handler: takes ownership of the request, must not block the
/// reactor, and may fail (the dispatcher substitutes a 500).
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

/// Route table bound to handlers
pub type Routes = RouteTable<Handler>;

const READ_CHUNK: usize = 8 * 1024;

/// Cap on buffered request bytes before giving up with a 400.
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Drive one connection from accept to close.
pub async fn serve(mut stream: TcpStream, peer: SocketAddr, routes: Arc<Routes>) {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    // Reading: accumulate until the parser has a full request.
    let request = loop {
        match parser::parse_request(&buf) {
            Ok(ParseOutcome::Complete { request, .. }) => break request,
            Ok(ParseOutcome::Incomplete) => {
                if buf.len() > MAX_REQUEST_BYTES {
                    warn!(%peer, buffered = buf.len(), "request too large");
                    write_and_close(&mut stream, peer, Response::bad_request("Bad Request")).await;
                    return;
                }
                match stream.read_buf(&mut buf).await {
                    Ok(0) => {
                        debug!(%peer, "peer closed before a full request");
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(%peer, error = %e, "read failed");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "malformed request");
                write_and_close(&mut stream, peer, Response::bad_request("Bad Request")).await;
                return;
            }
        }
    };

    debug!(%peer, method = %request.method, path = %request.path, "dispatching");
    let response = respond(&routes, request).await;
    write_and_close(&mut stream, peer, response).await;
}

/// Matching and Handling: look the path up, attach decoded params,
/// invoke the handler, and map every failure mode to a response.
pub async fn respond(routes: &Routes, mut request: Request) -> Response {
    let (handler, params) = match routes.lookup(&request.path) {
        Err(e) => {
            warn!(path = %request.path, error = %e, "capture decode failed");
            return Response::bad_request("Bad Request");
        }
        Ok(None) => {
            debug!(path = %request.path, "no matching route");
            return Response::not_found();
        }
        Ok(Some(found)) => (Arc::clone(found.value), found.params),
    };

    request.params = params;
    match handler(request).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "handler failed");
            Response::internal_error("Internal Server Error")
        }
    }
}

async fn write_and_close(stream: &mut TcpStream, peer: SocketAddr, response: Response) {
    let bytes = response.to_http1_bytes();
    if let Err(e) = stream.write_all(&bytes).await {
        debug!(%peer, error = %e, "write failed");
        return;
    }
    let _ = stream.shutdown().await;
}
