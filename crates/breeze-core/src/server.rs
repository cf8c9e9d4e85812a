//! Listener: socket setup, runtime construction, and the accept loop
//!
//! [`App`] collects configuration and routes during setup, then
//! freezes the route table into an `Arc` and accepts connections until
//! the process stops. Registration is consuming-builder style, so no
//! route can be added once `run` has taken ownership.

use crate::conn::{self, Handler, HandlerFuture, Routes};
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Default listen port
pub const DEFAULT_PORT: u16 = 9877;

/// Listen backlog
const BACKLOG: i32 = 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hostname: "0.0.0.0".to_string(),
            workers: num_cpus::get(),
        }
    }
}

/// A breeze application: configuration plus the route table.
///
/// # Example
/// ```no_run
/// use breeze_core::{App, Request, Response, Result};
///
/// fn main() -> Result<()> {
///     App::new()
///         .port(8080)
///         .register("/", |_req: Request| async {
///             Ok(Response::text("hello"))
///         })?
///         .run()
/// }
/// ```
pub struct App {
    config: ServerConfig,
    routes: Routes,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            routes: Routes::new(),
        }
    }

    /// Set the listen port. Only meaningful before `run`/`serve`.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the bind address. Only meaningful before `run`/`serve`.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = hostname.into();
        self
    }

    /// Set the worker thread count used by [`App::run`].
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Compile `template` and bind it to `handler`.
    ///
    /// Fails fast on an invalid or duplicate template so a bad route is
    /// a startup error, not a runtime surprise.
    pub fn register<H, Fut>(mut self, template: &str, handler: H) -> Result<Self>
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)) as HandlerFuture);
        self.routes.register(template, handler)?;
        Ok(self)
    }

    /// Bind and serve, blocking the calling thread.
    ///
    /// Builds a multi-thread tokio runtime sized by `config.workers`
    /// and drives the accept loop on it until the process is stopped.
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.workers)
            .enable_all()
            .build()?;
        runtime.block_on(self.serve())
    }

    /// Bind and serve inside an existing runtime.
    pub async fn serve(self) -> Result<()> {
        let listener = self.listener()?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        info!(addr = %listener.local_addr()?, routes = self.routes.len(), "listening");
        accept_loop(listener, Arc::new(self.routes)).await
    }

    /// Serve on an already-bound listener (tests bind port 0 through
    /// [`App::listener`] first to learn the local address).
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> Result<()> {
        accept_loop(listener, Arc::new(self.routes)).await
    }

    /// Build the bound, listening, non-blocking socket.
    ///
    /// Any failure maps to [`Error::Bind`]; the partially-configured
    /// socket is dropped (closed) on the error path.
    pub fn listener(&self) -> Result<std::net::TcpListener> {
        let addr_str = format!("{}:{}", self.config.hostname, self.config.port);
        let addr: SocketAddr = addr_str.parse().map_err(|e| Error::Bind {
            addr: addr_str.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        bind_socket(addr).map_err(|source| Error::Bind {
            addr: addr_str,
            source,
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow rebinding an address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    // tokio's reactor requires the fd in non-blocking mode
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

async fn accept_loop(listener: tokio::net::TcpListener, routes: Arc<Routes>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) if is_fatal_accept_error(&e) => {
                warn!(error = %e, "listener broken, stopping");
                return Err(e.into());
            }
            Err(e) => {
                warn!(error = %e, "accept failed, continuing");
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        let routes = Arc::clone(&routes);
        tokio::spawn(conn::serve(stream, peer, routes));
    }
}

/// Errors that mean the listening socket itself is broken, as opposed
/// to per-connection noise (resets, file-descriptor pressure).
fn is_fatal_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotConnected | std::io::ErrorKind::InvalidInput
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn demo_app() -> App {
        App::new()
            .hostname("127.0.0.1")
            .port(0)
            .register("/users/<int>/name", |req: Request| async move {
                let id = req.param_int(0).map_err(|e| Error::handler(e.to_string()))?;
                Ok(Response::text(format!("user {id}")))
            })
            .unwrap()
            .register("/boom", |_req: Request| async {
                Err(Error::handler("exploded"))
            })
            .unwrap()
    }

    async fn spawn_app(app: App) -> SocketAddr {
        let std_listener = app.listener().unwrap();
        let addr = std_listener.local_addr().unwrap();
        let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
        tokio::spawn(app.serve_on(listener));
        addr
    }

    async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_port() {
        assert_eq!(ServerConfig::default().port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_e2e_param_route() {
        let addr = spawn_app(demo_app()).await;

        let res = roundtrip(addr, "GET /users/42/name HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(res.contains("Content-Length: 7\r\n"));
        assert!(res.ends_with("user 42"));
    }

    #[tokio::test]
    async fn test_e2e_not_found_then_listener_survives() {
        let addr = spawn_app(demo_app()).await;

        let res = roundtrip(addr, "GET /nowhere HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"));

        // A fresh connection is still served.
        let res = roundtrip(addr, "GET /users/7/name HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_e2e_handler_failure_is_500() {
        let addr = spawn_app(demo_app()).await;

        let res = roundtrip(addr, "GET /boom HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        let res = roundtrip(addr, "GET /users/7/name HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_e2e_malformed_request_is_400() {
        let addr = spawn_app(demo_app()).await;

        let res = roundtrip(addr, "GARBAGE\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        let res = roundtrip(addr, "GET /users/7/name HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_e2e_type_mismatch_path_is_404() {
        let addr = spawn_app(demo_app()).await;

        // Non-digit capture does not match the int route at all.
        let res = roundtrip(addr, "GET /users/abc/name HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_e2e_decode_overflow_is_400() {
        let addr = spawn_app(demo_app()).await;

        let res = roundtrip(
            addr,
            "GET /users/99999999999999999999/name HTTP/1.1\r\nHost: x\r\n\r\n",
        )
        .await;
        assert!(res.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_bind_error_on_occupied_port() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let app = demo_app().port(port);
        match app.listener() {
            Err(Error::Bind { addr, .. }) => assert!(addr.ends_with(&port.to_string())),
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_hostname_is_bind_error() {
        let app = demo_app().hostname("not an address");
        assert!(matches!(app.listener(), Err(Error::Bind { .. })));
    }
}
