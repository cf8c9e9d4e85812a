//! Minimal breeze application.
//!
//! Run with `cargo run --example hello`, then:
//!
//! ```text
//! curl http://127.0.0.1:9877/
//! curl http://127.0.0.1:9877/users/42/posts/hello-world
//! ```

use breeze_core::{App, Error, Request, Response, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    App::new()
        .register("/", |_req: Request| async {
            Ok(Response::text("hello from breeze"))
        })?
        .register("/users/<int>/posts/<string>", |req: Request| async move {
            let user = req.param_int(0).map_err(|e| Error::handler(e.to_string()))?;
            let slug = req.param_text(1).map_err(|e| Error::handler(e.to_string()))?;
            Ok(Response::text(format!("user {user}, post {slug}")))
        })?
        .run()
}
