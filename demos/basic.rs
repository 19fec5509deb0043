//! Minimal trace-header example: a handler stack behind the built-in server.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/ \
//!        -H 'x-request-id: req-42' \
//!        -H 'traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01'
//!
//! The response carries `x-trace-id: 4bf92f3577b34da6a3ce929d0e0e4736`.
//! Drop either request header and the response header disappears.

use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use trace_header::middleware::{HeaderRewrite, TraceParent};
use trace_header::{Config, Request, ResponseWriter, Server, handler_fn};

#[tokio::main]
async fn main() -> Result<(), trace_header::Error> {
    tracing_subscriber::fmt::init();

    let config = Config {
        regexp: r"^req-(\d+)$".to_owned(),
        ..Config::new("x-request-id", "x-trace-id")
    };
    let rewrite = HeaderRewrite::new("trace-header", config, handler_fn(hello))?;

    Server::bind(([0, 0, 0, 0], 3000))
        .serve(TraceParent::new(rewrite))
        .await
}

// The body goes out before the middleware touches headers; buffering makes
// that fine.
fn hello(w: &mut dyn ResponseWriter, req: &Request) {
    w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    w.write_status(StatusCode::OK);
    let _ = w.write_all(format!("hello from {}\n", req.path()).as_bytes());
}
