//! # trace-header
//!
//! A buffered-response middleware that relays a request's trace id into a
//! response header.
//!
//! ## The problem
//!
//! Once a handler writes its first body byte, the headers are on the wire and
//! can no longer change. [`HeaderRewrite`] wants to decide on a response
//! header *after* the handler ran, so it hands the handler a
//! [`BufferedResponse`] instead of the real sink: headers stay live, status
//! and body are held back and released in one go when the middleware is done.
//!
//! ## The rule
//!
//! Given `from`, `to`, `regexp`, `replacement` and `overwrite` (see
//! [`Config`]), after the handler returns:
//!
//! - an existing non-empty `to` header is left alone unless `overwrite` is set;
//! - a missing or empty `from` request header means nothing happens;
//! - `replacement` is expanded for every match of `regexp` in the `from`
//!   value, and an empty result means nothing happens;
//! - otherwise `to` is set to the trace id found in the request
//!   [`Context`] under [`TRACE_ID_KEY`], if there is one.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trace_header::middleware::{HeaderRewrite, TraceParent};
//! use trace_header::{handler_fn, Config, ResponseWriter, Server};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trace_header::Error> {
//!     let app = handler_fn(|w, _req| {
//!         w.write_status(StatusCode::CREATED);
//!         let _ = w.write_all(b"created");
//!     });
//!
//!     let config = Config::new("x-request-id", "x-trace-id");
//!     let stack = TraceParent::new(HeaderRewrite::new("trace-header", config, app)?);
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(stack).await
//! }
//! ```

mod buffer;
mod config;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;

pub use buffer::BufferedResponse;
pub use config::{Config, DEFAULT_REGEXP, DEFAULT_REPLACEMENT};
pub use context::{Context, TRACE_ID_KEY};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler, HandlerFn, handler_fn};
pub use middleware::HeaderRewrite;
pub use request::Request;
pub use response::{Hijacked, Hijacker, Io, OnHijack, Recorder, ResponseWriter, hijack};
pub use server::{ConnWriter, DEFAULT_MAX_BODY, Server};
