//! Middleware layer.
//!
//! Each middleware is a [`Handler`](crate::Handler) that owns the next stage
//! and decides what the next stage sees. They compose by nesting:
//!
//! ```rust
//! use trace_header::middleware::{HeaderRewrite, TraceParent};
//! use trace_header::{handler_fn, Config, ResponseWriter};
//!
//! let app = handler_fn(|w, _req| { let _ = w.write_all(b"ok"); });
//! let rewrite = HeaderRewrite::new("trace-header", Config::new("x-request-id", "x-trace-id"), app)?;
//! let stack = TraceParent::new(rewrite);
//! # Ok::<(), trace_header::Error>(())
//! ```
//!
//! - [`TraceParent`]: puts the W3C trace id into the request context
//! - [`HeaderRewrite`]: buffers the response and relays the trace id into a
//!   response header when the configured request header matches

mod rewrite;
mod traceparent;

pub use rewrite::HeaderRewrite;
pub use traceparent::{TRACEPARENT, TraceParent, trace_id};
