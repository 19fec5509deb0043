//! W3C `traceparent` propagation.
//!
//! Stores the trace-id field of a valid `traceparent` request header in the
//! request context under [`TRACE_ID_KEY`], for later stages such as
//! [`HeaderRewrite`](super::HeaderRewrite) to pick up.
//!
//! Header format (Trace Context, level 1):
//!
//! ```text
//! 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//! ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^ ^^
//! version        trace-id              parent-id      flags
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::context::TRACE_ID_KEY;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

pub const TRACEPARENT: &str = "traceparent";

/// Puts the inbound trace id into the request context, then calls `next`.
pub struct TraceParent {
    next: BoxedHandler,
}

impl TraceParent {
    pub fn new(next: impl Handler) -> Self {
        Self { next: Arc::new(next) }
    }
}

impl Handler for TraceParent {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let raw = req.header(TRACEPARENT);
            debug!(traceparent = raw.unwrap_or_default(), path = req.path(), "incoming request");

            match raw.and_then(trace_id) {
                Some(id) => {
                    let id = id.to_owned();
                    let req = req.with_context(|ctx| {
                        ctx.insert(TRACE_ID_KEY, id);
                    });
                    debug!(context = ?req.context(), "trace id layered into context");
                    self.next.serve(w, &req).await;
                }
                None => self.next.serve(w, req).await,
            }
        })
    }
}

/// Extracts the trace-id field from a `traceparent` value.
///
/// Returns `None` for anything malformed: wrong field widths, uppercase or
/// non-hex digits, the reserved version `ff`, all-zero ids, or extra fields
/// on a version `00` header.
pub fn trace_id(traceparent: &str) -> Option<&str> {
    let mut fields = traceparent.trim().split('-');
    let version = fields.next()?;
    let trace_id = fields.next()?;
    let parent_id = fields.next()?;
    let flags = fields.next()?;
    let extra = fields.next().is_some();

    let valid = is_hex(version, 2)
        && version != "ff"
        && is_hex(trace_id, 32)
        && !is_zero(trace_id)
        && is_hex(parent_id, 16)
        && !is_zero(parent_id)
        && is_hex(flags, 2)
        && !(extra && version == "00");

    valid.then_some(trace_id)
}

fn is_hex(field: &str, len: usize) -> bool {
    field.len() == len && field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_zero(field: &str) -> bool {
    field.bytes().all(|b| b == b'0')
}
