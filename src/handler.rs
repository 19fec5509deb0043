//! Handler trait and type erasure.
//!
//! # Why handlers return a boxed future
//!
//! A handler borrows both the response sink and the request for as long as
//! it runs. Async trait methods with borrowed arguments are not object-safe,
//! so the trait spells the future out explicitly as a [`BoxFuture`] tied to
//! those borrows. Middleware stores the next stage as a [`BoxedHandler`]
//! (`Arc<dyn Handler>`) and calls through one vtable dispatch per request:
//!
//! ```text
//! Server ──serve(&mut ConnWriter, &req)──▶ TraceParent
//!        ──serve(&mut ConnWriter, &child)──▶ HeaderRewrite
//!        ──serve(&mut BufferedResponse, &child)──▶ app
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;

/// A heap-allocated, type-erased future borrowing from the call site.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// One processing stage: writes a response for a request into a sink.
///
/// Implement this for middleware and for handlers that need to await
/// something. Synchronous handlers are easier to write with [`handler_fn`].
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        (**self).serve(w, req)
    }
}

/// Wraps a synchronous closure as a [`Handler`].
///
/// ```rust
/// use trace_header::{handler_fn, ResponseWriter};
///
/// let hello = handler_fn(|w, _req| {
///     let _ = w.write_all(b"hello");
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    HandlerFn(f)
}

/// Handler returned by [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move { (self.0)(w, req) })
    }
}
