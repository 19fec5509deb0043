//! Incoming HTTP request type.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::context::Context;

/// An incoming HTTP request, plus its execution [`Context`].
///
/// Cloning is cheap: the body is reference-counted [`Bytes`] and the context
/// is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) context: Arc<Context>,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, uri, headers, body, context: Arc::new(Context::new()) }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn context(&self) -> &Context { &self.context }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent; use [`headers`](Self::headers) for raw bytes.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a copy of this request whose context is a fresh layer over the
    /// current one, populated by `fill`.
    pub fn with_context(&self, fill: impl FnOnce(&mut Context)) -> Self {
        let mut layer = Context::with_parent(Arc::clone(&self.context));
        fill(&mut layer);
        Self { context: Arc::new(layer), ..self.clone() }
    }

    /// Replaces the root context. Intended for hosts that seed values before
    /// the first middleware runs.
    pub fn set_context(&mut self, context: Context) {
        self.context = Arc::new(context);
    }
}
