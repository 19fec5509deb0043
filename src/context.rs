//! Per-request execution context.
//!
//! A [`Context`] is a small layered key/value store. Each layer owns its own
//! entries and optionally points at a parent; lookups check the local layer
//! first and fall back to the parent chain. Middleware that wants to attach
//! data derives a child layer instead of mutating the one it was handed:
//!
//! ```text
//! root (server)            ← empty, created per request
//!   └── child (TraceParent) ← "tracing.traceID" = "4bf92f35…"
//!         └── lookups from HeaderRewrite walk upward
//! ```
//!
//! Every request owns an independent chain. Nothing here is global.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Key under which the upstream tracing stage stores the request's trace id.
pub const TRACE_ID_KEY: &str = "tracing.traceID";

type Value = Box<dyn Any + Send + Sync>;

/// Layered, request-scoped key/value store.
#[derive(Default)]
pub struct Context {
    values: HashMap<&'static str, Value>,
    parent: Option<Arc<Context>>,
}

impl Context {
    /// An empty root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty layer on top of `parent`.
    pub fn with_parent(parent: Arc<Context>) -> Self {
        Self { values: HashMap::new(), parent: Some(parent) }
    }

    /// Stores `value` under `key` in this layer, shadowing any parent entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) -> &mut Self {
        self.values.insert(key, Box::new(value));
        self
    }

    /// Untyped lookup: local layer first, then the parent chain.
    pub fn value(&self, key: &str) -> Option<&(dyn Any + Send + Sync)> {
        match self.values.get(key) {
            Some(v) => Some(&**v),
            None => self.parent.as_deref()?.value(key),
        }
    }

    /// Typed lookup. Returns `None` when the key is missing *or* holds a
    /// value of another type; the two cases are not told apart.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.value(key)?.downcast_ref::<T>()
    }

    /// The request's trace id, if an upstream stage stored one as a `String`.
    pub fn trace_id(&self) -> Option<&str> {
        self.get::<String>(TRACE_ID_KEY).map(String::as_str)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("keys", &keys)
            .field("parent", &self.parent)
            .finish()
    }
}
