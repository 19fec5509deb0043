//! Unified error type.

use thiserror::Error;

/// The error type returned by the crate's fallible operations.
///
/// Configuration problems surface once, from
/// [`HeaderRewrite::new`](crate::HeaderRewrite::new). At request time the
/// rewrite itself never fails; the only runtime error is a hijack the sink
/// cannot honour.
#[derive(Debug, Error)]
pub enum Error {
    #[error("from cannot be empty")]
    EmptyFrom,

    #[error("to cannot be empty")]
    EmptyTo,

    #[error("invalid `{field}` header name: {source}")]
    InvalidHeaderName {
        field: &'static str,
        #[source]
        source: http::header::InvalidHeaderName,
    },

    #[error("failed to compile regexp: {0}")]
    InvalidRegexp(#[from] regex::Error),

    /// The real sink has no raw-connection takeover. Carries the sink's
    /// concrete type name.
    #[error("{sink} does not support hijacking")]
    HijackUnsupported { sink: &'static str },

    #[error("hijack failed: {0}")]
    Hijack(#[from] hyper::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
