//! Options for the [`HeaderRewrite`](crate::HeaderRewrite) middleware.
//!
//! Field names match the options bundle hosts already write in JSON or TOML:
//!
//! ```json
//! { "from": "X-Request-Id", "to": "X-Trace-Id", "overwrite": true }
//! ```
//!
//! Omitted fields take their defaults: `regexp = "^(.*)$"`,
//! `replacement = "$1"`, `overwrite = false`. `from` and `to` have no useful
//! default and are rejected as empty when the middleware is built.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REGEXP: &str = "^(.*)$";
pub const DEFAULT_REPLACEMENT: &str = "$1";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Request header to read.
    pub from: String,

    /// Response header to set.
    pub to: String,

    /// Pattern run over the `from` value. Every non-overlapping match counts.
    pub regexp: String,

    /// Template expanded once per match; `$1`, `${name}` refer to groups.
    pub replacement: String,

    /// Replace a `to` header the downstream handler already set.
    pub overwrite: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            regexp: DEFAULT_REGEXP.to_owned(),
            replacement: DEFAULT_REPLACEMENT.to_owned(),
            overwrite: false,
        }
    }
}

impl Config {
    /// Config copying `from` into `to` with the default identity rule.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), ..Self::default() }
    }
}
