//! Header rewrite middleware.
//!
//! Runs the next handler against a [`BufferedResponse`], then decides whether
//! to set the configured response header before the buffer is released:
//!
//! 1. `overwrite` is off and `to` already holds a non-empty value → leave it.
//! 2. `from` is missing or empty on the request → nothing to do.
//! 3. Every non-overlapping match of `regexp` in the `from` value has
//!    `replacement` expanded against its groups; expansions are concatenated.
//! 4. An empty result (including "no match") → nothing to do.
//! 5. Otherwise `to` is set to the request's trace id from the context, if an
//!    upstream stage stored one.
//!
//! Note that the expansion from step 3 only gates step 5. The header value is
//! always the trace id, never the expanded text.

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use regex::bytes::Regex;
use tracing::{debug, warn};

use crate::buffer::BufferedResponse;
use crate::config::Config;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Relays the request's trace id into a response header, gated by a regex
/// rule over a request header.
pub struct HeaderRewrite {
    name: String,
    next: BoxedHandler,
    config: Config,
    from: HeaderName,
    to: HeaderName,
    regex: Regex,
}

impl HeaderRewrite {
    /// Validates `config` and wraps `next`.
    ///
    /// Fails if `from` or `to` is empty or not a valid header name, or if
    /// `regexp` does not compile.
    pub fn new(name: impl Into<String>, config: Config, next: impl Handler) -> Result<Self, Error> {
        if config.from.is_empty() {
            return Err(Error::EmptyFrom);
        }
        if config.to.is_empty() {
            return Err(Error::EmptyTo);
        }
        let from = header_name("from", &config.from)?;
        let to = header_name("to", &config.to)?;
        let regex = Regex::new(&config.regexp)?;

        Ok(Self { name: name.into(), next: Arc::new(next), config, from, to, regex })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn config(&self) -> &Config { &self.config }

    fn rewrite(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let existing = w.headers().get(&self.to).is_some_and(|v| !v.is_empty());
        if existing && !self.config.overwrite {
            debug!(middleware = %self.name, header = %self.to, "response header already set");
            return;
        }

        let Some(src) = req.headers().get(&self.from).filter(|v| !v.is_empty()) else {
            debug!(middleware = %self.name, header = %self.from, "source header absent");
            return;
        };

        let expanded = self.expand(src.as_bytes());
        if expanded.is_empty() {
            debug!(middleware = %self.name, "regexp produced nothing");
            return;
        }

        let Some(trace_id) = req.context().trace_id() else {
            debug!(middleware = %self.name, "no trace id in request context");
            return;
        };

        match HeaderValue::from_str(trace_id) {
            Ok(value) => {
                w.headers_mut().insert(self.to.clone(), value);
            }
            Err(e) => warn!(middleware = %self.name, trace_id, "trace id is not a valid header value: {e}"),
        }
    }

    fn expand(&self, src: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for caps in self.regex.captures_iter(src) {
            caps.expand(self.config.replacement.as_bytes(), &mut out);
        }
        out
    }
}

impl Handler for HeaderRewrite {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let mut w = BufferedResponse::new(w);
            self.next.serve(&mut w, req).await;
            self.rewrite(&mut w, req);
        })
    }
}

fn header_name(field: &'static str, value: &str) -> Result<HeaderName, Error> {
    HeaderName::from_bytes(value.as_bytes()).map_err(|source| Error::InvalidHeaderName { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;

    fn noop() -> impl Handler {
        handler_fn(|_, _| {})
    }

    fn rule(regexp: &str, replacement: &str) -> HeaderRewrite {
        let config = Config {
            regexp: regexp.to_owned(),
            replacement: replacement.to_owned(),
            ..Config::new("x-src", "x-dst")
        };
        HeaderRewrite::new("test", config, noop()).unwrap()
    }

    #[test]
    fn keeps_name_and_config() {
        let mw = rule(r"(\d+)", "<$1>");
        assert_eq!(mw.name(), "test");
        assert_eq!(mw.config().regexp, r"(\d+)");
        assert_eq!(mw.config().replacement, "<$1>");
        assert_eq!(mw.config().to, "x-dst");
    }

    #[test]
    fn rejects_empty_names() {
        let err = HeaderRewrite::new("t", Config::new("", "x-dst"), noop()).err().unwrap();
        assert!(matches!(err, Error::EmptyFrom));
        assert_eq!(err.to_string(), "from cannot be empty");

        let err = HeaderRewrite::new("t", Config::new("x-src", ""), noop()).err().unwrap();
        assert!(matches!(err, Error::EmptyTo));
    }

    #[test]
    fn rejects_bad_header_name() {
        let err = HeaderRewrite::new("t", Config::new("x src", "x-dst"), noop()).err().unwrap();
        assert!(matches!(err, Error::InvalidHeaderName { field: "from", .. }));
    }

    #[test]
    fn rejects_bad_regexp() {
        let config = Config { regexp: "(unclosed".to_owned(), ..Config::new("x-src", "x-dst") };
        let err = HeaderRewrite::new("t", config, noop()).err().unwrap();
        assert!(matches!(err, Error::InvalidRegexp(_)));
        assert!(err.to_string().starts_with("failed to compile regexp"));
    }

    #[test]
    fn default_rule_expands_whole_value_once() {
        assert_eq!(rule("^(.*)$", "$1").expand(b"foo"), b"foo");
    }

    #[test]
    fn every_match_is_expanded_in_order() {
        assert_eq!(rule(r"(\d+)", "[$1]").expand(b"a1b22c333"), b"[1][22][333]");
        assert_eq!(rule(r"(?P<k>\w+)=(?P<v>\w+)", "${v}:${k};").expand(b"a=1 b=2"), b"1:a;2:b;");
    }

    #[test]
    fn no_match_expands_to_nothing() {
        assert!(rule("^bar$", "$1").expand(b"foo").is_empty());
        assert!(rule("^(.*)$", "$9").expand(b"foo").is_empty());
    }
}
