//! Shared sinks and request builders for the integration tests.

#![allow(dead_code)]

use std::io;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use trace_header::{Request, ResponseWriter, TRACE_ID_KEY};

pub const TRACE: &str = "abc-123";

/// What reached the sink, in order.
#[derive(Debug, PartialEq)]
pub enum Event {
    Status(StatusCode),
    Body(Vec<u8>),
}

/// A sink that logs every status and body write, and snapshots the headers
/// at the first body write.
#[derive(Debug, Default)]
pub struct EventSink {
    pub headers: HeaderMap,
    pub events: Vec<Event>,
    pub headers_at_body: Option<HeaderMap>,
}

impl EventSink {
    pub fn with_header(name: &'static str, value: &'static str) -> Self {
        let mut sink = Self::default();
        sink.headers.insert(name, value.parse().unwrap());
        sink
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }
}

impl ResponseWriter for EventSink {
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.headers_at_body.is_none() {
            self.headers_at_body = Some(self.headers.clone());
        }
        self.events.push(Event::Body(buf.to_vec()));
        Ok(buf.len())
    }

    fn write_status(&mut self, status: StatusCode) {
        self.events.push(Event::Status(status));
    }
}

/// A GET request carrying `headers`, with `trace` stored in its context.
pub fn request(headers: &[(&'static str, &'static str)], trace: Option<&str>) -> Request {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(*name, value.parse().unwrap());
    }
    let req = Request::new(Method::GET, Uri::from_static("/"), map, Bytes::new());
    match trace {
        Some(id) => req.with_context(|ctx| {
            ctx.insert(TRACE_ID_KEY, id.to_owned());
        }),
        None => req,
    }
}
