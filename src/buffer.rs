//! Buffering response adapter.
//!
//! Transports freeze headers the moment the first body byte goes out. A
//! middleware that wants to decide on a response header *after* the next
//! handler has run therefore has to keep that handler's status and body away
//! from the transport until it is done. [`BufferedResponse`] does exactly
//! that:
//!
//! | Operation      | Goes to                                   |
//! |----------------|-------------------------------------------|
//! | `headers_mut`  | the real sink, immediately                |
//! | `write`        | an in-memory buffer                       |
//! | `write_status` | a pending field                           |
//! | drop / `flush` | real sink: status first, then whole body  |
//! | `hijack`       | the real sink's hijacker, if it has one   |
//!
//! The flush lives in `Drop`, so it happens exactly once on every exit path,
//! including a panicking downstream handler.

use std::io;

use bytes::BytesMut;
use http::{HeaderMap, StatusCode};
use tracing::warn;

use crate::error::Error;
use crate::response::{self, Hijacker, OnHijack, ResponseWriter};

/// Holds back status and body from the wrapped sink until dropped.
pub struct BufferedResponse<'a> {
    inner: &'a mut dyn ResponseWriter,
    buf: BytesMut,
    status: StatusCode,
}

impl<'a> BufferedResponse<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, buf: BytesMut::new(), status: StatusCode::OK }
    }

    /// The status that will be sent on flush.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Bytes buffered so far.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Hands the connection to the caller if the wrapped sink allows it.
    ///
    /// Fails with [`Error::HijackUnsupported`] naming the wrapped sink's type
    /// otherwise.
    pub fn hijack(&mut self) -> Result<OnHijack, Error> {
        response::hijack(&mut *self.inner)
    }

    /// Sends status and body to the wrapped sink now. Consumes the adapter,
    /// so it cannot run twice.
    pub fn flush(self) {
        drop(self);
    }

    fn flush_inner(&mut self) {
        self.inner.write_status(self.status);
        if self.buf.is_empty() {
            return;
        }
        let body = self.buf.split().freeze();
        if let Err(e) = self.inner.write_all(&body) {
            warn!(sink = self.inner.type_name(), len = body.len(), "flushing buffered body failed: {e}");
        }
    }
}

impl Drop for BufferedResponse<'_> {
    fn drop(&mut self) {
        self.flush_inner();
    }
}

impl ResponseWriter for BufferedResponse<'_> {
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        self.inner.hijacker()
    }

    /// The adapter is transparent; capability errors name the wrapped sink.
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Recorder;

    #[test]
    fn nothing_reaches_sink_before_drop() {
        let mut rec = Recorder::new();
        {
            let mut w = BufferedResponse::new(&mut rec);
            w.write_status(StatusCode::ACCEPTED);
            w.write_all(b"queued").unwrap();
            w.headers_mut().insert("x-early", "yes".parse().unwrap());
            assert_eq!(w.buffered(), b"queued");
            assert_eq!(w.status(), StatusCode::ACCEPTED);
        }
        assert_eq!(rec.status(), StatusCode::ACCEPTED);
        assert_eq!(rec.body(), b"queued");
        assert_eq!(rec.headers()["x-early"], "yes");
    }

    #[test]
    fn last_status_wins_inside_buffer() {
        let mut rec = Recorder::new();
        let mut w = BufferedResponse::new(&mut rec);
        w.write_status(StatusCode::NOT_FOUND);
        w.write_status(StatusCode::NO_CONTENT);
        w.flush();
        assert_eq!(rec.status(), StatusCode::NO_CONTENT);
        assert!(rec.body().is_empty());
    }

    #[test]
    fn flushes_when_writer_panics() {
        let mut rec = Recorder::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut w = BufferedResponse::new(&mut rec);
            w.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            w.write_all(b"partial").unwrap();
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(rec.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.body(), b"partial");
    }

    #[test]
    fn hijack_error_names_wrapped_sink() {
        let mut rec = Recorder::new();
        let mut w = BufferedResponse::new(&mut rec);
        match w.hijack() {
            Err(Error::HijackUnsupported { sink }) => assert!(sink.ends_with("response::Recorder"), "{sink}"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("recorder must not be hijackable"),
        }
    }
}
