//! Response sinks.
//!
//! A handler never builds a response value and returns it. It is handed a
//! [`ResponseWriter`] and pushes status, headers and body bytes into it. This
//! is what lets a middleware slip a buffering adapter between a handler and
//! the real sink (see [`BufferedResponse`](crate::BufferedResponse)).
//!
//! Raw-connection takeover is an *optional* capability: a sink advertises it
//! by returning `Some` from [`ResponseWriter::hijacker`]. Sinks that cannot
//! support it (pure in-memory ones, for instance) simply keep the default.

use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use crate::error::Error;

// ── Sink traits ───────────────────────────────────────────────────────────────

/// The destination for a response's status, headers and body.
pub trait ResponseWriter: Send {
    /// The live header map. Mutations are visible to the sink immediately.
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Sets the response status. Sinks that talk to a transport send it at
    /// most once; callers must not rely on a second call doing anything.
    fn write_status(&mut self, status: StatusCode);

    /// The hijack capability, if this sink has one.
    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    /// Concrete type name, used in capability errors.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Writes all of `buf`, looping over short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

/// Takes over the underlying connection, bypassing the HTTP response.
pub trait Hijacker: Send {
    /// Starts the takeover. The returned future resolves once the connection
    /// has been released by the HTTP layer.
    fn hijack(&mut self) -> Result<OnHijack, Error>;
}

/// Any bidirectional byte stream.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

/// A connection taken over from the HTTP layer.
pub struct Hijacked {
    /// The raw connection.
    pub io: Box<dyn Io>,
    /// Bytes the HTTP layer had already read past the request head. Consume
    /// these before reading from `io`.
    pub read_buf: Bytes,
}

/// Future returned by [`Hijacker::hijack`].
pub type OnHijack = Pin<Box<dyn Future<Output = Result<Hijacked, Error>> + Send + 'static>>;

/// Calls `w`'s hijack capability, or fails naming the sink's concrete type.
pub fn hijack(w: &mut dyn ResponseWriter) -> Result<OnHijack, Error> {
    let sink = w.type_name();
    match w.hijacker() {
        Some(h) => h.hijack(),
        None => Err(Error::HijackUnsupported { sink }),
    }
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// In-memory sink. Records whatever is written to it and can be turned into
/// a hyper response afterwards. It has no connection, so it cannot be
/// hijacked.
#[derive(Debug, Default)]
pub struct Recorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded status, `200 OK` if none was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(prev) => warn!(%prev, ignored = %status, "superfluous write_status call"),
            None => self.status = Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_first_status() {
        let mut rec = Recorder::new();
        rec.write_status(StatusCode::CREATED);
        rec.write_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(rec.status(), StatusCode::CREATED);
    }

    #[test]
    fn write_implies_ok() {
        let mut rec = Recorder::new();
        rec.write_all(b"hi").unwrap();
        rec.write_status(StatusCode::NOT_FOUND);

        let res = rec.into_response();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn recorder_cannot_be_hijacked() {
        let mut rec = Recorder::new();
        let err = hijack(&mut rec).err().unwrap();
        assert!(matches!(err, Error::HijackUnsupported { sink } if sink.ends_with("Recorder")));
        assert!(err.to_string().contains("Recorder does not support hijacking"));
    }
}
