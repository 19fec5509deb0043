mod common;

use std::sync::{Arc, Mutex};

use common::request;
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use trace_header::{
    BoxFuture, Config, Error, Handler, Hijacked, Hijacker, OnHijack, Recorder, Request, ResponseWriter, hijack,
    middleware::HeaderRewrite,
};

/// A sink backed by one end of an in-memory pipe.
struct PipeSink {
    headers: HeaderMap,
    conn: Option<DuplexStream>,
}

impl ResponseWriter for PipeSink {
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { Ok(buf.len()) }
    fn write_status(&mut self, _status: StatusCode) {}

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }
}

impl Hijacker for PipeSink {
    fn hijack(&mut self) -> Result<OnHijack, Error> {
        let conn = self.conn.take().ok_or_else(|| std::io::Error::other("taken"))?;
        Ok(Box::pin(async move {
            Ok::<_, Error>(Hijacked { io: Box::new(conn), read_buf: bytes::Bytes::new() })
        }))
    }
}

/// Takes over the connection and greets through it.
struct Greeter;

impl Handler for Greeter {
    fn serve<'a>(&'a self, w: &'a mut dyn ResponseWriter, _req: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let mut hijacked = hijack(w).unwrap().await.unwrap();
            hijacked.io.write_all(b"hello raw").await.unwrap();
        })
    }
}

#[tokio::test]
async fn hijack_delegates_through_buffer() {
    let (ours, mut theirs) = tokio::io::duplex(64);
    let mut sink = PipeSink { headers: HeaderMap::new(), conn: Some(ours) };
    let mw = HeaderRewrite::new("test", Config::new("x-src", "x-dst"), Greeter).unwrap();

    mw.serve(&mut sink, &request(&[], None)).await;

    let mut buf = [0u8; 9];
    theirs.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello raw");
}

#[tokio::test]
async fn hijack_unsupported_names_sink_type() {
    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    let next = trace_header::handler_fn(move |w, _req| {
        let err = hijack(w).err().unwrap();
        *slot.lock().unwrap() = Some(err.to_string());
    });
    let mw = HeaderRewrite::new("test", Config::new("x-src", "x-dst"), next).unwrap();
    let mut sink = Recorder::new();

    mw.serve(&mut sink, &request(&[], None)).await;

    let msg = seen.lock().unwrap().take().unwrap();
    assert!(msg.ends_with("Recorder does not support hijacking"), "{msg}");
}
