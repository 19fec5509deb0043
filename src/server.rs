//! HTTP server and graceful shutdown.
//!
//! A thin host for a [`Handler`] stack. Each hyper request becomes one
//! [`Request`] with a fresh root context; the handler writes into a
//! [`ConnWriter`], whose recorded status/headers/body become the hyper
//! response. `ConnWriter` is hijackable through hyper's upgrade mechanism, so
//! WebSocket-style handlers can take the raw connection after replying `101`.
//!
//! Request bodies are read into memory up to a cap
//! ([`DEFAULT_MAX_BODY`] unless [`Server::max_body`] says otherwise); larger
//! bodies get `413 Payload Too Large` without reaching the handler.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets in-flight
//! connections finish, and returns from [`Server::serve`].

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{Hijacked, Hijacker, OnHijack, Recorder, ResponseWriter};

/// Request body cap used when [`Server::max_body`] is not called: 2 MiB.
pub const DEFAULT_MAX_BODY: usize = 2 * 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    max_body: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use trace_header::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into(), max_body: DEFAULT_MAX_BODY }
    }

    /// Largest request body, in bytes, read before answering `413`.
    pub fn max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    /// Starts accepting connections and running `handler` for every request.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let handler: BoxedHandler = Arc::new(handler);
        let max_body = self.max_body;

        info!(addr = %self.addr, max_body, "listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting even if
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move { dispatch(handler, req, max_body, remote_addr).await }
                        });

                        // Upgrades are needed for hijacking.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection_with_upgrades(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs the handler stack for one request. Never fails towards hyper.
async fn dispatch<B>(
    handler: BoxedHandler,
    mut req: hyper::Request<B>,
    max_body: usize,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let on_upgrade = hyper::upgrade::on(&mut req);
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(peer = %remote_addr, max_body, "request body over limit");
            return Ok(status_only(StatusCode::PAYLOAD_TOO_LARGE));
        }
        Err(e) => {
            warn!(peer = %remote_addr, "reading request body failed: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let request = Request::new(parts.method, parts.uri, parts.headers, body);
    let mut w = ConnWriter { recorder: Recorder::new(), on_upgrade: Some(on_upgrade) };
    handler.serve(&mut w, &request).await;

    Ok(w.recorder.into_response())
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

// ── Connection sink ───────────────────────────────────────────────────────────

/// The real sink for a served request: records the response and owns the
/// request's upgrade handle.
pub struct ConnWriter {
    recorder: Recorder,
    on_upgrade: Option<OnUpgrade>,
}

impl ResponseWriter for ConnWriter {
    fn headers(&self) -> &HeaderMap { self.recorder.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.recorder.headers_mut() }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.recorder.write(buf)
    }

    fn write_status(&mut self, status: StatusCode) {
        self.recorder.write_status(status);
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }
}

impl Hijacker for ConnWriter {
    /// Resolves after the handler has returned and hyper has sent the
    /// response, so the handler must reply `101 Switching Protocols` and
    /// await the connection from a spawned task.
    fn hijack(&mut self) -> Result<OnHijack, Error> {
        let on_upgrade = self
            .on_upgrade
            .take()
            .ok_or_else(|| io::Error::other("connection already hijacked"))?;

        Ok(Box::pin(async move {
            let upgraded = on_upgrade.await?;
            // hyper replays any bytes it read ahead through `Upgraded` itself.
            Ok::<_, Error>(Hijacked { io: Box::new(TokioIo::new(upgraded)), read_buf: Bytes::new() })
        }))
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
