//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops calling `listener.accept()`, so no new connections are made,
//! 2. tells every open connection to shut down: an HTTP/1 connection finishes
//!    the request it is serving and then closes (an idle keep-alive one closes
//!    at once), an HTTP/2 connection sends `GOAWAY` and drains its streams,
//! 3. waits for every connection task to end and returns from [`Server::serve`].
//!
//! A mutation in progress therefore always finishes its flush before the
//! process exits, and an idle browser tab on `/api-docs` cannot hold the
//! process open.
//!
//! # Request bodies
//!
//! Bodies are buffered in full before routing, up to [`MAX_BODY_BYTES`].
//! Anything larger is answered with `413` and never reaches a handler. The
//! oversized body is still read off the socket (and discarded) so the client
//! receives the `413` instead of a reset connection mid-upload.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::method::Method;
use crate::middleware::{cors, trace::RequestLog};
use crate::request::Request;
use crate::response::{Response, error_body};
use crate::router::Router;
use crate::status::Status;

/// Largest request body accepted, in bytes (100 KiB).
pub const MAX_BODY_BYTES: usize = 100 * 1024;

/// How much of an oversized body is read and thrown away before giving up on
/// the client and letting the connection close.
const MAX_DISCARD_BYTES: usize = 16 * 1024 * 1024;

// ── Server ────────────────────────────────────────────────────────────────────

/// The HTTP server. Owns a bound listener.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), libris::Error> {
    /// let server = libris::Server::bind("0.0.0.0:4004").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// The address actually bound; useful after binding port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains connections.
    ///
    /// Returns only after every connection has closed.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.listener.local_addr()?;

        // Shared by every connection task without copying the routing table.
        let router = Arc::new(router);

        // HTTP/1.1 or HTTP/2, whichever the client negotiates.
        let builder = ConnBuilder::new(TokioExecutor::new());

        // Every connection is registered here so that shutdown can reach
        // connections that are idle between requests, not only busy ones.
        let graceful = GracefulShutdown::new();

        // Tracks every spawned connection task so none outlives `serve`.
        let mut tasks = tokio::task::JoinSet::new();

        info!(%addr, "libris listening");

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut signal => {
                    info!(open = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);

                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(router, req).await }
                    });

                    let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
                    let conn = graceful.watch(conn);

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // No new connections from here on.
        drop(self.listener);

        // Asks each connection to close once its current request is answered,
        // then waits until all of them have.
        graceful.shutdown().await;
        while tasks.join_next().await.is_some() {}

        info!("libris stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Never fails: every problem
/// becomes a status code.
///
/// The order is fixed: method check, body collection, CORS preflight, route
/// lookup. Every response, including the error ones, gets the CORS headers
/// and one log line.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_owned();

    // Methods outside the typed set (e.g. WebDAV verbs) match no route.
    let method = match Method::try_from(req.method()) {
        Ok(m) => m,
        Err(e) => {
            debug!(%path, "{e}");
            return Ok(cors::decorate(Response::status(Status::MethodNotAllowed)).into_inner());
        }
    };

    let log = RequestLog::start(method, &path);

    let (parts, body) = req.into_parts();
    let response = match read_body(body).await {
        Ok(body) => {
            // Header values that are not visible ASCII are dropped.
            let headers = parts.headers.iter()
                .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
                .collect();
            let request = Request::new(method, path, headers, body);
            match cors::preflight(&request) {
                Some(resp) => resp,
                None => router.call(request).await,
            }
        }
        Err(resp) => resp,
    };

    let response = cors::decorate(response);
    log.finish(&response);
    Ok(response.into_inner())
}

// ── Request bodies ────────────────────────────────────────────────────────────

/// Buffers a request body of at most [`MAX_BODY_BYTES`].
///
/// Past the limit the buffer is released and the rest of the body is read
/// and discarded, up to [`MAX_DISCARD_BYTES`], before answering `413`.
async fn read_body(mut body: Incoming) -> Result<Bytes, Response> {
    let mut buf = BytesMut::new();
    let mut seen: usize = 0;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| {
            error_body(Status::BadRequest, format!("failed to read request body: {e}"))
        })?;
        // Trailers carry no payload.
        let Ok(data) = frame.into_data() else { continue };

        seen = seen.saturating_add(data.len());
        if seen <= MAX_BODY_BYTES {
            buf.extend_from_slice(&data);
        } else if seen > MAX_DISCARD_BYTES {
            break;
        } else if !buf.is_empty() {
            buf = BytesMut::new();
        }
    }

    if seen > MAX_BODY_BYTES {
        debug!(bytes = seen, "request body over limit");
        return Err(error_body(
            Status::PayloadTooLarge,
            format!("request body exceeds {MAX_BODY_BYTES} bytes"),
        ));
    }
    Ok(buf.freeze())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available.
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
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
