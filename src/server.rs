//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`].

use std::borrow::Cow;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

enum Bind {
    Addr(String),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is resolved there, host names included; one
    /// that does not resolve is reported as [`Error::Addr`].
    ///
    /// ```rust,no_run
    /// use pathwise::Server;
    /// let server = Server::bind("localhost:8000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { bind: Bind::Addr(addr.into()) }
    }

    /// Serves on a listener that is already bound, e.g. to port `0`.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Listener(listener) => listener,
            Bind::Addr(addr) => TcpListener::bind(&resolve(&addr).await?[..]).await?,
        };
        let local_addr = listener.local_addr()?;

        // From here on the routing table is shared read-only by every
        // connection task.
        let router = Arc::new(router);

        info!(addr = %local_addr, "pathwise listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops accepting
                // new connections, even if more are queued.
                biased;

                () = &mut signal => {
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

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, remote_addr).await }
                        });

                        // HTTP/1.1 and HTTP/2, whichever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("pathwise stopped");
        Ok(())
    }
}

/// Resolves `host:port` through the system resolver. Binding tries the
/// results in order.
async fn resolve(addr: &str) -> Result<Vec<SocketAddr>, Error> {
    let resolved = match tokio::net::lookup_host(addr).await {
        Ok(addrs) => addrs.collect::<Vec<_>>(),
        Err(source) => return Err(Error::Addr { addr: addr.to_owned(), source }),
    };
    if resolved.is_empty() {
        return Err(Error::Addr {
            addr: addr.to_owned(),
            source: std::io::Error::other("host resolved to no addresses"),
        });
    }
    debug!(addr, ?resolved, "resolved bind address");
    Ok(resolved)
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// The error type is [`Infallible`](std::convert::Infallible): a body read
/// failure becomes `400` and an unrecovered handler fault becomes `500`, so
/// hyper never sees an error and the connection stays usable.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let mut request = Request::new(parts.method, parts.uri.path()).with_body(body);
    for (name, value) in &parts.headers {
        let text = header_text(value);
        if matches!(text, Cow::Owned(_)) {
            debug!(peer = %remote_addr, header = %name, "non-UTF-8 header value decoded lossily");
        }
        request = request.with_header(name.as_str(), text);
    }

    let response = match router.dispatch(request).await {
        Ok(res) => res,
        Err(fault) => {
            error!(peer = %remote_addr, %fault, "unrecovered handler panic");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(response.into_inner())
}

/// Header values are mostly ASCII, but obs-text bytes are legal on the
/// wire. Those are kept, with invalid UTF-8 replaced by `U+FFFD`.
fn header_text(value: &HeaderValue) -> Cow<'_, str> {
    match value.to_str() {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => String::from_utf8_lossy(value.as_bytes()),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed
/// that arm never resolves.
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
            Ok(mut term) => {
                term.recv().await;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_uses_the_system_resolver() {
        let local = resolve("localhost:8000").await.unwrap();
        assert!(local.iter().all(|a| a.port() == 8000 && a.ip().is_loopback()), "{local:?}");
        assert_eq!(
            resolve("0.0.0.0:3000").await.unwrap(),
            vec!["0.0.0.0:3000".parse::<SocketAddr>().unwrap()]
        );
        assert!(matches!(resolve("nope").await, Err(Error::Addr { .. })));
        assert!(matches!(resolve("localhost:notaport").await, Err(Error::Addr { .. })));
    }

    #[test]
    fn header_text_keeps_non_utf8_values() {
        let ascii = HeaderValue::from_static("text/plain");
        assert!(matches!(header_text(&ascii), Cow::Borrowed("text/plain")));

        let latin1 = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        assert_eq!(header_text(&latin1), "caf\u{FFFD}");

        let utf8 = HeaderValue::from_bytes("café".as_bytes()).unwrap();
        assert_eq!(header_text(&utf8), "café");
    }
}
