//! Middleware layer.
//!
//! A router has a single middleware slot ([`Router::wrap`]). The middleware
//! sees every request before routing and every outcome after it, including
//! 404/405 responses and unrecovered handler faults.
//!
//! Built-in:
//! - [`Trace`]: per-request span with method, path, status, latency

mod trace;

pub use trace::Trace;

use futures::future::BoxFuture;

use crate::error::HandlerFault;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Wraps request dispatch.
///
/// ```rust
/// use futures::future::BoxFuture;
/// use pathwise::middleware::{Middleware, Next};
/// use pathwise::{HandlerFault, Request, Response};
///
/// struct RequestLog;
///
/// impl Middleware for RequestLog {
///     fn handle<'a>(
///         &'a self,
///         req: Request,
///         next: Next<'a>,
///     ) -> BoxFuture<'a, Result<Response, HandlerFault>> {
///         println!("request received");
///         Box::pin(next.run(req))
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, HandlerFault>>;
}

/// The rest of the dispatch: routing plus the matched handler.
pub struct Next<'a> {
    router: &'a Router,
}

impl<'a> Next<'a> {
    pub(crate) fn new(router: &'a Router) -> Self {
        Self { router }
    }

    pub async fn run(self, req: Request) -> Result<Response, HandlerFault> {
        self.router.route(req).await
    }
}
