use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{Instrument, error, info, info_span};

use super::{Middleware, Next};
use crate::error::HandlerFault;
use crate::request::Request;
use crate::response::Response;

/// Logs each request inside an `info`-level `request` span.
///
/// Emits `request received` on entry and `request completed` with the
/// status and latency on exit. A fault that no panic handler recovered is
/// logged at `error` and passed through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle<'a>(
        &'a self,
        req: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, HandlerFault>> {
        let span = info_span!("request", method = %req.method(), path = req.path());
        Box::pin(
            async move {
                let started = Instant::now();
                info!("request received");
                let result = next.run(req).await;
                let latency_us = started.elapsed().as_micros() as u64;
                match &result {
                    Ok(res) => info!(status = res.status_code().as_u16(), latency_us, "request completed"),
                    Err(fault) => error!(%fault, latency_us, "request failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}
