use std::time::Instant;

use tracing::{field, info, info_span};

use super::core::Middleware;
use crate::dispatcher::{DispatchError, Next};
use crate::server::{Request, Response};

/// Wraps the rest of the chain in a `request` span and logs completion.
///
/// Events emitted by later middleware and the handler carry the span's
/// `request_id`, `method` and `path` fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = field::Empty,
            latency_us = field::Empty,
        );
        let _guard = span.enter();
        let start = Instant::now();

        let result = next.run(req, res);

        let latency_us = start.elapsed().as_micros() as u64;
        span.record("status", res.status());
        span.record("latency_us", latency_us);
        info!(
            status = res.status(),
            latency_us,
            failed = result.is_err(),
            "Request finished"
        );
        result
    }
}
