use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::core::Middleware;
use crate::dispatcher::{DispatchError, Next};
use crate::server::{Request, Response};

/// Request counters collected with relaxed atomics.
///
/// Share one instance between the route table and whoever reports the
/// numbers:
///
/// ```rust
/// use std::sync::Arc;
/// use switchyard::middleware::{MetricsMiddleware, MiddlewareRef};
///
/// let metrics = Arc::new(MetricsMiddleware::new());
/// let stage = MiddlewareRef::shared(Arc::clone(&metrics));
/// # let _ = stage;
/// assert_eq!(metrics.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    failures: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached this stage
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean time spent in the rest of the chain
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Responses with a 4xx status
    #[must_use]
    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status
    #[must_use]
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    /// Chains that returned an error past this stage
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = next.run(req, res);

        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);
        match (&result, res.status()) {
            (Err(_), _) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            (Ok(()), 400..=499) => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            (Ok(()), 500..=599) => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        result
    }
}
