use http::Method;
use thiserror::Error;
use tracing::debug;

use super::core::Middleware;
use crate::container::{Injectable, Resolution, ResolveError};
use crate::dispatcher::{DispatchError, Next};
use crate::server::{Request, Response};

/// CORS configuration error returned by [`CorsMiddlewareBuilder::build`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be combined with credentials
    #[error("CORS configuration error: cannot use wildcard origin (*) with credentials")]
    WildcardWithCredentials,

    /// Origin is not of the form `scheme://host[:port]`
    #[error("CORS configuration error: invalid origin format '{origin}'")]
    InvalidOriginFormat { origin: String },
}

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// For requests carrying an `Origin` header it sets the CORS response
/// headers before continuing the chain. Preflight (`OPTIONS`) requests are
/// answered directly with `204` and never reach the handler.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

/// Permissive policy: any origin, common methods and headers, no credentials
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_headers: vec![
                "Content-Type".into(),
                "X-Requested-With".into(),
                "Authorization".into(),
            ],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_credentials: false,
            expose_headers: Vec::new(),
            max_age: None,
        }
    }
}

impl CorsMiddleware {
    #[must_use]
    pub fn builder() -> CorsMiddlewareBuilder {
        CorsMiddlewareBuilder::new()
    }

    /// Whether `origin` is allowed (wildcard or exact match)
    #[must_use]
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    fn apply_headers(&self, origin: &str, res: &mut Response) {
        res.set_header("access-control-allow-origin", origin);
        res.set_header("vary", "Origin");
        if self.allow_credentials {
            res.set_header("access-control-allow-credentials", "true");
        }
        if !self.expose_headers.is_empty() {
            res.set_header("access-control-expose-headers", self.expose_headers.join(", "));
        }
    }

    fn apply_preflight_headers(&self, res: &mut Response) {
        let methods = self
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        res.set_header("access-control-allow-methods", methods);
        res.set_header("access-control-allow-headers", self.allowed_headers.join(", "));
        if let Some(max_age) = self.max_age.filter(|age| *age > 0) {
            res.set_header("access-control-max-age", max_age.to_string());
        }
    }
}

impl Injectable for CorsMiddleware {
    fn construct(_: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        Ok(Self::default())
    }
}

impl Middleware for CorsMiddleware {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        let Some(origin) = req.header("origin").map(str::to_string) else {
            return next.run(req, res);
        };

        if self.is_origin_allowed(&origin) {
            self.apply_headers(&origin, res);
        } else {
            debug!(request_id = %req.request_id, origin = %origin, "CORS origin rejected");
        }

        if req.method == Method::OPTIONS {
            self.apply_preflight_headers(res);
            res.set_status(204).write("");
            debug!(request_id = %req.request_id, origin = %origin, "CORS preflight answered");
            return Ok(());
        }

        next.run(req, res)
    }
}

/// Builder for [`CorsMiddleware`] with validation
pub struct CorsMiddlewareBuilder {
    inner: CorsMiddleware,
}

impl Default for CorsMiddlewareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsMiddlewareBuilder {
    /// Start from the default policy with no origins allowed
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: CorsMiddleware {
                allowed_origins: Vec::new(),
                ..CorsMiddleware::default()
            },
        }
    }

    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.inner.allowed_origins = origins.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.inner.allowed_methods = methods.to_vec();
        self
    }

    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.inner.allowed_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.inner.allow_credentials = allow;
        self
    }

    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.inner.expose_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.inner.max_age = Some(seconds);
        self
    }

    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        let origins = &self.inner.allowed_origins;
        if self.inner.allow_credentials && origins.iter().any(|o| o == "*") {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        if let Some(bad) = origins.iter().find(|o| *o != "*" && !is_valid_origin(o)) {
            return Err(CorsConfigError::InvalidOriginFormat {
                origin: bad.clone(),
            });
        }
        Ok(self.inner)
    }
}

fn is_valid_origin(origin: &str) -> bool {
    match origin.split_once("://") {
        Some((scheme, host)) => {
            matches!(scheme, "http" | "https") && !host.is_empty() && !host.contains('/')
        }
        None => false,
    }
}
