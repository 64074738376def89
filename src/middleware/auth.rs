use serde_json::json;
use tracing::info;

use super::core::Middleware;
use crate::container::{Injectable, Resolution, ResolveError};
use crate::dispatcher::{DispatchError, Next};
use crate::server::{Request, Response};

/// Shared secret expected by [`AuthMiddleware`] when it is built through
/// the container.
#[derive(Debug, Clone)]
pub struct ApiToken(pub String);

/// Static token check on the `Authorization` header.
///
/// Accepts the raw token or `Bearer <token>`. Anything else stops the chain
/// with `401 {"error":"Unauthorized"}`.
pub struct AuthMiddleware {
    token: String,
}

impl AuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn accepts(&self, header: &str) -> bool {
        let header = header.trim();
        let presented = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .unwrap_or(header);
        presented == self.token
    }
}

impl Injectable for AuthMiddleware {
    fn construct(resolution: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        let token = resolution.get::<ApiToken>()?;
        Ok(Self::new(token.0.clone()))
    }
}

impl Middleware for AuthMiddleware {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        let verdict = req.header("authorization").map(|h| self.accepts(h));
        match verdict {
            Some(true) => next.run(req, res),
            presented => {
                info!(
                    request_id = %req.request_id,
                    path = %req.path,
                    header_present = presented.is_some(),
                    "Authentication failed"
                );
                res.set_status(401)
                    .set_header("www-authenticate", "Bearer")
                    .json(&json!({ "error": "Unauthorized" }))?;
                Ok(())
            }
        }
    }
}
