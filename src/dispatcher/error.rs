use http::Method;
use thiserror::Error;

use crate::container::ResolveError;
use crate::router::RouteError;
use crate::server::HttpError;

/// Everything that can stop a request short of its handler's reply.
///
/// [`Dispatcher::handle`](super::Dispatcher::handle) turns each variant into
/// a response: `RouteNotFound` becomes a 404, `Http` keeps its own status,
/// and everything else becomes a 500.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route accepts the method and path. Expected, not a failure.
    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid handler '{handler}': {reason}")]
    InvalidHandlerShape { handler: String, reason: String },

    #[error("'{middleware}' does not implement the middleware contract")]
    MiddlewareContractViolation { middleware: String },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Any other failure raised by a handler or middleware body
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// HTTP status this error renders as
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::RouteNotFound { .. } => 404,
            Self::Http(e) => e.status(),
            _ => 500,
        }
    }

    /// Whether this error is a configuration mistake that should have been
    /// caught during start-up
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidHandlerShape { .. }
                | Self::MiddlewareContractViolation { .. }
                | Self::Route(_)
                | Self::Resolve(
                    ResolveError::CyclicDependency { .. }
                        | ResolveError::UnresolvableDependency { .. }
                        | ResolveError::DepthExceeded { .. }
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let nf = DispatchError::RouteNotFound {
            method: Method::GET,
            path: "/x".to_string(),
        };
        assert_eq!(nf.status(), 404);
        assert_eq!(nf.to_string(), "Route not found: GET /x");
        assert_eq!(DispatchError::from(HttpError::conflict("dup")).status(), 409);
        assert_eq!(DispatchError::from(anyhow::anyhow!("boom")).status(), 500);
    }

    #[test]
    fn cycles_are_configuration_errors() {
        let err = DispatchError::from(ResolveError::CyclicDependency {
            chain: vec!["A".to_string(), "A".to_string()],
        });
        assert!(err.is_configuration());
        assert!(!DispatchError::from(HttpError::bad_request("x")).is_configuration());
    }
}
