use thiserror::Error;

/// Route registration errors.
///
/// All of these are raised while the route table is being built, never
/// while matching a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern '{template}': {reason}")]
    InvalidPattern { template: String, reason: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },
}
