//! # Middleware Module
//!
//! The middleware contract plus a few reference implementations.
//!
//! A [`Middleware`] receives the request, the response and a [`Next`]
//! continuation. Calling `next.run(req, res)` continues the chain; returning
//! without calling it short-circuits, leaving whatever the middleware wrote
//! as the response.
//!
//! Routes list middleware as [`MiddlewareRef`]s:
//! - [`MiddlewareRef::instance`] / [`MiddlewareRef::shared`] - a built value
//! - [`MiddlewareRef::service`] - a type resolved through the container
//! - [`MiddlewareRef::named`] - a string key bound with [`register_named`];
//!   a key bound to anything else fails with
//!   [`DispatchError::MiddlewareContractViolation`](crate::dispatcher::DispatchError::MiddlewareContractViolation)
//!
//! Reference middleware:
//! - [`AuthMiddleware`] - static token check, 401 short-circuit
//! - [`CorsMiddleware`] - CORS headers, 204 preflight short-circuit
//! - [`MetricsMiddleware`] - request counts, latency and status classes
//! - [`TracingMiddleware`] - per-request span and completion log

mod auth;
mod core;
mod cors;
mod metrics;
mod tracing;

pub use self::auth::{ApiToken, AuthMiddleware};
pub use self::core::{register_named, Middleware, MiddlewareRef};
pub use self::cors::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder};
pub use self::metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
pub use crate::dispatcher::Next;
