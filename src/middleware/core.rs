use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::container::{Container, Injectable, Resolution, ResolveError, ServiceKey};
use crate::dispatcher::{DispatchError, Next};
use crate::server::{Request, Response};

/// Middleware capability contract.
///
/// A conforming middleware either calls `next.run(req, res)` once to
/// continue, or returns without calling it to short-circuit the chain. It
/// may modify the response before and after continuing.
pub trait Middleware: Send + Sync {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

type ResolveMiddleware = fn(&mut Resolution<'_>) -> Result<Arc<dyn Middleware>, ResolveError>;

/// A middleware as listed on a route.
///
/// Service and named references are resolved through the container each
/// time the chain reaches them, so their binding's lifecycle applies.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// Pre-built, shared instance
    Instance(Arc<dyn Middleware>),
    /// Typed service resolved (or constructed) through the container
    Service {
        key: ServiceKey,
        resolve: ResolveMiddleware,
    },
    /// String key that must be bound to an `Arc<dyn Middleware>`
    Named(Cow<'static, str>),
}

impl MiddlewareRef {
    pub fn instance<M: Middleware + 'static>(middleware: M) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    /// Reference an instance the caller keeps a handle to (e.g. for metrics).
    pub fn shared<M: Middleware + 'static>(middleware: Arc<M>) -> Self {
        Self::Instance(middleware)
    }

    /// Resolve `M` through the container: its binding if one exists,
    /// otherwise a fresh instance built by [`Injectable::construct`].
    pub fn service<M: Middleware + Injectable>() -> Self {
        Self::Service {
            key: ServiceKey::of::<M>(),
            resolve: resolve_service::<M>,
        }
    }

    /// Resolve a string key; see [`register_named`].
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// Produce the middleware to run.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MiddlewareContractViolation`] when a named key is
    /// bound to something other than a middleware; resolution errors
    /// otherwise.
    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Middleware>, DispatchError> {
        match self {
            Self::Instance(middleware) => Ok(Arc::clone(middleware)),
            Self::Service { resolve, .. } => Ok(resolve(&mut container.resolution())?),
            Self::Named(name) => match container.get_named::<Arc<dyn Middleware>>(name.clone()) {
                Ok(middleware) => Ok(Arc::clone(middleware.as_ref())),
                Err(ResolveError::TypeMismatch { .. }) => {
                    Err(DispatchError::MiddlewareContractViolation {
                        middleware: name.to_string(),
                    })
                }
                Err(e) => Err(e.into()),
            },
        }
    }
}

fn resolve_service<M: Middleware + Injectable>(
    resolution: &mut Resolution<'_>,
) -> Result<Arc<dyn Middleware>, ResolveError> {
    let middleware: Arc<dyn Middleware> = resolution.make::<M>()?;
    Ok(middleware)
}

/// Bind `middleware` under `name` so routes can list it with
/// [`MiddlewareRef::named`].
pub fn register_named<M: Middleware + 'static>(
    container: &mut Container,
    name: impl Into<Cow<'static, str>>,
    middleware: M,
) {
    let middleware: Arc<dyn Middleware> = Arc::new(middleware);
    container.instance_named(name, middleware);
}

impl fmt::Display for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(m) => f.write_str(m.name()),
            Self::Service { key, .. } => write!(f, "{key}"),
            Self::Named(name) => write!(f, "@{name}"),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(m) => f.debug_tuple("Instance").field(&m.name()).finish(),
            Self::Service { key, .. } => f.debug_struct("Service").field("key", key).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}
