use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::error::DispatchError;
use super::reply::Reply;
use crate::container::{Arguments, Injectable, Resolution, ResolveError, ServiceKey};
use crate::server::{Request, Response};

/// Everything a handler can reach during one request.
///
/// `request` and `response` are the named injections every handler gets.
/// `args` resolves the remaining parameters: route parameters by name first
/// (as `String`s), then container services by type, then defaults.
pub struct HandlerContext<'a> {
    pub request: &'a mut Request,
    pub response: &'a mut Response,
    pub args: Arguments<'a>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(request: &'a mut Request, response: &'a mut Response, args: Arguments<'a>) -> Self {
        Self {
            request,
            response,
            args,
        }
    }

    /// Route parameter extracted from the path
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.route_param(name)
    }
}

/// A type whose instances serve several named actions.
///
/// Controllers are resolved through the container for every request they
/// serve, so a singleton binding gives one shared instance and no binding
/// at all builds a fresh one through [`Injectable`].
pub trait Controller: Send + Sync + 'static {
    /// Action names this controller accepts
    fn actions() -> &'static [&'static str]
    where
        Self: Sized;

    /// Run `action`. Only names listed by [`Controller::actions`] are routed here.
    fn dispatch(&self, action: &str, ctx: &mut HandlerContext<'_>) -> Result<Reply, DispatchError>;
}

/// Closure handler signature
pub type HandlerFn =
    dyn Fn(&mut HandlerContext<'_>) -> Result<Reply, DispatchError> + Send + Sync;

type ResolveController = fn(&mut Resolution<'_>) -> Result<Arc<dyn Controller>, ResolveError>;

/// What a route runs once its middleware lets the request through.
#[derive(Clone)]
pub enum Handler {
    /// A closure
    Callable(Arc<HandlerFn>),
    /// A controller type plus the action to invoke on it
    Controller {
        key: ServiceKey,
        action: Cow<'static, str>,
        resolve: ResolveController,
    },
}

impl Handler {
    /// Wrap a closure. Its return value is normalized through [`Reply`].
    pub fn func<F, R>(f: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>) -> Result<R, DispatchError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Self::Callable(Arc::new(move |ctx: &mut HandlerContext<'_>| {
            f(ctx).map(Into::into)
        }))
    }

    /// Route to `action` on controller `C`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidHandlerShape`] when `C` does not list `action`.
    pub fn controller<C>(action: impl Into<Cow<'static, str>>) -> Result<Self, DispatchError>
    where
        C: Controller + Injectable,
    {
        let action = action.into();
        if !C::actions().contains(&action.as_ref()) {
            return Err(DispatchError::InvalidHandlerShape {
                handler: format!("{}@{}", type_name::<C>(), action),
                reason: format!("unknown action; expected one of {:?}", C::actions()),
            });
        }
        Ok(Self::Controller {
            key: ServiceKey::of::<C>(),
            action,
            resolve: resolve_controller::<C>,
        })
    }

    /// Run the handler against `ctx`.
    pub fn invoke(&self, ctx: &mut HandlerContext<'_>) -> Result<Reply, DispatchError> {
        match self {
            Self::Callable(f) => f(ctx),
            Self::Controller {
                action, resolve, ..
            } => {
                let controller = resolve(ctx.args.resolution())?;
                controller.dispatch(action, ctx)
            }
        }
    }
}

fn resolve_controller<C: Controller + Injectable>(
    resolution: &mut Resolution<'_>,
) -> Result<Arc<dyn Controller>, ResolveError> {
    let controller: Arc<dyn Controller> = resolution.make::<C>()?;
    Ok(controller)
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("closure"),
            Self::Controller { key, action, .. } => write!(f, "{key}@{action}"),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Handler::Callable"),
            Self::Controller { key, action, .. } => f
                .debug_struct("Handler::Controller")
                .field("key", key)
                .field("action", action)
                .finish(),
        }
    }
}
