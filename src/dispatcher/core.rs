use serde_json::json;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::chain::Next;
use super::error::DispatchError;
use super::handler::{Handler, HandlerContext};
use crate::container::{Container, NamedArgs};
use crate::router::Router;
use crate::server::{Request, Response};

/// Generic body used for 500 responses outside debug mode
pub const GENERIC_ERROR_MESSAGE: &str = "Internal Server Error";

/// Request-level driver: match, run the chain, normalize, and turn failures
/// into responses.
///
/// A dispatcher is cheap to clone and safe to share; every request gets its
/// own chain cursor and resolution path.
#[derive(Clone)]
pub struct Dispatcher {
    container: Arc<Container>,
    router: Arc<Router>,
    debug: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(container: Arc<Container>, router: Arc<Router>) -> Self {
        Self {
            container,
            router,
            debug: false,
        }
    }

    /// Include underlying error messages in 500 responses.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Dispatch an owned request and return the finished response.
    #[must_use]
    pub fn dispatch(&self, mut req: Request) -> Response {
        let mut res = Response::new();
        self.handle(&mut req, &mut res);
        res
    }

    /// Handle one request. Never fails: every error becomes a response.
    ///
    /// - no matching route: 404 `{"error":"Not Found","message":"Route not found: GET /x"}`
    /// - [`HttpError`](crate::server::HttpError): its own status, message and headers
    /// - anything else, including a panic: 500, with the message only in debug mode
    pub fn handle(&self, req: &mut Request, res: &mut Response) {
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_handle(req, res)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.render_error(&err, req, res),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    panic = %message,
                    "Handler panicked"
                );
                self.render_internal(&message, res);
            }
        }

        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = res.status(),
            duration_us = start.elapsed().as_micros() as u64,
            "Request completed"
        );
    }

    /// Match and run the chain, propagating any failure to the caller.
    pub fn try_handle(&self, req: &mut Request, res: &mut Response) -> Result<(), DispatchError> {
        let Some(mut matched) = self.router.match_route(&req.method, &req.path) else {
            return Err(DispatchError::RouteNotFound {
                method: req.method.clone(),
                path: req.path.clone(),
            });
        };
        let route = matched.route;
        req.set_route_params(matched.take_params());

        let handler_invoked = Cell::new(false);
        let endpoint = |req: &mut Request, res: &mut Response| -> Result<(), DispatchError> {
            handler_invoked.set(true);
            self.invoke_handler(route.handler(), req, res)
        };

        debug!(
            request_id = %req.request_id,
            route_index = route.index(),
            middleware_count = route.middlewares().len(),
            "Running middleware chain"
        );
        Next::new(route.middlewares(), &self.container, &endpoint).run(req, res)?;

        if !handler_invoked.get() {
            info!(
                request_id = %req.request_id,
                route_pattern = %route.path(),
                status = res.status(),
                "Middleware short-circuited request"
            );
        }
        Ok(())
    }

    fn invoke_handler(
        &self,
        handler: &Handler,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<(), DispatchError> {
        let mut named = NamedArgs::new();
        for (name, value) in &req.route_params {
            named.insert(name.to_string(), value.clone());
        }

        let start = Instant::now();
        let mut ctx = HandlerContext::new(req, res, self.container.arguments(named));
        let reply = handler.invoke(&mut ctx)?;
        let written = reply.write_to(&mut *ctx.response)?;

        debug!(
            request_id = %ctx.request.request_id,
            handler = %handler,
            reply_written = written,
            duration_us = start.elapsed().as_micros() as u64,
            "Handler invoked"
        );
        Ok(())
    }

    fn render_error(&self, err: &DispatchError, req: &Request, res: &mut Response) {
        if res.is_sent() {
            warn!(
                request_id = %req.request_id,
                error = %err,
                "Dispatch failed after the response was sent"
            );
            return;
        }

        let written = match err {
            DispatchError::RouteNotFound { method, path } => res
                .set_status(404)
                .json(&json!({
                    "error": "Not Found",
                    "message": format!("Route not found: {method} {path}"),
                }))
                .map(|_| ()),
            DispatchError::Http(http) => {
                debug!(
                    request_id = %req.request_id,
                    status = http.status(),
                    message = %http.message(),
                    "HTTP error returned"
                );
                http.write_to(res)
            }
            other => {
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    error = %other,
                    configuration = other.is_configuration(),
                    "Request failed"
                );
                self.render_internal(&other.to_string(), res);
                Ok(())
            }
        };

        if let Err(e) = written {
            error!(request_id = %req.request_id, error = %e, "Failed to write error response");
        }
    }

    fn render_internal(&self, message: &str, res: &mut Response) {
        let message = if self.debug {
            message
        } else {
            GENERIC_ERROR_MESSAGE
        };
        if res.set_status(500).json(&json!({ "error": message })).is_err() {
            res.write(GENERIC_ERROR_MESSAGE);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
