use tracing::{debug, warn};

use super::error::DispatchError;
use crate::container::Container;
use crate::middleware::MiddlewareRef;
use crate::server::{Request, Response};

/// Terminal stage of a chain: the route handler plus reply normalization.
pub type Endpoint<'a> = dyn Fn(&mut Request, &mut Response) -> Result<(), DispatchError> + 'a;

/// Continuation handed to each middleware.
///
/// Holds the route's ordered middleware list and a cursor into it. Calling
/// [`Next::run`] resolves the middleware at the cursor and hands it a `Next`
/// positioned one stage further; past the last stage it invokes the
/// endpoint. `run` consumes `self`, so a middleware continues at most once.
/// Dropping it without calling `run` short-circuits the chain.
pub struct Next<'a> {
    stages: &'a [MiddlewareRef],
    cursor: usize,
    container: &'a Container,
    endpoint: &'a Endpoint<'a>,
}

impl<'a> Next<'a> {
    /// Chain positioned at the first stage
    pub fn new(stages: &'a [MiddlewareRef], container: &'a Container, endpoint: &'a Endpoint<'a>) -> Self {
        Self {
            stages,
            cursor: 0,
            container,
            endpoint,
        }
    }

    /// Index of the stage this continuation will run
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Middleware stages left before the endpoint
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len().saturating_sub(self.cursor)
    }

    /// Continue with the rest of the chain.
    ///
    /// Does nothing once the request's cancellation flag is set.
    pub fn run(self, req: &mut Request, res: &mut Response) -> Result<(), DispatchError> {
        if req.is_cancelled() {
            warn!(
                request_id = %req.request_id,
                stage = self.cursor,
                "Request cancelled, chain halted"
            );
            return Ok(());
        }

        let Some(stage) = self.stages.get(self.cursor) else {
            return (self.endpoint)(req, res);
        };

        let middleware = stage.resolve(self.container)?;
        debug!(
            request_id = %req.request_id,
            stage = self.cursor,
            middleware = %stage,
            "Middleware stage"
        );
        let next = Next {
            cursor: self.cursor + 1,
            ..self
        };
        middleware.process(req, res, next)
    }
}
