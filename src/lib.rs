//! # switchyard
//!
//! **switchyard** is a synchronous request-dispatch core: an ordered route
//! table, a dependency container that detects cycles, and a middleware chain
//! driven by a cursor, tied together by a dispatcher that always produces a
//! response.
//!
//! ## Overview
//!
//! A transport (not part of this crate) hands the dispatcher a [`Request`](server::Request)
//! and gets back a [`Response`](server::Response). In between:
//!
//! 1. The [`router`] tests routes in registration order; the first whose
//!    method filter and path pattern both match wins, yielding named path
//!    parameters.
//! 2. The [`dispatcher`] walks the route's middleware list through a
//!    [`Next`](dispatcher::Next) continuation. Any middleware may stop the
//!    chain by writing a response and not continuing.
//! 3. The route's handler (a closure or a controller action) runs with its
//!    parameters resolved from the path, the [`container`], or defaults.
//! 4. Whatever comes back is normalized into the response. Failures become
//!    a structured 404, the status carried by an
//!    [`HttpError`](server::HttpError), or a 500.
//!
//! ## Architecture
//!
//! - **[`container`]** - type and string keyed bindings; transient,
//!   singleton and instance lifecycles; cycle and depth detection
//! - **[`router`]** - route descriptors, groups with prefixes and middleware,
//!   first-match lookup
//! - **[`dispatcher`]** - handler invocation, middleware chain, error
//!   boundary
//! - **[`middleware`]** - the middleware contract plus auth, CORS, metrics
//!   and tracing implementations
//! - **[`server`]** - request and response value types, `HttpError`
//! - **[`app`]** - root context that builds the dispatcher
//! - **[`runtime_config`]**, **[`logging`]**, **[`ids`]**, **[`cli`]** -
//!   configuration, subscriber set-up, request ids, command line
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant D as Dispatcher
//!     participant R as Router
//!     participant M as Middleware chain
//!     participant H as Handler
//!     participant C as Container
//!
//!     T->>D: handle(request, response)
//!     D->>R: match_route(method, path)
//!     alt No route
//!         D-->>T: 404 {"error":"Not Found"}
//!     end
//!     R-->>D: RouteMatch (route, params)
//!     D->>M: Next::run
//!     M->>C: resolve middleware
//!     alt Short-circuit
//!         M-->>D: response written, chain stops
//!     end
//!     M->>H: endpoint
//!     H->>C: resolve parameters / controller
//!     H-->>D: Reply
//!     D-->>T: response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use switchyard::app::App;
//! use switchyard::dispatcher::Handler;
//! use switchyard::server::Request;
//!
//! let mut app = App::default();
//! app.router_mut()
//!     .get("/users/{id}", Handler::func(|ctx| {
//!         let id: String = ctx.args.value("id")?;
//!         Ok(json!({ "id": id }))
//!     }))
//!     .unwrap();
//! let dispatcher = app.build().unwrap();
//!
//! let res = dispatcher.dispatch(Request::new(Method::GET, "/users/7"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body_str(), r#"{"id":"7"}"#);
//! ```
//!
//! ## Concurrency
//!
//! Registration needs exclusive access. Once [`App::build`](app::App::build)
//! freezes the route table and the container behind `Arc`s, a
//! [`Dispatcher`](dispatcher::Dispatcher) can be cloned into any number of
//! worker threads. Singleton construction is at-most-once even under
//! concurrent first access.

pub mod app;
pub mod cli;
pub mod container;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use app::{App, ServiceProvider};
pub use container::{Container, Injectable, ResolveError};
pub use dispatcher::{DispatchError, Dispatcher, Handler, Reply};
pub use router::Router;
pub use server::{HttpError, Request, Response};
