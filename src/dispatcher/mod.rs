//! # Dispatcher Module
//!
//! The request-level driver. For each request it asks the router for a
//! match, runs the matched route's middleware chain, invokes the handler and
//! normalizes whatever the handler returned into the response.
//!
//! ## Request Flow
//!
//! 1. [`Router::match_route`](crate::router::Router::match_route) finds the
//!    first route accepting the method and path; no match is a 404
//! 2. Extracted path parameters are set on the request and offered to the
//!    handler as named `String` arguments
//! 3. [`Next`] walks the route's middleware list with a cursor; each stage
//!    is resolved (instance, typed service or named service) just before it
//!    runs
//! 4. Past the last stage the [`Handler`] runs: a closure, or an action on
//!    a [`Controller`] resolved through the container
//! 5. The returned [`Reply`] is written unless the response was already sent
//!
//! A middleware that returns without calling [`Next::run`] short-circuits:
//! no later stage and no handler runs, and the response holds whatever that
//! middleware wrote.
//!
//! ## Error Handling
//!
//! [`Dispatcher::handle`] is the single top-level boundary:
//! - unmatched requests get a structured 404 naming the method and path
//! - [`HttpError`](crate::server::HttpError) keeps its own status
//! - every other [`DispatchError`], and handler panics, become a 500 whose
//!   body carries the message only when debug mode is on
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//! use switchyard::container::Container;
//! use switchyard::dispatcher::{Dispatcher, Handler};
//! use switchyard::router::Router;
//! use switchyard::server::Request;
//!
//! let mut router = Router::new();
//! router
//!     .get("/greet/{name}", Handler::func(|ctx| {
//!         let name = ctx.args.value::<String>("name")?;
//!         Ok(json!({ "hello": name }))
//!     }))
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(Container::new()), Arc::new(router));
//! let res = dispatcher.dispatch(Request::new(Method::GET, "/greet/Ann"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body_str(), r#"{"hello":"Ann"}"#);
//! ```

mod chain;
mod core;
mod error;
mod handler;
mod reply;

pub use self::chain::{Endpoint, Next};
pub use self::core::{Dispatcher, GENERIC_ERROR_MESSAGE};
pub use self::error::DispatchError;
pub use self::handler::{Controller, Handler, HandlerContext, HandlerFn};
pub use self::reply::Reply;
