//! # Router Module
//!
//! Ordered route table with path-template matching and parameter extraction.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path templates such as `/users/{id}` or `/items/{id:[0-9]+}`
//!   once, at registration time
//! - Applying group prefixes and middleware while routes are registered
//! - Matching incoming requests to the first route that accepts them
//! - Returning extracted path parameters as a request-owned value
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Registration**: `get`/`post`/.../`any`/`map` build a [`Route`] from the
//!    active group prefix, the active middleware list and the handler. Groups
//!    save and restore that state around their body, so scoping never leaks.
//!
//! 2. **Matching**: [`Router::match_route`] normalizes the request path and
//!    scans routes in registration order. Each [`Route::try_match`] call is
//!    pure; the [`RouteMatch`] it returns belongs to the caller.
//!
//! Registration order is the only tie-break. A parameterized route registered
//! before a literal sibling shadows it.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use switchyard::dispatcher::{Handler, Reply};
//! use switchyard::router::{GroupAttributes, Router};
//!
//! let mut router = Router::new();
//! router
//!     .group(GroupAttributes::new().prefix("/api"), |r| {
//!         r.get("/items/{id:[0-9]+}", Handler::func(|_| Ok(Reply::Empty)))?
//!             .name("items.show");
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let m = router.match_route(&Method::GET, "/api/items/42/").unwrap();
//! assert_eq!(m.param("id"), Some("42"));
//! assert!(router.match_route(&Method::GET, "/api/items/abc").is_none());
//! assert_eq!(router.route_by_name("items.show").unwrap().path(), "/api/items/{id:[0-9]+}");
//! ```
//!
//! ## Performance
//!
//! Literal templates are compared with plain string equality. Parameterized
//! templates use one anchored regex each. Matching is O(n) in the number of
//! routes, which suits the small, author-ordered tables this router targets.

mod core;
mod error;
mod route;

pub use self::core::{join_paths, normalize_path, GroupAttributes, Router};
pub use self::error::RouteError;
pub use self::route::{MethodFilter, PathPattern, Route, RouteMatch};
pub use crate::server::{ParamVec, MAX_INLINE_PARAMS};
