//! Router core: registration state and the first-match scan.

use http::Method;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error::RouteError;
use super::route::{MethodFilter, Route, RouteMatch};
use crate::dispatcher::Handler;
use crate::middleware::MiddlewareRef;

/// Scoping applied by [`Router::group`].
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: Option<String>,
    middleware: Vec<MiddlewareRef>,
}

impl GroupAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path prefix appended to the enclosing prefix
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Middleware appended to the enclosing middleware list
    #[must_use]
    pub fn middleware<I>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.middleware.extend(middleware);
        self
    }
}

/// Ordered route table.
///
/// Routes are tested in registration order and the first one that matches
/// wins. No specificity ranking is applied: `/users/{id}` registered before
/// `/users/new` will also serve `/users/new`. Register literal routes before
/// parameterized siblings when that matters.
///
/// Registration needs `&mut self`; once the table is built it is typically
/// wrapped in an `Arc` and matched against from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    /// Active group prefix (registration-time only)
    prefix: String,
    /// Registry-level plus active group middleware (registration-time only)
    middleware: Vec<MiddlewareRef>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::GET), path, handler)
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::POST), path, handler)
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::PUT), path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::DELETE), path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::PATCH), path, handler)
    }

    pub fn options(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Only(Method::OPTIONS), path, handler)
    }

    /// Register a route that accepts every method.
    pub fn any(&mut self, path: &str, handler: Handler) -> Result<&mut Route, RouteError> {
        self.add_route(MethodFilter::Any, path, handler)
    }

    /// Register one route per method, sharing the handler.
    ///
    /// Returns the route registered for the last method; naming it or adding
    /// middleware through the returned reference affects only that route.
    pub fn map(
        &mut self,
        methods: &[&str],
        path: &str,
        handler: Handler,
    ) -> Result<&mut Route, RouteError> {
        let filters = methods
            .iter()
            .map(|m| MethodFilter::parse(m))
            .collect::<Result<Vec<_>, _>>()?;
        let Some((last, rest)) = filters.split_last() else {
            return Err(RouteError::InvalidMethod {
                method: String::new(),
            });
        };
        for filter in rest {
            self.add_route(filter.clone(), path, handler.clone())?;
        }
        self.add_route(last.clone(), path, handler)
    }

    /// Register a route, applying the active prefix and middleware.
    ///
    /// The stored middleware list is the registry/group list active right
    /// now; per-route middleware is appended through the returned reference.
    pub fn add_route(
        &mut self,
        method: MethodFilter,
        path: &str,
        handler: Handler,
    ) -> Result<&mut Route, RouteError> {
        let full_path = join_paths(&self.prefix, path);
        let index = self.routes.len();
        let mut route = Route::new(method, &full_path, handler)?.with_index(index);
        route.middleware(self.middleware.iter().cloned());

        debug!(
            route_index = index,
            method = %route.method(),
            path = %route.path(),
            middleware_count = route.middlewares().len(),
            "Route registered"
        );

        self.routes.push(route);
        let len = self.routes.len();
        Ok(&mut self.routes[len - 1])
    }

    /// Register routes under a scoped prefix and middleware list.
    ///
    /// The prefix and middleware in effect before the call are restored
    /// afterwards, whether or not `body` succeeds, so nothing leaks into
    /// sibling groups or later registrations.
    pub fn group<F>(&mut self, attributes: GroupAttributes, body: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        let saved_prefix = self.prefix.clone();
        let saved_len = self.middleware.len();

        if let Some(prefix) = &attributes.prefix {
            self.prefix = join_paths(&self.prefix, prefix);
            if self.prefix == "/" {
                self.prefix.clear();
            }
        }
        self.middleware.extend(attributes.middleware);

        let result = body(self);

        self.prefix = saved_prefix;
        self.middleware.truncate(saved_len);
        result.map(|()| self)
    }

    /// Append registry-level middleware.
    ///
    /// Applies to routes registered after this call; routes already in the
    /// table keep the list they were registered with.
    pub fn middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.middleware.extend(middleware);
        self
    }

    /// Find the first route matching `method` and `path`.
    ///
    /// The path is normalized first: one leading slash, no trailing slash,
    /// and the empty path becomes `/`.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path);
        debug!(method = %method, path = %path, "Route match attempt");

        let start = Instant::now();
        let found = self
            .routes
            .iter()
            .find_map(|route| route.try_match(method, &path));
        let elapsed = start.elapsed();

        match &found {
            Some(m) if elapsed > Duration::from_millis(1) => warn!(
                method = %method,
                path = %path,
                route_index = m.index(),
                route_pattern = %m.route.path(),
                duration_us = elapsed.as_micros() as u64,
                "Slow route matching detected"
            ),
            Some(m) => info!(
                method = %method,
                path = %path,
                route_index = m.index(),
                route_pattern = %m.route.path(),
                path_params = ?m.params,
                duration_us = elapsed.as_micros() as u64,
                "Route matched"
            ),
            None => info!(
                method = %method,
                path = %path,
                routes_scanned = self.routes.len(),
                duration_us = elapsed.as_micros() as u64,
                "No route matched"
            ),
        }
        found
    }

    /// Registered routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route registered under `name`
    #[must_use]
    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.get_name() == Some(name))
    }

    /// One line per route: `METHOD path [name] -> handler (N middleware)`
    #[must_use]
    pub fn route_table(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| {
                let name: Cow<'_, str> = r
                    .get_name()
                    .map_or(Cow::Borrowed(""), |n| Cow::Owned(format!(" [{n}]")));
                format!(
                    "{:<7} {}{} -> {} ({} middleware)",
                    r.method().to_string(),
                    r.path(),
                    name,
                    r.handler(),
                    r.middlewares().len()
                )
            })
            .collect()
    }

    /// Log the routing table at info level
    pub fn dump_routes(&self) {
        info!(routes_count = self.routes.len(), "Routing table");
        for line in self.route_table() {
            info!(route = %line, "Route");
        }
    }
}

/// Join two path fragments with exactly one `/` between non-empty segments.
///
/// The result always starts with `/`, never ends with one (except the root),
/// and contains no empty segments.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let mut joined = String::with_capacity(prefix.len() + path.len() + 1);
    for segment in prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
    {
        joined.push('/');
        joined.push_str(segment);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

/// Request-path normalization applied before matching.
#[must_use]
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Cow::Borrowed("/");
    }
    if path.len() == trimmed.len() + 1 && path.starts_with('/') {
        return Cow::Borrowed(path);
    }
    Cow::Owned(format!("/{trimmed}"))
}
