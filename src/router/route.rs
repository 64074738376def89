//! Route descriptor: one method + path template + handler + middleware tuple.
//!
//! A [`Route`] compiles its template once at registration. Matching is pure:
//! [`Route::try_match`] never mutates the route and returns the extracted
//! parameters as a request-owned [`ParamVec`], so any number of requests can
//! match against the same route concurrently.

use http::Method;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use super::error::RouteError;
use crate::dispatcher::Handler;
use crate::middleware::MiddlewareRef;
use crate::server::ParamVec;

/// Which request methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// Wildcard (`ANY`)
    Any,
    /// Exactly one method
    Only(Method),
}

impl MethodFilter {
    /// Parse a method name case-insensitively; `ANY` (or `*`) is the wildcard.
    pub fn parse(method: &str) -> Result<Self, RouteError> {
        let upper = method.trim().to_ascii_uppercase();
        if upper == "ANY" || upper == "*" {
            return Ok(Self::Any);
        }
        Method::from_bytes(upper.as_bytes())
            .map(Self::Only)
            .map_err(|_| RouteError::InvalidMethod {
                method: method.to_string(),
            })
    }

    #[inline]
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(m) => m == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("ANY"),
            Self::Only(m) => f.write_str(m.as_str()),
        }
    }
}

/// Compiled path template.
///
/// `{name}` matches one path segment (`[^/]+`); `{name:regex}` matches the
/// given sub-pattern. Templates without placeholders are matched by plain
/// string equality and never touch the regex engine.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Option<Regex>,
    params: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile `template` into an anchored pattern.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] for unbalanced braces, empty or
    /// malformed parameter names, duplicate names, or a custom sub-pattern
    /// the regex engine rejects.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        if !template.contains('{') && !template.contains('}') {
            return Ok(Self {
                template: template.to_string(),
                regex: None,
                params: Vec::new(),
            });
        }

        let invalid = |reason: String| RouteError::InvalidPattern {
            template: template.to_string(),
            reason,
        };

        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut params: Vec<Arc<str>> = Vec::new();
        let mut literal_start = 0;
        let mut chars = template.char_indices();

        while let Some((open, c)) = chars.next() {
            match c {
                '{' => {
                    pattern.push_str(&regex::escape(&template[literal_start..open]));
                    // Sub-patterns may contain their own braces, e.g. `{code:[a-z]{2}}`
                    let mut depth = 1usize;
                    let mut close = None;
                    for (i, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    close = Some(i);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let close = close.ok_or_else(|| invalid("unclosed '{'".to_string()))?;
                    let body = &template[open + 1..close];
                    let (name, sub) = match body.split_once(':') {
                        Some((name, sub)) => (name.trim(), Some(sub)),
                        None => (body.trim(), None),
                    };
                    if !is_valid_param_name(name) {
                        return Err(invalid(format!("invalid parameter name '{name}'")));
                    }
                    if params.iter().any(|p| p.as_ref() == name) {
                        return Err(invalid(format!("duplicate parameter '{name}'")));
                    }
                    match sub {
                        Some(sub) if sub.is_empty() => {
                            return Err(invalid(format!("empty pattern for '{name}'")));
                        }
                        Some(sub) => {
                            pattern.push_str("(?P<");
                            pattern.push_str(name);
                            pattern.push_str(">(?:");
                            pattern.push_str(sub);
                            pattern.push_str("))");
                        }
                        None => {
                            pattern.push_str("(?P<");
                            pattern.push_str(name);
                            pattern.push_str(">[^/]+)");
                        }
                    }
                    params.push(Arc::from(name));
                    literal_start = close + 1;
                }
                '}' => return Err(invalid("unmatched '}'".to_string())),
                _ => {}
            }
        }
        pattern.push_str(&regex::escape(&template[literal_start..]));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            regex: Some(regex),
            params,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in template order
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.params
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.regex.is_none()
    }

    /// Match `path` against the template, returning the captured parameters.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let Some(regex) = &self.regex else {
            return (self.template == path).then(ParamVec::new);
        };
        let caps = regex.captures(path)?;
        let mut params = ParamVec::new();
        for name in &self.params {
            if let Some(m) = caps.name(name) {
                params.push((Arc::clone(name), m.as_str().to_string()));
            }
        }
        Some(params)
    }
}

fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One registered route.
///
/// Built by the [`Router`](super::Router) registration methods, which hand
/// back `&mut Route` so the name and extra middleware can be chained on.
/// Once the router is shared the route is read-only.
#[derive(Debug, Clone)]
pub struct Route {
    method: MethodFilter,
    pattern: PathPattern,
    handler: Handler,
    middleware: Vec<MiddlewareRef>,
    name: Option<String>,
    index: usize,
}

impl Route {
    /// Build a standalone route. `path` is used as given; the router
    /// normalizes paths before calling this.
    pub fn new(method: MethodFilter, path: &str, handler: Handler) -> Result<Self, RouteError> {
        Ok(Self {
            method,
            pattern: PathPattern::compile(path)?,
            handler,
            middleware: Vec::new(),
            name: None,
            index: 0,
        })
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Give the route a name for lookup via [`Router::route_by_name`](super::Router::route_by_name).
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Append per-route middleware after any inherited middleware.
    pub fn middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.middleware.extend(middleware);
        self
    }

    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    /// Path template as registered (after prefix joining)
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Full middleware list: registry-level, then group, then per-route.
    #[must_use]
    pub fn middlewares(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    /// Position in registration order
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Test this route against a request. Pure: the route is never modified.
    #[must_use]
    pub fn try_match(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        if !self.method.allows(method) {
            return None;
        }
        let params = self.pattern.captures(path)?;
        Some(RouteMatch {
            route: self,
            params,
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// Result of matching a request against a route.
///
/// Owned by the request that produced it; the route itself is borrowed
/// from the shared router.
#[derive(Debug, Clone)]
pub struct RouteMatch<'r> {
    /// The matched route
    pub route: &'r Route,
    /// Parameters extracted from the path, in template order
    pub params: ParamVec,
}

impl RouteMatch<'_> {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Registration index of the matched route
    #[must_use]
    pub fn index(&self) -> usize {
        self.route.index()
    }

    /// Take the parameter list, leaving the match with none
    pub fn take_params(&mut self) -> ParamVec {
        std::mem::take(&mut self.params)
    }
}
