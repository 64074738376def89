use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ids::RequestId;

/// Maximum number of path parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Route parameter storage: `(name, value)` pairs in template order.
///
/// Names come from compiled route templates and are shared as `Arc<str>`;
/// values are per-request data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Header storage: `(name, value)` pairs, looked up case-insensitively.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared flag the transport sets when a request is abandoned.
///
/// The middleware chain checks it before every stage and stops invoking
/// further middleware once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Request as seen by the dispatch core.
///
/// The transport adapter builds one per incoming request; the dispatcher
/// fills in [`Request::route_params`] after a successful match.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id (taken from `x-request-id` when valid, otherwise fresh)
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Request path without query string
    pub path: String,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Parameters extracted from the matched route template
    pub route_params: ParamVec,
    /// Parsed JSON body, if the transport provided one
    pub body: Option<Value>,
    cancellation: CancellationFlag,
}

impl Request {
    /// Build a request for `method` and `path`. Anything after `?` is dropped.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if let Some(pos) = path.find('?') {
            path.truncate(pos);
        }
        Self {
            request_id: RequestId::new(),
            method,
            path,
            headers: HeaderVec::new(),
            route_params: ParamVec::new(),
            body: None,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Build a request from a method string, case-insensitively.
    pub fn parse(method: &str, path: impl Into<String>) -> Result<Self, http::method::InvalidMethod> {
        let method = parse_method(method)?;
        Ok(Self::new(method, path))
    }

    /// Add a header. Setting `x-request-id` to a valid ULID adopts it as the
    /// request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Share a cancellation flag with the transport.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a route parameter by name.
    ///
    /// Uses "last write wins" semantics when a template repeats a name.
    #[inline]
    #[must_use]
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the route parameters (done by the dispatcher after matching)
    pub fn set_route_params(&mut self, params: ParamVec) {
        self.route_params = params;
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Parse an HTTP method, accepting any letter case.
pub fn parse_method(method: &str) -> Result<Method, http::method::InvalidMethod> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
}
