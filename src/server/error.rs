use serde_json::json;
use thiserror::Error;

use super::response::Response;

/// Error that carries its own HTTP status.
///
/// Handlers and middleware return it (usually via `?`) to abort dispatch
/// with a specific client-facing status and message. Unlike other failures,
/// the message is always shown, regardless of the debug setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status}: {message}")]
pub struct HttpError {
    status: u16,
    message: String,
    headers: Vec<(String, String)>,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(405, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(422, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(429, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(503, message)
    }

    /// Attach a header to the error response (e.g. `Retry-After`).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Write the `{"error": <reason>, "message": <message>}` body.
    pub fn write_to(&self, res: &mut Response) -> Result<(), serde_json::Error> {
        res.set_status(self.status);
        for (name, value) in &self.headers {
            res.set_header(name, value.as_str());
        }
        let reason = super::response::status_reason(self.status);
        res.json(&json!({ "error": reason, "message": self.message }))?;
        Ok(())
    }
}
