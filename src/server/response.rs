use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::request::HeaderVec;

pub const CONTENT_TYPE: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Outgoing response owned by the dispatcher for the lifetime of a request.
///
/// Middleware and handlers write into it; the transport adapter serializes
/// it once dispatch returns. After [`Response::write`] or [`Response::json`]
/// the response counts as sent and further writes are ignored.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderVec,
    body: Vec<u8>,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Vec::new(),
            sent: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase for the current status.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        if !self.sent {
            self.status = status;
        }
        self
    }

    /// Set a header, replacing any existing value (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        if self.sent {
            return self;
        }
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.headers.push((Arc::from(name), value));
        }
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Write a raw body and mark the response sent. Defaults the content type
    /// to plain text when none was set.
    pub fn write(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        if self.sent {
            return self;
        }
        if self.header(CONTENT_TYPE).is_none() {
            self.set_header(CONTENT_TYPE, TEXT_CONTENT_TYPE);
        }
        self.body = body.into();
        self.sent = true;
        self
    }

    /// Serialize `value` as the JSON body and mark the response sent.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, serde_json::Error> {
        if self.sent {
            return Ok(self);
        }
        let body = serde_json::to_vec(value)?;
        self.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        self.body = body;
        self.sent = true;
        Ok(self)
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy)
    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, if it is JSON
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Reason phrase for a status code; unknown codes get an empty phrase.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(599), "");
    }

    #[test]
    fn json_sets_content_type_and_marks_sent() {
        let mut res = Response::new();
        res.json(&json!({"ok": true})).unwrap();
        assert!(res.is_sent());
        assert_eq!(res.header("Content-Type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(res.body_json(), Some(json!({"ok": true})));
    }

    #[test]
    fn writes_after_send_are_ignored() {
        let mut res = Response::new();
        res.set_status(201).write("first");
        res.set_status(500).write("second");
        res.set_header("x-late", "1");
        assert_eq!(res.status(), 201);
        assert_eq!(res.body_str(), "first");
        assert_eq!(res.header("x-late"), None);
    }

    #[test]
    fn set_header_replaces_existing() {
        let mut res = Response::new();
        res.set_header("Content-Type", "text/html");
        res.set_header("content-type", "text/csv");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("CONTENT-TYPE"), Some("text/csv"));
    }

    #[test]
    fn write_keeps_explicit_content_type() {
        let mut res = Response::new();
        res.set_header(CONTENT_TYPE, "text/html").write("<p>hi</p>");
        assert_eq!(res.header(CONTENT_TYPE), Some("text/html"));
    }
}
