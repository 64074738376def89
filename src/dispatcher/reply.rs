use serde::Serialize;
use serde_json::Value;

use crate::server::Response;

/// Normalized handler return value.
///
/// Sequences and maps become JSON bodies, strings are written verbatim, any
/// other scalar is stringified, and `null`/`()` write nothing. A reply is
/// discarded when the handler already sent the response itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Empty,
    Json(Value),
    Text(String),
}

impl Reply {
    /// Serialize any `Serialize` value and normalize the result.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Write into `res` unless it has already been sent.
    ///
    /// Returns whether anything was written.
    pub fn write_to(self, res: &mut Response) -> Result<bool, serde_json::Error> {
        if res.is_sent() {
            return Ok(false);
        }
        match self {
            Self::Empty => return Ok(false),
            Self::Json(value) => {
                res.json(&value)?;
            }
            Self::Text(text) => {
                res.write(text);
            }
        }
        Ok(true)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(s) => Self::Text(s),
            v @ (Value::Array(_) | Value::Object(_)) => Self::Json(v),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

macro_rules! stringified_reply {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Reply {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

stringified_reply!(bool, i32, i64, u32, u64, usize, f64);
