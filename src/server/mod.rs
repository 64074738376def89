//! # Server Module
//!
//! Transport-neutral request and response types.
//!
//! The dispatch core never touches sockets. A transport adapter (HTTP server,
//! test harness, the `switchyard dispatch` CLI command) builds a [`Request`],
//! hands it and a fresh [`Response`] to the dispatcher, then serializes the
//! response once dispatch returns.
//!
//! - [`Request`] - method, path, headers, route parameters, optional JSON body
//!   and a [`CancellationFlag`] shared with the transport
//! - [`Response`] - status, headers and body; write-once
//! - [`HttpError`] - an error that maps directly to a status code
//!
//! Headers and route parameters live in `SmallVec`s sized for the common case
//! so typical requests do not allocate for them.

mod error;
mod request;
mod response;

pub use self::error::HttpError;
pub use self::request::{
    parse_method, CancellationFlag, HeaderVec, ParamVec, Request, MAX_INLINE_HEADERS,
    MAX_INLINE_PARAMS, REQUEST_ID_HEADER,
};
pub use self::response::{
    status_reason, Response, CONTENT_TYPE, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};
