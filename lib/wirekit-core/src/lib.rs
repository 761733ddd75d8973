//! Core types for the wirekit filter pipeline.
//!
//! This crate provides the value types every filter stage and terminal
//! handler agree on:
//! - [`Method`] - HTTP method enum
//! - [`Headers`] - ordered, case-insensitive header list
//! - [`QueryString`] and [`Payload`] - call parameters carried by a request
//! - [`Request`], [`RequestBuilder`] and [`build_request`] - request construction
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Error handling
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod error;
mod headers;
mod method;
pub mod prelude;
mod query;
mod request;
mod response;

pub use body::{ContentType, Payload, from_json, is_textual, to_form, to_json};
pub use error::{Error, Result};
pub use headers::Headers;
pub use method::Method;
pub use query::{QueryString, ToQueryPairs, to_query_string};
pub use request::{DEFAULT_BASE_URL, Request, RequestBuilder, build_request, resolve_url};
pub use response::{Response, charset_param};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
