//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use wirekit_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, Headers, Method, Payload, QueryString, Request, RequestBuilder, Response,
    Result, build_request, from_json, to_form, to_json,
};
