//! Prelude module for convenient imports.
//!
//! ```ignore
//! use wirekit::prelude::*;
//! ```

pub use crate::assertions;
pub use crate::config::PipelineConfig;
pub use crate::middleware::{CookieJar, LogLevel};
pub use crate::{
    Assertion, CallParams, Client, Error, Headers, HyperTransport, Method, Payload, Pipeline,
    QueryString, Request, Response, Result, build_request, handler_fn,
};
