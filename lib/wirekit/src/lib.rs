//! Composable HTTP filter pipeline with a test-oriented client.
//!
//! A [`Pipeline`] wraps one terminal handler (an in-process app built with
//! [`handler_fn`], or the network [`HyperTransport`]) in filter stages:
//! charset normalisation, cookie persistence, logging and content decoding.
//! A [`Client`] drives calls through it and can check every exchange with an
//! [`Assertion`].
//!
//! # Example
//!
//! ```
//! use wirekit::{Client, Request, Response, assertions, handler_fn};
//!
//! let app = handler_fn(|request: Request| {
//!     let visits = if request.header("cookie").is_some() { "again" } else { "first" };
//!     Ok(Response::new(
//!         200,
//!         [("Content-Type", "text/plain"), ("Set-Cookie", "seen=1")],
//!         visits,
//!     ))
//! });
//!
//! let client = Client::builder().app(app).assert(assertions::status(200)).build();
//!
//! assert_eq!(client.get("/").send()?.text().as_deref(), Ok("first"));
//! assert_eq!(client.get("/").send()?.text().as_deref(), Ok("again"));
//! # Ok::<(), wirekit::Error>(())
//! ```

pub mod assertions;
mod client;
pub mod config;
mod connector;
mod handler;
pub mod middleware;
mod pipeline;
pub mod prelude;
mod transport;

pub use client::{Assertion, Call, CallParams, Client, ClientBuilder, resolve_assertion};
pub use handler::{HandlerFn, handler_fn};
pub use pipeline::{BoxedService, Pipeline, PipelineBuilder, ServiceFuture, Stage};
pub use transport::HyperTransport;

// Re-export tower for stage composition
pub use tower;

// Re-export core types
pub use wirekit_core::{
    ContentType, DEFAULT_BASE_URL, Error, Headers, Method, Payload, QueryString, Request,
    RequestBuilder, Response, Result, ToQueryPairs, build_request, charset_param, from_json,
    is_textual, resolve_url, to_form, to_json, to_query_string,
};

// Re-export http types for status codes and headers
pub use wirekit_core::{StatusCode, header};

pub use url;
