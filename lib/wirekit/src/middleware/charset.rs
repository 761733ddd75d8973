//! Charset normalisation stage.
//!
//! Outgoing textual bodies get an explicit charset. Incoming textual bodies
//! end up labelled (and, for the Latin-1 family, transcoded) as UTF-8.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{debug, trace};

use crate::pipeline::Stage;
use crate::{Error, Request, Response, Result, charset_param, is_textual};

/// Charset assumed when a textual message declares none.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Layer that normalises declared charsets.
#[derive(Debug, Clone)]
pub struct CharsetLayer {
    default_charset: String,
}

impl Default for CharsetLayer {
    fn default() -> Self {
        Self::with_default(DEFAULT_CHARSET)
    }
}

impl CharsetLayer {
    /// Create a charset layer defaulting to UTF-8.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a charset layer with another default charset.
    #[must_use]
    pub fn with_default(charset: impl Into<String>) -> Self {
        Self {
            default_charset: charset.into(),
        }
    }
}

impl<S> Layer<S> for CharsetLayer {
    type Service = Charset<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Charset {
            inner,
            default_charset: self.default_charset.clone(),
        }
    }
}

/// Service that normalises request and response charsets.
#[derive(Debug, Clone)]
pub struct Charset<S> {
    inner: S,
    default_charset: String,
}

/// Replace (or add) the `charset` parameter of a `Content-Type` value.
#[must_use]
pub fn set_charset(content_type: &str, charset: &str) -> String {
    let mut parts = content_type.split(';');
    let essence = parts.next().unwrap_or_default().trim();
    let mut value = essence.to_owned();
    for param in parts.map(str::trim).filter(|param| !param.is_empty()) {
        let is_charset = param
            .split_once('=')
            .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("charset"));
        if !is_charset {
            value.push_str("; ");
            value.push_str(param);
        }
    }
    value.push_str("; charset=");
    value.push_str(charset);
    value
}

fn is_utf8_alias(charset: &str) -> bool {
    matches!(charset.to_ascii_lowercase().as_str(), "utf-8" | "utf8")
}

fn is_latin1_family(charset: &str) -> bool {
    matches!(
        charset.to_ascii_lowercase().as_str(),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii"
    )
}

/// Every Latin-1 byte is the Unicode scalar of the same value.
fn latin1_to_utf8(bytes: &[u8]) -> Bytes {
    let text: String = bytes.iter().copied().map(char::from).collect();
    Bytes::from(text)
}

fn normalise_request(request: &mut Request, default_charset: &str) {
    if request.body().is_none() {
        return;
    }
    let Some(content_type) = request.header("content-type") else {
        return;
    };
    if !is_textual(content_type) || charset_param(content_type).is_some() {
        return;
    }

    let content_type = set_charset(content_type, default_charset);
    request.headers_mut().insert("Content-Type", content_type);
}

fn normalise_response(mut response: Response, default_charset: &str) -> Response {
    let Some(content_type) = response.header("content-type").map(str::to_owned) else {
        return response;
    };
    if !is_textual(&content_type) {
        return response;
    }

    match charset_param(&content_type) {
        None => {
            let relabelled = set_charset(&content_type, default_charset);
            response.headers_mut().insert("Content-Type", relabelled);
        }
        Some(charset) if is_utf8_alias(charset) => {
            let relabelled = set_charset(&content_type, DEFAULT_CHARSET);
            response.headers_mut().insert("Content-Type", relabelled);
        }
        Some(charset) if is_latin1_family(charset) => {
            debug!(charset, "transcoding response body to utf-8");
            let body = latin1_to_utf8(response.body());
            let relabelled = set_charset(&content_type, DEFAULT_CHARSET);
            response.headers_mut().insert("Content-Type", relabelled);
            if response.headers().contains("content-length") {
                response
                    .headers_mut()
                    .insert("Content-Length", body.len().to_string());
            }
            response.set_body(body);
        }
        Some(_) => {}
    }

    response
}

impl<S> Service<Request> for Charset<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        trace!(stage = %Stage::Charset, "entering stage");

        normalise_request(&mut request, &self.default_charset);

        let default_charset = self.default_charset.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(request).await?;
            Ok(normalise_response(response, &default_charset))
        })
    }
}
