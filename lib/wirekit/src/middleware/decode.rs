//! Content decoding stage.
//!
//! Advertises `Accept-Encoding` on the way in and undoes the response's
//! `Content-Encoding` on the way out, so later stages and callers always see
//! the identity body. Supports gzip, deflate, br (brotli) and zstd.

use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{debug, trace};

use crate::pipeline::Stage;
use crate::{Error, Request, Response, Result};

/// Value sent in `Accept-Encoding` when the caller did not set one.
pub const ACCEPT_ENCODING: &str = "gzip, deflate, br, zstd";

/// Layer that enables transparent response decoding.
///
/// # Example
///
/// ```ignore
/// use wirekit::middleware::DecodeLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(DecodeLayer::new())
///     .service(app);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeLayer {
    _private: (),
}

impl DecodeLayer {
    /// Create a new decode layer.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl<S> Layer<S> for DecodeLayer {
    type Service = Decode<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Decode { inner }
    }
}

/// Service that decodes compressed response bodies.
#[derive(Debug, Clone)]
pub struct Decode<S> {
    inner: S,
}

impl<S> Decode<S> {
    /// Create a new decode service wrapping the given service.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn read_all(coding: &str, mut reader: impl Read) -> Result<Bytes> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|e| Error::decode(coding, e.to_string()))?;
    Ok(Bytes::from(decoded))
}

/// Undo a single content coding.
///
/// Returns `Ok(None)` for codings this stage does not understand.
fn decode_one(coding: &str, body: &Bytes) -> Result<Option<Bytes>> {
    let decoded = match coding {
        "gzip" | "x-gzip" => read_all(coding, flate2::read::GzDecoder::new(body.as_ref()))?,
        "deflate" => read_all(coding, flate2::read::ZlibDecoder::new(body.as_ref()))?,
        "br" => read_all(coding, brotli::Decompressor::new(body.as_ref(), 4096))?,
        "zstd" => {
            let decoded = zstd::decode_all(body.as_ref())
                .map_err(|e| Error::decode(coding, e.to_string()))?;
            Bytes::from(decoded)
        }
        "identity" => body.clone(),
        _ => return Ok(None),
    };
    Ok(Some(decoded))
}

/// Decode `body` according to a `Content-Encoding` header value.
///
/// Codings are undone last-applied first. Decoding stops at the first
/// unknown coding; the codings still applied are returned alongside the body.
///
/// # Errors
///
/// Returns [`Error::Decode`] when a recognised coding fails to decode.
pub fn decode_body(content_encoding: &str, body: Bytes) -> Result<(Bytes, Vec<String>)> {
    let mut remaining: Vec<String> = content_encoding
        .split(',')
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty())
        .collect();

    let mut body = body;
    while let Some(coding) = remaining.last() {
        match decode_one(coding, &body)? {
            Some(decoded) => {
                body = decoded;
                remaining.pop();
            }
            None => {
                debug!(coding = %coding, "unsupported content encoding left in place");
                break;
            }
        }
    }

    Ok((body, remaining))
}

fn decode_response(response: Response) -> Result<Response> {
    let Some(encoding) = response.header("content-encoding").map(str::to_owned) else {
        return Ok(response);
    };
    if response.body().is_empty() {
        return Ok(response);
    }

    let (status, mut headers, body) = response.into_parts();
    let (body, remaining) = decode_body(&encoding, body)?;

    if remaining.is_empty() {
        headers.remove("content-encoding");
    } else {
        headers.insert("Content-Encoding", remaining.join(", "));
    }
    if headers.contains("content-length") {
        headers.insert("Content-Length", body.len().to_string());
    }

    Ok(Response::new(status, headers, body))
}

impl<S> Service<Request> for Decode<S>
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
        trace!(stage = %Stage::Decode, "entering stage");

        if !request.headers().contains("accept-encoding") {
            request.headers_mut().append("Accept-Encoding", ACCEPT_ENCODING);
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(request).await?;
            decode_response(response)
        })
    }
}
