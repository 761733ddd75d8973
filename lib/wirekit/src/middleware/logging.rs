//! Request/response logging stage.
//!
//! This stage logs full HTTP exchanges (line, headers, body) using the
//! `tracing` crate at a configurable level.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{Instrument, info_span, trace, warn};

use crate::pipeline::Stage;
use crate::{Error, Request, Response, Result};

/// Bodies longer than this are truncated in log output.
pub const MAX_LOGGED_BODY: usize = 4096;

/// Dispatch a `tracing` event at a runtime-selected [`LogLevel`].
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
        }
    };
}

/// Severity used by the logging stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level (the default).
    #[default]
    Debug,
    /// Info level.
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "critical" => Ok(Self::Error),
            other => Err(Error::invalid_config(format!("unknown log level: {other:?}"))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Layer that adds request/response logging.
///
/// # Example
///
/// ```ignore
/// use wirekit::middleware::{LogLevel, LoggingLayer};
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(LoggingLayer::with_level(LogLevel::Info))
///     .service(app);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

impl LoggingLayer {
    /// Create a new logging layer at the default level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer at the given level.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// Level used by services built from this layer.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Logging<S> {
    /// Create a new logging service wrapping the given service.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            level: LogLevel::default(),
        }
    }
}

fn preview(bytes: &[u8]) -> Cow<'_, str> {
    let shown = bytes.get(..MAX_LOGGED_BODY).unwrap_or(bytes);
    let text = String::from_utf8_lossy(shown);
    if shown.len() < bytes.len() {
        Cow::Owned(format!("{text}... ({} bytes total)", bytes.len()))
    } else {
        text
    }
}

fn request_body(request: &Request) -> String {
    request
        .body()
        .and_then(|payload| payload.to_bytes().ok())
        .map(|bytes| preview(&bytes).into_owned())
        .unwrap_or_default()
}

impl<S> Service<Request> for Logging<S>
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

    fn call(&mut self, request: Request) -> Self::Future {
        trace!(stage = %Stage::Logging, "entering stage");

        let method = request.method().clone();
        let url = request.url().to_string();
        let level = self.level;

        let span = info_span!("http_request", %method, %url);

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();

                log_at!(
                    level,
                    method = %method,
                    url = %url,
                    headers = ?request.headers(),
                    body = %request_body(&request),
                    "sending request"
                );

                let result = inner.call(request).await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        log_at!(
                            level,
                            status = response.status(),
                            elapsed_ms,
                            headers = ?response.headers(),
                            body = %preview(response.body()),
                            "received response"
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
