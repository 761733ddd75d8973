//! Filter pipeline assembly and the blocking call boundary.
//!
//! A [`Pipeline`] wraps exactly one terminal handler in the filter stages
//! selected by a [`PipelineConfig`]. The order is fixed, outermost first:
//! charset, cookies, logging, decode, then the handler.
//!
//! # Example
//!
//! ```
//! use wirekit::{Pipeline, Request, Response, handler_fn, middleware::LogLevel};
//!
//! let pipeline = Pipeline::builder()
//!     .logging(true)
//!     .log_level(LogLevel::Info)
//!     .app(handler_fn(|_request: Request| Ok(Response::with_status(204))))
//!     .build();
//!
//! let request = wirekit::build_request("/ping", "get", None, None, Default::default())?;
//! assert_eq!(pipeline.handle(request)?.status(), 204);
//! # Ok::<(), wirekit::Error>(())
//! ```

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::task::{Context, Poll};
use std::thread;

use tokio::runtime::{Handle, Runtime};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::middleware::{CharsetLayer, CookieJar, CookieLayer, DecodeLayer, LogLevel, LoggingLayer};
use crate::transport::HyperTransport;
use crate::{Error, Request, Response, Result};

/// Type-erased service for stage composition.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for the Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// A filter stage, as reported by [`Pipeline::stages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Charset normalisation.
    Charset,
    /// Cookie persistence.
    Cookies,
    /// Request/response logging.
    Logging,
    /// Content decoding.
    Decode,
}

impl Stage {
    /// Short stage name, as used in log events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Charset => "charset",
            Self::Cookies => "cookies",
            Self::Logging => "logging",
            Self::Decode => "decode",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Thread-safe wrapper for `BoxedService`.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(async move {
            std::future::poll_fn(|cx| service.poll_ready(cx)).await?;
            service.call(request).await
        })
    }
}

tokio::task_local! {
    /// Slot receiving the request as the terminal handler got it.
    static DELIVERED: Arc<Mutex<Option<Request>>>;
}

/// Copy the request into the current call's slot, if it opened one.
fn record_delivered(request: Request) -> Request {
    DELIVERED
        .try_with(|slot| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        })
        .ok();
    request
}

/// Process-wide runtime driving blocking calls.
fn runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();

    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("wirekit")
        .enable_all()
        .build()?;
    Ok(RUNTIME.get_or_init(|| runtime))
}

/// Block the calling thread on `future`, driven by the shared runtime.
///
/// A thread already inside a runtime context may not block on another one,
/// so the call then runs on a scoped helper thread and this thread waits
/// for it. Panics raised during the call are resumed here.
fn block_on<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
    T: Send,
{
    let runtime = runtime()?;
    if Handle::try_current().is_err() {
        return runtime.block_on(future);
    }

    thread::scope(|scope| {
        scope
            .spawn(move || runtime.block_on(future))
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    })
}

/// A terminal handler wrapped in its filter stages.
///
/// Clones share the same stages and the same cookie jar.
#[derive(Clone)]
pub struct Pipeline {
    service: SyncService,
    stages: Arc<[Stage]>,
    cookie_jar: Option<CookieJar>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The process-wide default pipeline.
    ///
    /// Network transport with decoding and cookies on and logging off. It is
    /// built on first use; every caller gets a clone, so all of them share
    /// one cookie jar.
    #[must_use]
    pub fn shared_default() -> Self {
        static DEFAULT: OnceLock<Pipeline> = OnceLock::new();
        DEFAULT.get_or_init(|| Self::builder().build()).clone()
    }

    /// Stages in call order, outermost first.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Configuration this pipeline was built from.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cookie jar, when cookie support is enabled.
    #[must_use]
    pub const fn cookie_jar(&self) -> Option<&CookieJar> {
        self.cookie_jar.as_ref()
    }

    /// Run a request through every stage and the handler, blocking until
    /// the response is ready.
    ///
    /// Safe to call from an in-process handler of another pipeline or from
    /// async code, though it blocks that thread; async callers should prefer
    /// the [`Service`] implementation.
    ///
    /// # Errors
    ///
    /// Returns whatever error a stage or the handler produced.
    pub fn handle(&self, request: Request) -> Result<Response> {
        block_on(self.service.call(request))
    }

    /// Like [`Pipeline::handle`], also returning the request as the terminal
    /// handler received it, after every request-side stage ran.
    ///
    /// # Errors
    ///
    /// Returns whatever error a stage or the handler produced.
    pub fn exchange(&self, request: Request) -> Result<(Request, Response)> {
        let slot = Arc::new(Mutex::new(None));
        let built = request.clone();

        let response = block_on(DELIVERED.scope(Arc::clone(&slot), self.service.call(request)))?;

        let delivered = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok((delivered.unwrap_or(built), response))
    }
}

impl Service<Request> for Pipeline {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // The wrapped service is polled when called
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    app: Option<BoxedService>,
    default_charset: Option<String>,
    cookie_jar: Option<CookieJar>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("has_app", &self.app.is_some())
            .field("default_charset", &self.default_charset)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable response decoding.
    #[must_use]
    pub fn content_decoding(mut self, enabled: bool) -> Self {
        self.config.content_decoding = enabled;
        self
    }

    /// Enable or disable cookie persistence.
    #[must_use]
    pub fn cookie_support(mut self, enabled: bool) -> Self {
        self.config.cookie_support = enabled;
        self
    }

    /// Enable or disable request/response logging.
    #[must_use]
    pub fn logging(mut self, enabled: bool) -> Self {
        self.config.logging = enabled;
        self
    }

    /// Set the logging level.
    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = Some(level);
        self
    }

    /// Use an in-process terminal handler.
    #[must_use]
    pub fn app<S>(mut self, app: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.app = Some(BoxCloneService::new(app));
        self
    }

    /// Use a configured network transport as the terminal handler.
    #[must_use]
    pub fn transport(self, transport: HyperTransport) -> Self {
        self.app(transport)
    }

    /// Charset assumed for textual bodies that declare none.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = Some(charset.into());
        self
    }

    /// Back the cookie stage with an existing jar.
    #[must_use]
    pub fn cookie_jar(mut self, jar: CookieJar) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let config = self.config;
        let app = self
            .app
            .unwrap_or_else(|| BoxCloneService::new(HyperTransport::new()));
        let mut service = BoxCloneService::new(app.map_request(record_delivered));
        let mut stages = Vec::with_capacity(4);

        // Innermost first
        if config.content_decoding {
            service = BoxCloneService::new(DecodeLayer::new().layer(service));
            stages.push(Stage::Decode);
        }
        if config.logging {
            let layer = LoggingLayer::with_level(config.effective_log_level());
            service = BoxCloneService::new(layer.layer(service));
            stages.push(Stage::Logging);
        }
        let cookie_jar = config
            .cookie_support
            .then(|| self.cookie_jar.unwrap_or_default());
        if let Some(jar) = &cookie_jar {
            service = BoxCloneService::new(CookieLayer::with_jar(jar.clone()).layer(service));
            stages.push(Stage::Cookies);
        }
        let charset = self
            .default_charset
            .map_or_else(CharsetLayer::new, CharsetLayer::with_default);
        service = BoxCloneService::new(charset.layer(service));
        stages.push(Stage::Charset);

        stages.reverse();
        debug!(stages = ?stages, "pipeline built");

        Pipeline {
            service: SyncService::new(service),
            stages: stages.into(),
            cookie_jar,
            config,
        }
    }
}
