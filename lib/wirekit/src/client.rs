//! Test-oriented HTTP client.
//!
//! A [`Client`] builds a request from loose call parameters, runs it through
//! its [`Pipeline`], hands snapshots of the exchange to an optional
//! [`Assertion`], and returns the response.
//!
//! # Example
//!
//! ```
//! use wirekit::{Client, Request, Response, assertions, handler_fn};
//!
//! let client = Client::builder()
//!     .app(handler_fn(|request: Request| {
//!         let body = request.query_string().unwrap_or_default().to_owned();
//!         Ok(Response::new(200, [("Content-Type", "text/plain")], body))
//!     }))
//!     .assert(assertions::success())
//!     .build();
//!
//! let response = client.get("/search").query_param("q", "shoe").send()?;
//! assert_eq!(response.text().as_deref(), Ok("q=shoe"));
//! # Ok::<(), wirekit::Error>(())
//! ```

use std::sync::Arc;

use tower_service::Service;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::transport::HyperTransport;
use crate::{Error, Headers, Payload, QueryString, Request, Response, Result, build_request};

/// Callback inspecting a finished exchange.
///
/// It receives owned snapshots of the request, as the terminal handler got it
/// after every stage ran (so with the jar's `Cookie` header), and of the
/// final response.
pub type Assertion = Arc<dyn Fn(Request, Response) + Send + Sync>;

/// Pick the assertion for one call: the per-call one, else the default.
#[must_use]
pub fn resolve_assertion(per_call: Option<&Assertion>, default: Option<&Assertion>) -> Option<Assertion> {
    per_call.or(default).cloned()
}

/// Parameters of a single call.
///
/// Only `url` is required; `method` defaults to `"get"`.
#[derive(Clone)]
pub struct CallParams {
    /// Target URL, absolute or relative to `http://localhost/`.
    pub url: String,
    /// Method name, case-insensitive.
    pub method: String,
    /// Query string replacing any query in `url`.
    pub query_string: Option<QueryString>,
    /// Request body.
    pub post: Option<Payload>,
    /// Extra request headers, in order.
    pub headers: Headers,
    /// Assertion overriding the client default for this call.
    pub assert: Option<Assertion>,
}

impl Default for CallParams {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "get".to_owned(),
            query_string: None,
            post: None,
            headers: Headers::new(),
            assert: None,
        }
    }
}

impl std::fmt::Debug for CallParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallParams")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("query_string", &self.query_string)
            .field("post", &self.post)
            .field("headers", &self.headers)
            .field("assert", &self.assert.is_some())
            .finish()
    }
}

impl CallParams {
    /// Parameters for `method` on `url`, everything else defaulted.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            ..Self::default()
        }
    }
}

/// HTTP client running calls through a [`Pipeline`].
///
/// Clones share the pipeline, and with it the cookie jar.
#[derive(Clone)]
pub struct Client {
    pipeline: Pipeline,
    assert: Option<Assertion>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("pipeline", &self.pipeline)
            .field("assert", &self.assert.is_some())
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client over the process-wide default pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pipeline(Pipeline::shared_default())
    }

    /// Client over the given pipeline, without a default assertion.
    #[must_use]
    pub const fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            assert: None,
        }
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The pipeline calls run through.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Perform one call.
    ///
    /// # Panics
    ///
    /// Propagates any panic raised by the effective assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or the pipeline fails.
    pub fn call(&self, params: CallParams) -> Result<Response> {
        let CallParams {
            url,
            method,
            query_string,
            post,
            headers,
            assert,
        } = params;

        let request = build_request(&url, &method, query_string, post, headers)?;
        let assertion = resolve_assertion(assert.as_ref(), self.assert.as_ref());

        debug!(method = %request.method(), url = %request.url(), "calling");
        let Some(assertion) = assertion else {
            return self.pipeline.handle(request);
        };

        let (delivered, response) = self.pipeline.exchange(request)?;
        assertion(delivered, response.clone());
        Ok(response)
    }

    /// Start a call with an arbitrary method.
    #[must_use]
    pub fn request(&self, method: &str, url: &str) -> Call<'_> {
        Call {
            client: self,
            params: CallParams::new(method, url),
            error: None,
        }
    }

    /// Start a GET call.
    #[must_use]
    pub fn get(&self, url: &str) -> Call<'_> {
        self.request("GET", url)
    }

    /// Start a POST call.
    #[must_use]
    pub fn post(&self, url: &str) -> Call<'_> {
        self.request("POST", url)
    }

    /// Start a PUT call.
    #[must_use]
    pub fn put(&self, url: &str) -> Call<'_> {
        self.request("PUT", url)
    }

    /// Start a DELETE call.
    #[must_use]
    pub fn delete(&self, url: &str) -> Call<'_> {
        self.request("DELETE", url)
    }

    /// Start a PATCH call.
    #[must_use]
    pub fn patch(&self, url: &str) -> Call<'_> {
        self.request("PATCH", url)
    }

    /// Start a HEAD call.
    #[must_use]
    pub fn head(&self, url: &str) -> Call<'_> {
        self.request("HEAD", url)
    }
}

/// Fluent builder for one call, finished with [`Call::send`].
#[must_use = "a call does nothing until sent"]
pub struct Call<'a> {
    client: &'a Client,
    params: CallParams,
    error: Option<Error>,
}

impl std::fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("params", &self.params)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Call<'_> {
    /// Set the whole query string.
    pub fn query(mut self, query: impl Into<QueryString>) -> Self {
        self.params.query_string = Some(query.into());
        self
    }

    /// Append one query parameter.
    pub fn query_param(mut self, name: &str, value: &str) -> Self {
        self.params.query_string = Some(match self.params.query_string.take() {
            None => QueryString::Pairs(vec![(name.to_owned(), value.to_owned())]),
            Some(QueryString::Pairs(mut pairs)) => {
                pairs.push((name.to_owned(), value.to_owned()));
                QueryString::Pairs(pairs)
            }
            Some(QueryString::Raw(raw)) => QueryString::Raw(
                url::form_urlencoded::Serializer::for_suffix(raw, 0)
                    .append_pair(name, value)
                    .finish(),
            ),
        });
        self
    }

    /// Set the request body.
    pub fn post(mut self, body: impl Into<Payload>) -> Self {
        self.params.post = Some(body.into());
        self
    }

    /// Send form fields as the body.
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.post = Some(Payload::form(fields));
        self
    }

    /// Send a value as a JSON body.
    ///
    /// A serialization failure is reported by [`Call::send`].
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        match Payload::json(value) {
            Ok(payload) => self.params.post = Some(payload),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Append a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.headers.append(name, value);
        self
    }

    /// Append request headers, in order.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.headers.extend(headers);
        self
    }

    /// Use this assertion instead of the client default.
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.params.assert = Some(assertion);
        self
    }

    /// Use this closure as the assertion for this call.
    pub fn assert_with<F>(self, f: F) -> Self
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.assert(Arc::new(f))
    }

    /// The parameters collected so far.
    #[must_use]
    pub const fn params(&self) -> &CallParams {
        &self.params
    }

    /// Perform the call.
    ///
    /// # Panics
    ///
    /// Propagates any panic raised by the effective assertion.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub fn send(self) -> Result<Response> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.client.call(self.params)
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    pipeline: Option<Pipeline>,
    pipeline_builder: Option<PipelineBuilder>,
    assert: Option<Assertion>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("pipeline", &self.pipeline)
            .field("pipeline_builder", &self.pipeline_builder)
            .field("assert", &self.assert.is_some())
            .finish()
    }
}

impl ClientBuilder {
    fn pipeline_builder(&mut self) -> PipelineBuilder {
        self.pipeline_builder.take().unwrap_or_default()
    }

    /// Use an existing pipeline, shared with its other users.
    #[must_use]
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build a dedicated pipeline with this configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_builder = Some(self.pipeline_builder().config(config));
        self
    }

    /// Build a dedicated pipeline around an in-process handler.
    #[must_use]
    pub fn app<S>(mut self, app: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.pipeline_builder = Some(self.pipeline_builder().app(app));
        self
    }

    /// Build a dedicated pipeline around a configured transport.
    #[must_use]
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.pipeline_builder = Some(self.pipeline_builder().transport(transport));
        self
    }

    /// Default assertion for every call.
    #[must_use]
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assert = Some(assertion);
        self
    }

    /// Default assertion for every call, from a closure.
    #[must_use]
    pub fn assert_with<F>(self, f: F) -> Self
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.assert(Arc::new(f))
    }

    /// Build the client.
    ///
    /// An explicit pipeline wins; otherwise a dedicated one is built when
    /// any pipeline option was given, else the shared default is used.
    #[must_use]
    pub fn build(self) -> Client {
        let pipeline = match (self.pipeline, self.pipeline_builder) {
            (Some(pipeline), _) => pipeline,
            (None, Some(builder)) => builder.build(),
            (None, None) => Pipeline::shared_default(),
        };
        Client {
            pipeline,
            assert: self.assert,
        }
    }
}
