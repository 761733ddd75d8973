//! Cookie persistence stage.
//!
//! Stores `Set-Cookie` headers from responses in a [`CookieJar`] and replays
//! the matching cookies on later requests. The jar belongs to the pipeline it
//! was built into; clones of that pipeline share it.
//!
//! # Example
//!
//! ```
//! use wirekit::middleware::CookieJar;
//!
//! let jar = CookieJar::new();
//! let url = url::Url::parse("http://localhost/account/login").expect("url");
//! jar.store(&url, "session=abc123; Path=/");
//!
//! assert_eq!(jar.cookie_header(&url).as_deref(), Some("session=abc123"));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use cookie_store::CookieStore;
use tower::{Layer, Service};
use tracing::{debug, trace};
use url::Url;

pub use cookie::Cookie;

use crate::pipeline::Stage;
use crate::{Error, Headers, Request, Response, Result};

/// Rewrite an `Expires` date stamped `UTC` to the `GMT` form cookie dates use.
fn normalise_expires(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .map(|attribute| match attribute.split_once('=') {
            Some((name, value)) if name.trim().eq_ignore_ascii_case("expires") => {
                let value = value.trim();
                value
                    .strip_suffix("UTC")
                    .or_else(|| value.strip_suffix("utc"))
                    .map_or_else(|| attribute.to_owned(), |date| format!("{name}={date}GMT"))
            }
            _ => attribute.to_owned(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Thread-safe RFC 6265 cookie store shared by clones of a pipeline.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    store: Arc<Mutex<CookieStore>>,
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut CookieStore) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    /// Store one `Set-Cookie` value received from `url`.
    ///
    /// Returns `false` when the header is malformed or the cookie is refused
    /// (foreign domain, already expired). An expired cookie still evicts the
    /// stored cookie with the same name, domain and path.
    pub fn store(&self, url: &Url, set_cookie: &str) -> bool {
        let cookie = match Cookie::parse(normalise_expires(set_cookie)) {
            Ok(cookie) => cookie,
            Err(err) => {
                debug!(%err, "ignoring malformed Set-Cookie");
                return false;
            }
        };

        match self.with_store(|store| store.insert_raw(&cookie, url)) {
            Ok(_) => true,
            Err(err) => {
                debug!(cookie = cookie.name(), %url, error = ?err, "cookie not stored");
                false
            }
        }
    }

    /// Store every `Set-Cookie` header of a response received from `url`.
    pub fn store_response(&self, url: &Url, headers: &Headers) {
        for set_cookie in headers.get_all("set-cookie") {
            self.store(url, set_cookie);
        }
    }

    /// Name/value pairs of the live cookies to send to `url`.
    #[must_use]
    pub fn matching(&self, url: &Url) -> Vec<(String, String)> {
        self.with_store(|store| {
            store
                .get_request_values(url)
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect()
        })
    }

    /// `Cookie` header value for `url`, if any cookie matches.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        merge_cookie_header(None, &self.matching(url))
    }

    /// First live cookie with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Cookie<'static>> {
        self.with_store(|store| {
            store
                .iter_unexpired()
                .find(|cookie| cookie.name() == name)
                .map(|cookie| (**cookie).clone())
        })
    }

    /// Snapshot of every live cookie.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.with_store(|store| store.iter_unexpired().map(|cookie| (**cookie).clone()).collect())
    }

    /// Number of live cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_store(|store| store.iter_unexpired().count())
    }

    /// Returns `true` if the jar holds no live cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored cookie.
    pub fn clear(&self) {
        self.with_store(CookieStore::clear);
    }
}

/// Layer that persists cookies across requests.
#[derive(Debug, Clone, Default)]
pub struct CookieLayer {
    jar: CookieJar,
}

impl CookieLayer {
    /// Create a cookie layer with a fresh jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cookie layer backed by an existing jar.
    #[must_use]
    pub const fn with_jar(jar: CookieJar) -> Self {
        Self { jar }
    }

    /// The jar used by services built from this layer.
    #[must_use]
    pub const fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

impl<S> Layer<S> for CookieLayer {
    type Service = Cookies<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cookies {
            inner,
            jar: self.jar.clone(),
        }
    }
}

/// Service that adds stored cookies to requests and records new ones.
#[derive(Debug, Clone)]
pub struct Cookies<S> {
    inner: S,
    jar: CookieJar,
}

/// Merge jar cookies into a caller-supplied `Cookie` header.
///
/// Names the caller already sends are not overridden by the jar.
fn merge_cookie_header(caller: Option<&str>, jar: &[(String, String)]) -> Option<String> {
    let mut pairs: Vec<String> = caller
        .into_iter()
        .flat_map(|header| header.split(';'))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(str::to_owned)
        .collect();
    let caller_names: Vec<String> = pairs
        .iter()
        .map(|pair| pair.split_once('=').map_or(pair.as_str(), |(name, _)| name).trim().to_owned())
        .collect();

    pairs.extend(
        jar.iter()
            .filter(|(name, _)| !caller_names.contains(name))
            .map(|(name, value)| format!("{name}={value}")),
    );

    (!pairs.is_empty()).then(|| pairs.join("; "))
}

impl<S> Service<Request> for Cookies<S>
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
        trace!(stage = %Stage::Cookies, "entering stage");

        let url = request.url().clone();
        let stored = self.jar.matching(&url);
        if !stored.is_empty()
            && let Some(header) = merge_cookie_header(request.header("cookie"), &stored)
        {
            request.headers_mut().insert("Cookie", header);
        }

        let jar = self.jar.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(request).await?;
            jar.store_response(&url, response.headers());
            Ok(response)
        })
    }
}
