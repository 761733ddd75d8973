//! HTTP request building.
//!
//! [`build_request`] turns loose call parameters (URL string, method name,
//! query, payload, headers) into a [`Request`]. Use [`Request::builder`] when
//! the parts are already typed.
//!
//! # Example
//!
//! ```
//! use wirekit_core::{Headers, Method, QueryString, build_request};
//!
//! let request = build_request(
//!     "/items",
//!     "get",
//!     Some(QueryString::from([("q", "shoe"), ("page", "2")])),
//!     None,
//!     Headers::from([("Accept", "application/json")]),
//! )
//! .expect("valid request");
//!
//! assert_eq!(request.method(), &Method::Get);
//! assert_eq!(request.query_string(), Some("q=shoe&page=2"));
//! ```

use url::Url;

use crate::{Error, Headers, Method, Payload, QueryString, Result};

/// Base used to resolve relative targets such as `/items`.
pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// An HTTP request with method, URL, headers, and optional body.
///
/// The query string lives in the URL and is either absent or a single
/// encoded string. `Clone` yields an independent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Payload>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Reassemble a request from its parts.
    #[must_use]
    pub const fn from_parts(
        method: Method,
        url: Url,
        headers: Headers,
        body: Option<Payload>,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Encoded query string, without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.url.query()
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, Headers, Option<Payload>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Payload>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends multiple headers, in order.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Replaces the whole query string.
    #[must_use]
    pub fn query_string(mut self, query: Option<&str>) -> Self {
        self.url.set_query(query);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Resolve a target URL, accepting relative paths.
///
/// Relative targets resolve against [`DEFAULT_BASE_URL`].
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] for an empty target and
/// [`Error::InvalidUrl`] when the target cannot be parsed.
pub fn resolve_url(target: &str) -> Result<Url> {
    let target = target.trim();
    if target.is_empty() {
        return Err(Error::invalid_request("missing url"));
    }

    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(DEFAULT_BASE_URL)?;
            Ok(base.join(target)?)
        }
        Err(err) => Err(err.into()),
    }
}

/// Build a [`Request`] from high-level call parameters.
///
/// - `method` is parsed case-insensitively; unknown but valid verbs pass through.
/// - `query_string` replaces any query already in `url`; an empty one is ignored.
///   A [`QueryString::Raw`] is sent as given except that characters not
///   allowed in a URL query are percent-encoded (a space becomes `%20`).
/// - `post` is stored as given, without interpretation.
/// - `headers` are added in order.
///
/// # Errors
///
/// Returns an error if the URL is missing or malformed, the method is not a
/// valid HTTP token, or the query cannot be encoded.
pub fn build_request(
    url: &str,
    method: &str,
    query_string: Option<QueryString>,
    post: Option<Payload>,
    headers: Headers,
) -> Result<Request> {
    let url = resolve_url(url)?;
    let method = method.parse::<Method>()?;

    let mut builder = Request::builder(method, url);
    if let Some(query) = query_string.as_ref().map(QueryString::encode).transpose()?.flatten() {
        builder = builder.query_string(Some(&query));
    }
    if let Some(post) = post {
        builder = builder.body(post);
    }

    Ok(builder.headers(headers).build())
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn request_builder_basic() {
        let url = Url::parse("https://api.example.com/items").expect("valid URL");
        let request = Request::builder(Method::Get, url)
            .header("Accept", "application/json")
            .build();

        check!(request.method() == &Method::Get);
        check!(request.url().as_str() == "https://api.example.com/items");
        check!(request.header("accept") == Some("application/json"));
        check!(request.body().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let url = Url::parse("https://api.example.com/items").expect("valid URL");
        let request = Request::builder(Method::Get, url)
            .query("page", "1")
            .query("limit", "10")
            .build();

        check!(request.query_string() == Some("page=1&limit=10"));
    }

    #[test]
    fn relative_url_resolves_against_localhost() {
        let url = resolve_url("/items").expect("url");
        check!(url.as_str() == "http://localhost/items");
    }

    #[test]
    fn build_request_upper_cases_method() {
        let request = build_request("/items", "post", None, None, Headers::new()).expect("request");
        check!(request.method() == &Method::Post);
        check!(request.method().to_string() == "POST");
    }

    #[test]
    fn build_request_encodes_query_mapping() {
        let request = build_request(
            "/items",
            "get",
            Some(QueryString::from([("q", "shoe"), ("page", "2")])),
            None,
            Headers::new(),
        )
        .expect("request");

        check!(request.query_string() == Some("q=shoe&page=2"));
        check!(request.path() == "/items");
    }

    #[test]
    fn build_request_without_query() {
        for query in [None, Some(QueryString::from("")), Some(QueryString::from(Vec::<(String, String)>::new()))] {
            let request = build_request("/items", "get", query, None, Headers::new()).expect("request");
            check!(request.query_string() == None);
        }
    }

    #[test]
    fn build_request_query_replaces_inline_query() {
        let request = build_request(
            "/items?stale=1",
            "get",
            Some(QueryString::from("fresh=1")),
            None,
            Headers::new(),
        )
        .expect("request");

        check!(request.query_string() == Some("fresh=1"));
    }

    #[test]
    fn raw_query_keeps_escapes_and_encodes_the_rest() {
        let encoded = build_request(
            "/search",
            "get",
            Some(QueryString::from("q=red+shoes%26socks&tag=a%2Fb")),
            None,
            Headers::new(),
        )
        .expect("request");
        check!(encoded.query_string() == Some("q=red+shoes%26socks&tag=a%2Fb"));

        let unencoded = build_request("/search", "get", Some(QueryString::from("q=red shoes")), None, Headers::new())
            .expect("request");
        check!(unencoded.query_string() == Some("q=red%20shoes"));
    }

    #[test]
    fn build_request_keeps_header_order() {
        let headers = Headers::from([("X-Trace", "abc"), ("Accept", "text/plain"), ("X-Other", "1")]);
        let request = build_request("/items", "get", None, None, headers.clone()).expect("request");
        check!(request.headers() == &headers);
    }

    #[test]
    fn build_request_passes_body_through() {
        let payload = Payload::form([("name", "widget")]);
        let request =
            build_request("/items", "put", None, Some(payload.clone()), Headers::new()).expect("request");
        check!(request.body() == Some(&payload));
    }

    #[test]
    fn build_request_accepts_extension_verb() {
        let request = build_request("/cache", "purge", None, None, Headers::new()).expect("request");
        check!(request.method().to_string() == "PURGE");
    }

    #[test]
    fn build_request_rejects_missing_url() {
        let result = build_request("", "get", None, None, Headers::new());
        let_assert!(Err(Error::InvalidRequest(message)) = result);
        check!(message == "missing url");
    }

    #[test]
    fn build_request_rejects_invalid_method() {
        let result = build_request("/items", "no such verb", None, None, Headers::new());
        let_assert!(Err(Error::InvalidRequest(_)) = result);
    }
}
