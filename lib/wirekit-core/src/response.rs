//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body with JSON/text
//! helpers. Filter stages rebuild it through [`Response::into_parts`] or edit
//! it in place through [`Response::headers_mut`] and [`Response::set_body`].

use bytes::Bytes;

use crate::{Error, Headers, Result};

/// HTTP response with status, headers, and body.
///
/// `Clone` yields an independent snapshot: later edits to the original are
/// not visible through the copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: impl Into<Headers>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: headers.into(),
            body: body.into(),
        }
    }

    /// Empty response with the given status.
    #[must_use]
    pub const fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
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

    /// Media type from `Content-Type`, lower-cased and without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .and_then(|value| value.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase())
            .filter(|essence| !essence.is_empty())
    }

    /// `charset` parameter of `Content-Type`, if declared.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.header("content-type").and_then(charset_param)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, Headers, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Turn a 4xx/5xx response into [`Error::Http`], keeping the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is a client or server error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_client_error() || self.is_server_error() {
            let message = http::StatusCode::from_u16(self.status)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("unexpected status");
            return Err(Error::http_with_body(self.status, message, self.body));
        }
        Ok(self)
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

/// Extract the `charset` parameter from a `Content-Type` value.
#[must_use]
pub fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then_some(value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_basic() {
        let response = Response::new(
            200,
            [("Content-Type", "application/json")],
            Bytes::from(r#"{"id":1}"#),
        );

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        assert!(Response::with_status(301).is_redirection());
        assert!(Response::with_status(404).is_client_error());
        assert!(Response::with_status(500).is_server_error());
    }

    #[test]
    fn response_content_type_and_charset() {
        let response = Response::new(
            200,
            [("Content-Type", "Text/HTML; Charset=\"ISO-8859-1\"")],
            Bytes::new(),
        );
        assert_eq!(response.content_type().as_deref(), Some("text/html"));
        assert_eq!(response.charset(), Some("ISO-8859-1"));

        let response = Response::new(200, [("Content-Type", "text/plain")], Bytes::new());
        assert_eq!(response.charset(), None);
    }

    #[test]
    fn response_clone_is_independent() {
        let mut original = Response::new(200, [("X-A", "1")], "before");
        let snapshot = original.clone();

        original.set_body("after");
        original.headers_mut().insert("X-A", "2");

        assert_eq!(snapshot.body().as_ref(), b"before");
        assert_eq!(snapshot.header("x-a"), Some("1"));
    }

    #[test]
    fn response_error_for_status() {
        let err = Response::new(404, Headers::new(), "missing")
            .error_for_status()
            .expect_err("404");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP error 404: Not Found");
        assert_eq!(err.body(), Some(&Bytes::from_static(b"missing")));

        assert!(Response::with_status(204).error_for_status().is_ok());
    }

    #[test]
    fn response_json_and_text() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Item {
            id: u64,
        }

        let response = Response::new(200, Headers::new(), r#"{"id":7}"#);
        assert_eq!(response.json::<Item>().expect("json"), Item { id: 7 });
        assert_eq!(response.text().expect("text"), r#"{"id":7}"#);
    }
}
