//! Request payloads and body serialization helpers.

use bytes::Bytes;

use crate::Result;

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns `true` for media types whose body is text and carries a charset.
///
/// Parameters (`; charset=...`) are ignored.
#[must_use]
pub fn is_textual(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("/json")
        || essence.ends_with("+json")
        || essence.ends_with("/xml")
        || essence.ends_with("+xml")
        || essence == "application/javascript"
        || essence == ContentType::FormUrlEncoded.as_str()
}

/// Body payload of a request.
///
/// The request builder stores it as given; encoding happens at the terminal
/// handler through [`Payload::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw bytes, sent verbatim.
    Raw(Bytes),
    /// Form fields, URL-encoded in order.
    Form(Vec<(String, String)>),
    /// An already serialized JSON document.
    Json(Bytes),
}

impl Payload {
    /// Form payload from key/value pairs, keeping their order.
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// JSON payload serialized from `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        to_json(value).map(Self::Json)
    }

    /// Content type implied by the payload, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::Raw(_) => None,
            Self::Form(_) => Some(ContentType::FormUrlEncoded),
            Self::Json(_) => Some(ContentType::Json),
        }
    }

    /// Returns `true` if the encoded payload would be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(bytes) | Self::Json(bytes) => bytes.is_empty(),
            Self::Form(fields) => fields.is_empty(),
        }
    }

    /// Encode the payload into wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if form encoding fails.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Raw(bytes) | Self::Json(bytes) => Ok(bytes.clone()),
            Self::Form(fields) => to_form(fields),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Raw(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(bytes))
    }
}

impl From<&'static str> for Payload {
    fn from(text: &'static str) -> Self {
        Self::Raw(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Raw(Bytes::from(text))
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use wirekit_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Item { name: String }
///
/// let item = Item { name: "widget".to_string() };
/// let bytes = to_json(&item).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"widget"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Accepts structs as well as ordered sequences of `(key, value)` pairs.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use wirekit_core::to_form;
///
/// let bytes = to_form(&[("name", "widget"), ("size", "L")][..]).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"name=widget&size=L");
/// ```
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "item.tags[2]").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_as_str() {
        assert_eq!(ContentType::Json.as_str(), "application/json");
        assert_eq!(
            ContentType::FormUrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(ContentType::PlainText.to_string(), "text/plain");
    }

    #[test]
    fn textual_media_types() {
        assert!(is_textual("text/html"));
        assert!(is_textual("Text/Plain; charset=latin1"));
        assert!(is_textual("application/json"));
        assert!(is_textual("application/problem+json"));
        assert!(is_textual("application/atom+xml"));
        assert!(is_textual("application/x-www-form-urlencoded"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual("application/octet-stream"));
    }

    #[test]
    fn form_payload_keeps_order() {
        let payload = Payload::form([("name", "widget"), ("colour", "dark blue")]);
        let bytes = payload.to_bytes().expect("encode");
        assert_eq!(bytes.as_ref(), b"name=widget&colour=dark+blue");
        assert_eq!(payload.content_type(), Some(ContentType::FormUrlEncoded));
    }

    #[test]
    fn json_payload() {
        #[derive(serde::Serialize)]
        struct Item {
            name: String,
        }

        let payload = Payload::json(&Item {
            name: "widget".to_string(),
        })
        .expect("json");
        assert_eq!(payload.content_type(), Some(ContentType::Json));
        assert_eq!(
            payload.to_bytes().expect("encode").as_ref(),
            br#"{"name":"widget"}"#
        );
    }

    #[test]
    fn raw_payload_is_opaque() {
        let payload = Payload::from("a=b&c");
        assert_eq!(payload.content_type(), None);
        assert_eq!(payload.to_bytes().expect("encode").as_ref(), b"a=b&c");
        assert!(Payload::from(String::new()).is_empty());
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User> = from_json(br#"{"address":{}}"#);

        let msg = result.expect_err("should fail").to_string();
        assert!(
            msg.contains("address"),
            "Expected path 'address' in error: {msg}"
        );
        assert!(
            msg.contains("city"),
            "Expected field 'city' mentioned in error: {msg}"
        );
    }
}
