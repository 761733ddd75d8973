//! Query string parameters.

use crate::Result;

/// Trait for types that can be converted to query parameter pairs.
pub trait ToQueryPairs {
    /// Convert this type to a vector of key-value pairs for query parameters.
    fn to_query_pairs(&self) -> Vec<(String, String)>;
}

/// Query string input for a request.
///
/// Pairs are percent-encoded in insertion order. A raw string keeps its
/// existing escapes (`%xx`, `+`) byte for byte, but characters a URL query
/// cannot carry (spaces, controls, `"`, `#`, `<`, `>`, `'`, non-ASCII) are
/// percent-encoded when it is placed in the URL. Empty input of either kind
/// means "no query string".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryString {
    /// Ordered key/value pairs.
    Pairs(Vec<(String, String)>),
    /// A pre-built query string, expected to be percent-encoded already.
    Raw(String),
}

impl QueryString {
    /// Query from a [`ToQueryPairs`] implementor.
    pub fn from_query<T: ToQueryPairs + ?Sized>(value: &T) -> Self {
        Self::Pairs(value.to_query_pairs())
    }

    /// Query serialized from any `serde::Serialize` value (struct, map, pairs).
    ///
    /// # Errors
    ///
    /// Returns an error if query serialization fails.
    pub fn serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        to_query_string(value).map(Self::Raw)
    }

    /// Returns `true` if the query carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Raw(raw) => raw.is_empty(),
        }
    }

    /// Encode into the single string placed after `?`, or `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns an error if query serialization fails.
    pub fn encode(&self) -> Result<Option<String>> {
        if self.is_empty() {
            return Ok(None);
        }
        match self {
            Self::Pairs(pairs) => to_query_string(pairs).map(Some),
            Self::Raw(raw) => Ok(Some(raw.clone())),
        }
    }
}

impl From<&str> for QueryString {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for QueryString {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl<K, V> FromIterator<(K, V)> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Pairs(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> From<Vec<(K, V)>> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

/// Serialize a value to a query string.
///
/// Uses `serde_html_form`, which supports `Vec<T>` for repeated parameters
/// (e.g., `?tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if query serialization fails.
///
/// # Example
///
/// ```
/// use wirekit_core::to_query_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search {
///     q: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     page: Option<u32>,
/// }
///
/// let search = Search { q: "shoe".to_string(), page: Some(2) };
/// let query = to_query_string(&search).expect("serialize");
/// assert_eq!(query, "q=shoe&page=2");
/// ```
pub fn to_query_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_html_form::to_string(value).map_err(Into::into)
}
