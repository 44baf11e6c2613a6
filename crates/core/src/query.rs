//! Query parameter policy and multi-valued query sets

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;

/// Query keys defined by the S3 protocol that callers may set on GET/HEAD requests.
const STANDARD_QUERY_KEYS: &[&str] = &[
    "attributes",
    "partNumber",
    "versionId",
    "select",
    "select-type",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
];

/// Prefixes reserved for provider-specific query extensions.
const CUSTOM_QUERY_PREFIXES: &[&str] = &["x-"];

/// RFC 3986 unreserved characters stay literal, everything else is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn is_standard_query_key(key: &str) -> bool {
    STANDARD_QUERY_KEYS.contains(&key)
}

pub fn is_custom_query_key(key: &str) -> bool {
    CUSTOM_QUERY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

/// Whether `key` may be forwarded as a request query parameter.
pub fn is_supported_query_key(key: &str) -> bool {
    is_standard_query_key(key) || is_custom_query_key(key)
}

/// Multi-valued query parameters.
///
/// Keys iterate in sorted order; the values of one key keep the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(BTreeMap<String, Vec<String>>);

impl QueryValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Append `value` to the values of `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Render as `k=v&k=v`, keys sorted, values in stored order.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::new();
        for (key, values) in &self.0 {
            let key = utf8_percent_encode(key, QUERY_ENCODE_SET).to_string();
            for value in values {
                pairs.push(format!(
                    "{}={}",
                    key,
                    utf8_percent_encode(value, QUERY_ENCODE_SET)
                ));
            }
        }
        pairs.join("&")
    }
}
