//! Canonical request header set

use std::collections::BTreeMap;

pub const IF_MATCH: &str = "If-Match";
pub const IF_NONE_MATCH: &str = "If-None-Match";
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
pub const IF_UNMODIFIED_SINCE: &str = "If-Unmodified-Since";
pub const RANGE: &str = "Range";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const CACHE_CONTROL: &str = "Cache-Control";
pub const AMZ_CHECKSUM_MODE: &str = "X-Amz-Checksum-Mode";
pub const AMZ_STORAGE_CLASS: &str = "X-Amz-Storage-Class";
pub const AMZ_TAGGING: &str = "X-Amz-Tagging";
pub const AMZ_META_PREFIX: &str = "X-Amz-Meta-";
pub const REPLICATION_PROXY_REQUEST: &str = "X-Minio-Source-Proxy-Request";

/// HTTP date format used by conditional headers (RFC 1123, always GMT)
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Header names to values, keyed by canonical header name.
///
/// Keys are normalized on write so `if-match` and `If-Match` address the same
/// entry. Iteration order is the sorted key order, which keeps every projection
/// of a request deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under the canonical form of `key`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(canonical_header_key(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&canonical_header_key(key)).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(&canonical_header_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&canonical_header_key(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Canonical MIME header form: first letter and every letter following a
/// hyphen upper-cased, the rest lower-cased (`content-type` -> `Content-Type`).
///
/// Keys containing bytes outside the HTTP token alphabet are returned as-is.
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
