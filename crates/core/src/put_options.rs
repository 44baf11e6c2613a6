//! Options for PUT object requests

use crate::encrypt::ServerSide;
use crate::error::{Error, Result};
use crate::headers::{self, Headers};
use crate::query::QueryValues;
use std::collections::BTreeMap;

const MAX_TAGS: usize = 10;
const MAX_TAG_KEY_LEN: usize = 128;
const MAX_TAG_VALUE_LEN: usize = 256;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Headers sent on an object upload
#[derive(Debug, Clone, Default)]
pub struct PutObjectOptions {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub storage_class: Option<String>,
    /// Stored as `X-Amz-Meta-*` headers
    pub user_metadata: BTreeMap<String, String>,
    pub user_tags: BTreeMap<String, String>,
    /// Every variant applies to uploads
    pub server_side_encryption: Option<ServerSide>,
}

impl PutObjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_tags.insert(key.into(), value.into());
        self
    }

    pub fn with_server_side_encryption(mut self, sse: ServerSide) -> Self {
        self.server_side_encryption = Some(sse);
        self
    }

    /// Check the tag set against the store's limits.
    pub fn validate(&self) -> Result<()> {
        if self.user_tags.len() > MAX_TAGS {
            return Err(Error::InvalidArgument(format!(
                "Too many tags: {} (maximum {})",
                self.user_tags.len(),
                MAX_TAGS
            )));
        }
        for (key, value) in &self.user_tags {
            if key.is_empty() || key.chars().count() > MAX_TAG_KEY_LEN {
                return Err(Error::InvalidArgument(format!(
                    "Tag key must be 1 to {} characters: {:?}",
                    MAX_TAG_KEY_LEN, key
                )));
            }
            if value.chars().count() > MAX_TAG_VALUE_LEN {
                return Err(Error::InvalidArgument(format!(
                    "Tag value for {:?} exceeds {} characters",
                    key, MAX_TAG_VALUE_LEN
                )));
            }
        }
        Ok(())
    }

    /// Final request headers.
    pub fn header(&self) -> Headers {
        let mut headers = Headers::new();

        headers.set(
            headers::CONTENT_TYPE,
            self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
        );
        if let Some(encoding) = &self.content_encoding {
            headers.set(headers::CONTENT_ENCODING, encoding.as_str());
        }
        if let Some(disposition) = &self.content_disposition {
            headers.set(headers::CONTENT_DISPOSITION, disposition.as_str());
        }
        if let Some(cache_control) = &self.cache_control {
            headers.set(headers::CACHE_CONTROL, cache_control.as_str());
        }
        if let Some(storage_class) = &self.storage_class {
            headers.set(headers::AMZ_STORAGE_CLASS, storage_class.as_str());
        }

        for (key, value) in &self.user_metadata {
            headers.set(&metadata_header_key(key), value.as_str());
        }

        if !self.user_tags.is_empty() {
            let mut tags = QueryValues::new();
            for (key, value) in &self.user_tags {
                tags.set(key.as_str(), value.as_str());
            }
            headers.set(headers::AMZ_TAGGING, tags.encode());
        }

        if let Some(sse) = &self.server_side_encryption {
            sse.contribute(&mut headers);
        }

        headers
    }
}

fn metadata_header_key(key: &str) -> String {
    if key.to_ascii_lowercase().starts_with("x-amz-meta-") {
        key.to_string()
    } else {
        format!("{}{}", headers::AMZ_META_PREFIX, key)
    }
}
