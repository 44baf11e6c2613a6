//! Values flowing through listing and batch removal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Object information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: String,
    pub version_id: Option<String>,
    pub storage_class: Option<String>,
    /// A common prefix of a non-recursive listing rather than an object
    #[serde(default)]
    pub is_prefix: bool,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: String::new(),
            version_id: None,
            storage_class: None,
            is_prefix: false,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            is_prefix: true,
            ..Self::new(prefix, 0)
        }
    }
}

/// Object metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: i64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: String,
    pub version_id: Option<String>,
}

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectResult {
    pub etag: String,
    pub version_id: Option<String>,
}

/// Object lock retention mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionMode {
    Governance,
    Compliance,
}

impl RetentionMode {
    /// Parse the wire form (`GOVERNANCE` / `COMPLIANCE`), ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("GOVERNANCE") {
            Some(RetentionMode::Governance)
        } else if value.eq_ignore_ascii_case("COMPLIANCE") {
            Some(RetentionMode::Compliance)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Governance => "GOVERNANCE",
            RetentionMode::Compliance => "COMPLIANCE",
        }
    }
}

/// Retention settings of one object version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRetention {
    pub mode: Option<RetentionMode>,
    pub retain_until: Option<DateTime<Utc>>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    pub common_prefixes: Vec<String>,
    /// `None` once the listing is exhausted
    pub next_continuation_token: Option<String>,
}

/// Identifier of an object to remove
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectToDelete {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectToDelete {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }
}

impl From<ObjectInfo> for ObjectToDelete {
    fn from(info: ObjectInfo) -> Self {
        Self {
            key: info.key,
            version_id: info.version_id,
        }
    }
}

impl From<&str> for ObjectToDelete {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// A single object the store refused to remove
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to remove {object_name}: {cause}")]
pub struct RemoveObjectError {
    pub object_name: String,
    pub version_id: Option<String>,
    pub cause: String,
}

impl RemoveObjectError {
    pub fn new(object: &ObjectToDelete, cause: impl Into<String>) -> Self {
        Self {
            object_name: object.key.clone(),
            version_id: object.version_id.clone(),
            cause: cause.into(),
        }
    }
}

/// Counters of a finished removal run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveSummary {
    pub batches: usize,
    pub deleted: usize,
    pub failed: usize,
}
