//! Options for GET and HEAD object requests

use crate::encrypt::{EncryptionType, ServerSide};
use crate::error::{Error, Result};
use crate::headers::{self, Headers};
use crate::query::{is_supported_query_key, QueryValues};
use chrono::{DateTime, Utc};

/// Store-internal request fields, not meant to be set by applications.
#[doc(hidden)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedGetOptions {
    /// Set when a GET/HEAD is proxied to another site in active-active replication
    pub replication_proxy_request: Option<String>,
}

/// Headers and query parameters for a GET or HEAD object request.
///
/// Setters only accumulate state; [`header`](Self::header) and
/// [`query_values`](Self::query_values) project it into the request shape, so
/// encryption and internal headers win regardless of the order setters ran in.
#[derive(Debug, Clone, Default)]
pub struct GetObjectOptions {
    headers: Headers,
    query_params: QueryValues,
    /// Only the SSE-C variant applies to reads
    pub server_side_encryption: Option<ServerSide>,
    pub version_id: Option<String>,
    pub part_number: Option<u32>,
    /// Ask the store to return the object's checksums
    pub checksum: bool,
    /// Store-internal, used by replication between sites
    #[doc(hidden)]
    pub internal: AdvancedGetOptions,
}

/// Options for HEAD object requests
pub type StatObjectOptions = GetObjectOptions;

impl GetObjectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_part_number(mut self, part_number: u32) -> Self {
        self.part_number = Some(part_number);
        self
    }

    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_server_side_encryption(mut self, sse: ServerSide) -> Self {
        self.server_side_encryption = Some(sse);
        self
    }

    /// Set a request header, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.headers.set(key, value);
    }

    /// Set a query parameter, replacing previous values.
    ///
    /// Keys that are neither standard S3 keys nor carry an allowed custom
    /// prefix are ignored.
    pub fn set_query_param(&mut self, key: &str, value: impl Into<String>) {
        if !is_supported_query_key(key) {
            tracing::debug!(key, "ignoring unsupported query parameter");
            return;
        }
        self.query_params.set(key, value);
    }

    /// Append a query parameter value. Unsupported keys are ignored like in
    /// [`set_query_param`](Self::set_query_param).
    pub fn add_query_param(&mut self, key: &str, value: impl Into<String>) {
        if !is_supported_query_key(key) {
            tracing::debug!(key, "ignoring unsupported query parameter");
            return;
        }
        self.query_params.add(key, value);
    }

    /// Only return the object if its ETag matches.
    pub fn set_match_etag(&mut self, etag: &str) -> Result<()> {
        if etag.is_empty() {
            return Err(Error::InvalidArgument("ETag cannot be empty".to_string()));
        }
        self.set(headers::IF_MATCH, format!("\"{}\"", etag));
        Ok(())
    }

    /// Only return the object if its ETag differs.
    pub fn set_match_etag_except(&mut self, etag: &str) -> Result<()> {
        if etag.is_empty() {
            return Err(Error::InvalidArgument("ETag cannot be empty".to_string()));
        }
        self.set(headers::IF_NONE_MATCH, format!("\"{}\"", etag));
        Ok(())
    }

    pub fn set_unmodified_since(&mut self, time: DateTime<Utc>) -> Result<()> {
        if is_zero_time(&time) {
            return Err(Error::InvalidArgument(
                "Unmodified since cannot be empty".to_string(),
            ));
        }
        self.set(
            headers::IF_UNMODIFIED_SINCE,
            time.format(headers::HTTP_DATE_FORMAT).to_string(),
        );
        Ok(())
    }

    pub fn set_modified_since(&mut self, time: DateTime<Utc>) -> Result<()> {
        if is_zero_time(&time) {
            return Err(Error::InvalidArgument(
                "Modified since cannot be empty".to_string(),
            ));
        }
        self.set(
            headers::IF_MODIFIED_SINCE,
            time.format(headers::HTTP_DATE_FORMAT).to_string(),
        );
        Ok(())
    }

    /// Read only part of the object (RFC 7233 byte ranges).
    ///
    /// - `start == 0 && end < 0`: the last `-end` bytes
    /// - `start > 0 && end == 0`: everything from `start`
    /// - `0 <= start <= end`: bytes `start` through `end` inclusive
    pub fn set_range(&mut self, start: i64, end: i64) -> Result<()> {
        let range = match (start, end) {
            // `end` already carries the minus sign
            (0, end) if end < 0 => format!("bytes={}", end),
            (start, 0) if start > 0 => format!("bytes={}-", start),
            (start, end) if 0 <= start && start <= end => format!("bytes={}-{}", start, end),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "Invalid range specified: start={} end={}",
                    start, end
                )))
            }
        };
        self.set(headers::RANGE, range);
        Ok(())
    }

    /// Final request headers.
    pub fn header(&self) -> Headers {
        let mut headers = self.headers.clone();

        if let Some(sse) = &self.server_side_encryption {
            if sse.kind() == EncryptionType::CustomerKey {
                sse.contribute(&mut headers);
            }
        }
        if let Some(proxy) = &self.internal.replication_proxy_request {
            headers.set(headers::REPLICATION_PROXY_REQUEST, proxy.as_str());
        }
        if self.checksum {
            headers.set(headers::AMZ_CHECKSUM_MODE, "ENABLED");
        }

        headers
    }

    /// Final query parameters.
    pub fn query_values(&self) -> QueryValues {
        let mut values = QueryValues::new();

        if let Some(version_id) = self.version_id.as_deref().filter(|v| !v.is_empty()) {
            values.set("versionId", version_id);
        }
        if let Some(part_number) = self.part_number.filter(|n| *n > 0) {
            values.set("partNumber", part_number.to_string());
        }
        for (key, params) in self.query_params.iter() {
            for value in params {
                values.add(key, value.as_str());
            }
        }

        values
    }
}

fn is_zero_time(time: &DateTime<Utc>) -> bool {
    *time == DateTime::<Utc>::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::{CustomerKey, SSE_CUSTOMER_KEY_HEADER, SSE_HEADER};
    use chrono::TimeZone;

    #[test]
    fn test_match_etag_quoted() {
        let mut opts = GetObjectOptions::new();
        opts.set_match_etag("abc123").unwrap();
        opts.set_match_etag_except("def456").unwrap();

        let headers = opts.header();
        assert_eq!(headers.get("If-Match"), Some("\"abc123\""));
        assert_eq!(headers.get("If-None-Match"), Some("\"def456\""));
    }

    #[test]
    fn test_empty_etag_rejected_without_mutation() {
        let mut opts = GetObjectOptions::new();
        assert!(matches!(opts.set_match_etag(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            opts.set_match_etag_except(""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(opts.header().is_empty());
    }

    #[test]
    fn test_modified_since_http_date() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut opts = GetObjectOptions::new();
        opts.set_modified_since(time).unwrap();
        opts.set_unmodified_since(time).unwrap();

        let headers = opts.header();
        assert_eq!(
            headers.get("If-Modified-Since"),
            Some("Tue, 02 Jan 2024 03:04:05 GMT")
        );
        assert_eq!(
            headers.get("If-Unmodified-Since"),
            Some("Tue, 02 Jan 2024 03:04:05 GMT")
        );
    }

    #[test]
    fn test_zero_time_rejected() {
        let mut opts = GetObjectOptions::new();
        assert!(opts.set_modified_since(DateTime::<Utc>::default()).is_err());
        assert!(opts.set_unmodified_since(DateTime::<Utc>::default()).is_err());
        assert!(opts.header().is_empty());
    }

    fn range_of(start: i64, end: i64) -> Result<String> {
        let mut opts = GetObjectOptions::new();
        opts.set_range(start, end)?;
        Ok(opts.header().get("Range").unwrap_or_default().to_string())
    }

    #[test]
    fn test_range_closed() {
        assert_eq!(range_of(0, 0).unwrap(), "bytes=0-0");
        assert_eq!(range_of(0, 99).unwrap(), "bytes=0-99");
        assert_eq!(range_of(10, 10).unwrap(), "bytes=10-10");
        assert_eq!(range_of(100, 200).unwrap(), "bytes=100-200");
    }

    #[test]
    fn test_range_suffix_single_minus() {
        assert_eq!(range_of(0, -500).unwrap(), "bytes=-500");
    }

    #[test]
    fn test_range_open_ended() {
        assert_eq!(range_of(100, 0).unwrap(), "bytes=100-");
    }

    #[test]
    fn test_range_invalid() {
        for (start, end) in [(10, 5), (-3, 0), (-2, 4), (-3, -2), (5, -1)] {
            match range_of(start, end) {
                Err(Error::InvalidArgument(msg)) => {
                    assert!(msg.contains(&format!("start={}", start)));
                    assert!(msg.contains(&format!("end={}", end)));
                }
                other => panic!("expected invalid range for ({start}, {end}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_query_params_ignored() {
        let mut opts = GetObjectOptions::new();
        opts.set_query_param("response-content-type", "text/plain");
        let before = opts.query_values();

        opts.set_query_param("acl", "");
        opts.add_query_param("not-a-real-key", "value");
        assert_eq!(opts.query_values(), before);
        assert_eq!(before.get("response-content-type"), Some("text/plain"));
    }

    #[test]
    fn test_query_set_and_add() {
        let mut opts = GetObjectOptions::new();
        opts.add_query_param("x-trace", "1");
        opts.add_query_param("x-trace", "2");
        assert_eq!(opts.query_values().get_all("x-trace"), ["1", "2"]);

        opts.set_query_param("x-trace", "3");
        assert_eq!(opts.query_values().get_all("x-trace"), ["3"]);
    }

    #[test]
    fn test_query_values_version_and_part() {
        let opts = GetObjectOptions::new()
            .with_version_id("v1")
            .with_part_number(3);
        let values = opts.query_values();
        assert_eq!(values.get("versionId"), Some("v1"));
        assert_eq!(values.get("partNumber"), Some("3"));

        let empty = GetObjectOptions::new()
            .with_version_id("")
            .with_part_number(0);
        assert!(empty.query_values().is_empty());
    }

    #[test]
    fn test_query_values_keep_params_after_version() {
        let mut opts = GetObjectOptions::new().with_version_id("v1");
        opts.add_query_param("versionId", "v2");
        assert_eq!(opts.query_values().get_all("versionId"), ["v1", "v2"]);
    }

    #[test]
    fn test_customer_key_overrides_user_headers() {
        let key = CustomerKey::new(&[9u8; 32]).unwrap();
        let mut opts = GetObjectOptions::new().with_server_side_encryption(ServerSide::CustomerKey(key));
        opts.set(SSE_CUSTOMER_KEY_HEADER, "user-value");

        let headers = opts.header();
        assert_ne!(headers.get(SSE_CUSTOMER_KEY_HEADER), Some("user-value"));
        assert_eq!(
            headers.get("x-amz-server-side-encryption-customer-algorithm"),
            Some("AES256")
        );
    }

    #[test]
    fn test_managed_encryption_ignored_on_read() {
        let opts = GetObjectOptions::new().with_server_side_encryption(ServerSide::S3);
        assert!(!opts.header().contains(SSE_HEADER));
    }

    #[test]
    fn test_internal_and_checksum_headers() {
        let mut opts = GetObjectOptions::new().with_checksum(true);
        opts.internal.replication_proxy_request = Some("true".to_string());
        opts.set("x-minio-source-proxy-request", "false");

        let headers = opts.header();
        assert_eq!(headers.get("X-Amz-Checksum-Mode"), Some("ENABLED"));
        assert_eq!(headers.get(headers::REPLICATION_PROXY_REQUEST), Some("true"));
    }

    #[test]
    fn test_header_projection_is_pure() {
        let mut opts = GetObjectOptions::new()
            .with_checksum(true)
            .with_server_side_encryption(ServerSide::CustomerKey(CustomerKey::generate()));
        opts.set("x-amz-request-payer", "requester");
        opts.set_range(0, 1023).unwrap();

        let first = opts.header();
        let second = opts.header();
        assert_eq!(first, second);
        assert_eq!(opts.query_values(), opts.query_values());
        assert!(!opts.headers.contains(headers::AMZ_CHECKSUM_MODE));
    }
}
