//! S3 client implementation using AWS S3 SDK

use crate::config::{ConfigFile, TransferConfig};
use crate::error::{Error, Result};
use crate::get_options::{GetObjectOptions, StatObjectOptions};
use crate::headers::Headers;
use crate::list::{ListObjectsOptions, ObjectLister};
use crate::put_options::PutObjectOptions;
use crate::query::QueryValues;
use crate::remove::{BatchDeleter, RemoveObjectsOptions};
use crate::types::{
    ListPage, ObjectInfo, ObjectMetadata, ObjectRetention, ObjectToDelete, PutObjectResult,
    RemoveObjectError, RetentionMode,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{
        http::HttpRequest, retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion,
        Credentials, Region,
    },
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier, ObjectLockRetention},
    Client,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

/// Client for an S3 compatible store
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    transfer: TransferConfig,
}

impl S3Client {
    /// Create a client with static credentials
    pub fn new(
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
        region: String,
    ) -> Self {
        let credentials = Credentials::new(&access_key_id, &secret_access_key, None, None, "bucketflow");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
            transfer: TransferConfig::default(),
        }
    }

    /// Create a client from the configuration file.
    ///
    /// Without static keys the default AWS credential chain is used.
    pub async fn from_config(config: &ConfigFile) -> Result<Self> {
        crate::config::validate_config(config)?;

        let endpoint = &config.endpoint;
        let transfer = config.transfer.clone().unwrap_or_default();

        let mut builder = match (&endpoint.access_key_id, &endpoint.secret_access_key) {
            (Some(key_id), Some(secret)) => aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(key_id, secret, None, None, "bucketflow")),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder = builder
            .endpoint_url(endpoint.url.clone())
            .region(Region::new(endpoint.region.clone()))
            .force_path_style(endpoint.force_path_style)
            .retry_config(RetryConfig::standard().with_max_attempts(transfer.max_retries + 1))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(transfer.timeout))
                    .build(),
            );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            transfer,
        })
    }

    /// Listing options for `prefix` using the configured page size
    pub fn list_options(&self, prefix: impl Into<String>) -> ListObjectsOptions {
        ListObjectsOptions::from_config(prefix, &self.transfer)
    }

    /// Removal options using the configured batch size
    pub fn remove_options(&self) -> RemoveObjectsOptions {
        RemoveObjectsOptions::from(&self.transfer)
    }

    /// Download an object's content
    pub async fn get_object(&self, bucket: &str, key: &str, options: &GetObjectOptions) -> Result<Vec<u8>> {
        let headers = options.header();
        let query = options.query_values();

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .mutate_request(move |req| apply_request_options(req, &headers, &query))
            .send()
            .await?;

        let body = response.body.collect().await?.into_bytes();

        Ok(body.to_vec())
    }

    /// Get object metadata
    pub async fn stat_object(&self, bucket: &str, key: &str, options: &StatObjectOptions) -> Result<ObjectMetadata> {
        let headers = options.header();
        let query = options.query_values();

        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .mutate_request(move |req| apply_request_options(req, &headers, &query))
            .send()
            .await?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0),
            content_type: response.content_type().unwrap_or("").to_string(),
            last_modified: response.last_modified().and_then(to_chrono),
            etag: response.e_tag().unwrap_or("").to_string(),
            version_id: response.version_id().map(str::to_string),
        })
    }

    /// Upload bytes
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutObjectOptions,
    ) -> Result<PutObjectResult> {
        options.validate()?;
        let headers = options.header();
        let query = QueryValues::new();

        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .customize()
            .mutate_request(move |req| apply_request_options(req, &headers, &query))
            .send()
            .await?;

        Ok(PutObjectResult {
            etag: response.e_tag().unwrap_or("").to_string(),
            version_id: response.version_id().map(str::to_string),
        })
    }

    /// Read the object lock retention of an object version
    pub async fn get_object_retention(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<ObjectRetention> {
        let response = self
            .client
            .get_object_retention()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await?;

        Ok(response.retention().map(to_retention).unwrap_or_default())
    }

    /// Delete a single object
    pub async fn remove_object(&self, bucket: &str, key: &str, version_id: Option<&str>) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .send()
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ObjectLister for S3Client {
    async fn list_page(
        &self,
        bucket: &str,
        options: &ListObjectsOptions,
        continuation_token: Option<&str>,
    ) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(options.prefix.as_str())
            .set_delimiter((!options.recursive).then(|| "/".to_string()))
            .max_keys(options.page_size())
            .set_start_after(options.start_after.clone())
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await?;

        let next_continuation_token = if response.is_truncated().unwrap_or(false) {
            match response.next_continuation_token() {
                Some(token) if !token.is_empty() => Some(token.to_string()),
                _ => {
                    return Err(Error::S3Operation(format!(
                        "Listing of {} is truncated but has no continuation token",
                        bucket
                    )))
                }
            }
        } else {
            None
        };

        let objects = response
            .contents()
            .iter()
            .map(|obj| ObjectInfo {
                key: obj.key().unwrap_or("").to_string(),
                size: obj.size().unwrap_or(0),
                last_modified: obj.last_modified().and_then(to_chrono),
                etag: obj.e_tag().unwrap_or("").to_string(),
                version_id: None,
                storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
                is_prefix: false,
            })
            .collect();

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        Ok(ListPage {
            objects,
            common_prefixes,
            next_continuation_token,
        })
    }
}

#[async_trait]
impl BatchDeleter for S3Client {
    async fn delete_batch(
        &self,
        bucket: &str,
        objects: &[ObjectToDelete],
        options: &RemoveObjectsOptions,
    ) -> Result<Vec<RemoveObjectError>> {
        let identifiers = objects
            .iter()
            .map(|o| {
                ObjectIdentifier::builder()
                    .key(o.key.as_str())
                    .set_version_id(o.version_id.clone())
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()?;

        let response = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .set_bypass_governance_retention(options.bypass_governance.then_some(true))
            .send()
            .await?;

        let failures: Vec<RemoveObjectError> = response
            .errors()
            .iter()
            .map(|e| RemoveObjectError {
                object_name: e.key().unwrap_or("").to_string(),
                version_id: e.version_id().map(str::to_string),
                cause: match (e.code(), e.message()) {
                    (Some(code), Some(message)) => format!("{}: {}", code, message),
                    (Some(code), None) => code.to_string(),
                    (None, Some(message)) => message.to_string(),
                    (None, None) => "unknown error".to_string(),
                },
            })
            .collect();

        debug!(bucket, count = objects.len(), failed = failures.len(), "batch delete completed");
        Ok(failures)
    }
}

/// Copy projected headers and query parameters onto an outgoing request.
fn apply_request_options(req: &mut HttpRequest, headers: &Headers, query: &QueryValues) {
    for (name, value) in headers.iter() {
        if let Err(e) = req.headers_mut().try_insert(name.to_string(), value.to_string()) {
            warn!(header = name, error = %e, "skipping invalid request header");
        }
    }

    if query.is_empty() {
        return;
    }
    let separator = if req.uri().contains('?') { '&' } else { '?' };
    let uri = format!("{}{}{}", req.uri(), separator, query.encode());
    if let Err(e) = req.set_uri(uri) {
        warn!(error = %e, "failed to append request query parameters");
    }
}

fn to_retention(retention: &ObjectLockRetention) -> ObjectRetention {
    ObjectRetention {
        mode: retention.mode().and_then(|m| RetentionMode::parse(m.as_str())),
        retain_until: retention.retain_until_date().and_then(to_chrono),
    }
}

fn to_chrono(dt: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
