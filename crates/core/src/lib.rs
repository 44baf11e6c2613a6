//! bucketflow-core - Client-side access layer for S3 compatible object stores
//!
//! This library provides validated request options for GET/HEAD/PUT object
//! requests, a cancellable streaming object listing, and a batched removal
//! pipeline that reports per-object failures without stopping.

pub mod client;
pub mod config;
pub mod encrypt;
pub mod error;
pub mod get_options;
pub mod headers;
pub mod list;
pub mod logging;
pub mod put_options;
pub mod query;
pub mod remove;
pub mod types;

// Re-export commonly used types
pub use client::S3Client;
pub use config::{
    config_exists, get_config_path, load_config, load_config_from, save_config, save_config_to,
    validate_config,
};
pub use config::{ConfigFile, EndpointConfig, LoggingConfig, TransferConfig};
pub use encrypt::{CustomerKey, EncryptionType, ServerSide};
pub use error::{Error, Result};
pub use get_options::{AdvancedGetOptions, GetObjectOptions, StatObjectOptions};
pub use headers::Headers;
pub use list::{deletable, list_objects, take_objects, ListObjectsOptions, ObjectLister, ObjectStream};
pub use logging::init_logging;
pub use put_options::PutObjectOptions;
pub use query::{is_supported_query_key, QueryValues};
pub use remove::{remove_objects, BatchDeleter, RemoveErrors, RemoveObjectsOptions};
pub use types::{
    ListPage, ObjectInfo, ObjectMetadata, ObjectRetention, ObjectToDelete, PutObjectResult,
    RemoveObjectError, RemoveSummary, RetentionMode,
};

// Cancellation token accepted by `list_objects`
pub use tokio_util::sync::CancellationToken;
