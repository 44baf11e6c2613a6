//! Error types for bucketflow-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bucketflow-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bucketflow-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// A caller supplied a semantically invalid value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store could not be reached (dispatch, timeout, broken body stream)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The store rejected the request as a whole
    #[error("S3 operation failed: {0}")]
    S3Operation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the store is unreachable, as opposed to a
    /// request the store answered with a rejection.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

// Generic SdkError conversion for all S3 operations
impl<E> From<aws_sdk_s3::error::SdkError<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: aws_sdk_s3::error::SdkError<E>) -> Self {
        use aws_sdk_s3::error::SdkError;

        match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                Error::Transport(err.to_string())
            }
            _ if err.raw_response().map(|r| r.status().as_u16()) == Some(404) => {
                Error::NotFound(err.to_string())
            }
            _ => Error::S3Operation(err.to_string()),
        }
    }
}

impl From<aws_sdk_s3::error::BuildError> for Error {
    fn from(err: aws_sdk_s3::error::BuildError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

// ByteStreamError conversion
impl From<aws_sdk_s3::primitives::ByteStreamError> for Error {
    fn from(err: aws_sdk_s3::primitives::ByteStreamError) -> Self {
        Error::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::Transport("connection refused".to_string()).is_transport());
        assert!(!Error::S3Operation("AccessDenied".to_string()).is_transport());
        assert!(!Error::InvalidArgument("empty etag".to_string()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("ETag cannot be empty".to_string());
        assert_eq!(err.to_string(), "Invalid argument: ETag cannot be empty");
    }
}
