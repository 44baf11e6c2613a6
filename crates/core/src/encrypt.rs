//! Server-side encryption settings and the headers they contribute to a request

use crate::error::{Error, Result};
use crate::headers::Headers;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};

pub const SSE_HEADER: &str = "X-Amz-Server-Side-Encryption";
pub const SSE_KMS_KEY_ID_HEADER: &str = "X-Amz-Server-Side-Encryption-Aws-Kms-Key-Id";
pub const SSE_CUSTOMER_ALGORITHM_HEADER: &str = "X-Amz-Server-Side-Encryption-Customer-Algorithm";
pub const SSE_CUSTOMER_KEY_HEADER: &str = "X-Amz-Server-Side-Encryption-Customer-Key";
pub const SSE_CUSTOMER_KEY_MD5_HEADER: &str = "X-Amz-Server-Side-Encryption-Customer-Key-Md5";

/// Length of an SSE-C key in bytes (AES-256)
pub const CUSTOMER_KEY_LEN: usize = 32;

/// Encryption variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    /// SSE-C
    CustomerKey,
    /// SSE-S3
    S3,
    /// SSE-KMS
    Kms,
}

/// Server-side encryption requested for an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSide {
    /// Key material supplied by the caller on every request
    CustomerKey(CustomerKey),
    /// Keys managed by the store
    S3,
    /// Keys managed by a KMS, optionally a specific one
    Kms { key_id: Option<String> },
}

impl ServerSide {
    pub fn kind(&self) -> EncryptionType {
        match self {
            ServerSide::CustomerKey(_) => EncryptionType::CustomerKey,
            ServerSide::S3 => EncryptionType::S3,
            ServerSide::Kms { .. } => EncryptionType::Kms,
        }
    }

    /// Write this variant's headers, overwriting any value already present under them.
    pub fn contribute(&self, headers: &mut Headers) {
        match self {
            ServerSide::CustomerKey(key) => {
                headers.set(SSE_CUSTOMER_ALGORITHM_HEADER, "AES256");
                headers.set(SSE_CUSTOMER_KEY_HEADER, STANDARD.encode(key.as_bytes()));
                headers.set(SSE_CUSTOMER_KEY_MD5_HEADER, key.md5_base64());
            }
            ServerSide::S3 => {
                headers.set(SSE_HEADER, "AES256");
            }
            ServerSide::Kms { key_id } => {
                headers.set(SSE_HEADER, "aws:kms");
                if let Some(key_id) = key_id {
                    headers.set(SSE_KMS_KEY_ID_HEADER, key_id.as_str());
                }
            }
        }
    }
}

/// A 256-bit SSE-C key
#[derive(Clone, PartialEq, Eq)]
pub struct CustomerKey([u8; CUSTOMER_KEY_LEN]);

impl CustomerKey {
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; CUSTOMER_KEY_LEN] = key.try_into().map_err(|_| {
            Error::InvalidArgument(format!(
                "SSE-C key must be {} bytes, got {}",
                CUSTOMER_KEY_LEN,
                key.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Random key from the thread-local CSPRNG
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Derive a key from a password with argon2id.
    ///
    /// Use the bucket and object name as salt so the same password yields a
    /// different key per object. The salt must be at least 8 bytes.
    pub fn from_password(password: &[u8], salt: &[u8]) -> Result<Self> {
        let params = Params::new(64 * 1024, 1, 4, Some(CUSTOMER_KEY_LEN))
            .map_err(|e| Error::InvalidArgument(format!("Invalid key derivation parameters: {}", e)))?;

        let mut key = [0u8; CUSTOMER_KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password, salt, &mut key)
            .map_err(|e| Error::InvalidArgument(format!("Key derivation failed: {}", e)))?;

        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn md5_base64(&self) -> String {
        STANDARD.encode(Md5::digest(self.0))
    }
}

impl std::fmt::Debug for CustomerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomerKey(<redacted>)")
    }
}
