//! Storage backend module
//!
//! The relocator never touches storage directly. It is handed a
//! [`StorageBackend`] at construction and addresses objects through
//! `<scheme>://<bucket>/<key>` targets.
//!
//! # Implementations
//!
//! - [`crate::s3::S3Client`] - S3 REST API with SigV4 signing
//! - [`LocalStorage`] - buckets laid out as directories under a root

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use thiserror::Error;

mod local;

pub use local::LocalStorage;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage target: {0}")]
    InvalidUri(String),

    #[error("Short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: u64, written: u64 },

    #[error("Request error: {0}")]
    Request(String),

    #[error("Unexpected response {status}: {body}")]
    Response { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(String),
}

/// Metadata stored along with an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: Option<String>,
}

impl ObjectMeta {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
        }
    }

    /// Guess the content type from the extension of `key`
    pub fn guess_from_key(key: &str) -> Self {
        Self {
            content_type: mime_guess::from_path(key).first_raw().map(str::to_string),
        }
    }
}

/// Storage access used by the upload filter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// URI scheme of the targets this backend accepts (e.g. `s3`)
    fn scheme(&self) -> &'static str;

    /// Whether an object already exists at `target`
    async fn exists(&self, target: &str) -> Result<bool, StorageError>;

    /// Store `body` at `target`, returning the number of bytes written
    async fn write(
        &self,
        target: &str,
        body: Bytes,
        meta: &ObjectMeta,
    ) -> Result<u64, StorageError>;

    /// Stream the file at `source` to `target`. The source stays in place.
    async fn copy_from_path(
        &self,
        source: &Path,
        target: &str,
        meta: &ObjectMeta,
    ) -> Result<u64, StorageError>;

    /// Move the file at `source` to `target`.
    ///
    /// Once the object is stored the move counts as done, even if the source
    /// could not be removed afterwards.
    async fn rename(
        &self,
        source: &Path,
        target: &str,
        meta: &ObjectMeta,
    ) -> Result<u64, StorageError>;
}

/// Remove the source of a move whose object is already stored.
///
/// Failures are logged, not returned.
pub(crate) async fn discard_moved_source(source: &Path) {
    if let Err(e) = tokio::fs::remove_file(source).await {
        tracing::warn!(
            source = %source.display(),
            error = %e,
            "Object stored but the temp file could not be removed"
        );
    }
}

/// Parsed `<scheme>://<bucket>/<key>` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl StorageUri {
    /// Parse a storage target.
    ///
    /// Both bucket and key must be non-empty.
    pub fn parse(target: &str) -> Result<Self, StorageError> {
        let (scheme, rest) = target
            .split_once("://")
            .ok_or_else(|| StorageError::InvalidUri(format!("missing scheme: {}", target)))?;

        if scheme.is_empty() {
            return Err(StorageError::InvalidUri(format!(
                "missing scheme: {}",
                target
            )));
        }

        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidUri(format!("missing key: {}", target)))?;

        if bucket.is_empty() {
            return Err(StorageError::InvalidUri(format!(
                "missing bucket: {}",
                target
            )));
        }
        if key.is_empty() {
            return Err(StorageError::InvalidUri(format!("missing key: {}", target)));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Parse a target and check that its scheme matches `expected`
    pub fn parse_with_scheme(target: &str, expected: &str) -> Result<Self, StorageError> {
        let uri = Self::parse(target)?;
        if uri.scheme != expected {
            return Err(StorageError::InvalidUri(format!(
                "unsupported scheme '{}', expected '{}'",
                uri.scheme, expected
            )));
        }
        Ok(uri)
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}
