//! Upload module
//!
//! The upload filter: derives a storage target for an uploaded temp file and
//! relocates the file there, moving or copying depending on the request.

use crate::storage::{ObjectMeta, StorageError};
use std::path::PathBuf;
use thiserror::Error;

pub mod relocator;
pub mod rename;

pub use relocator::{Relocation, S3RenameUpload};
pub use rename::RenameOptions;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No bucket was set when computing the upload target")]
    MissingBucket,

    #[error("Could not relocate upload {}: {cause}", .path.display())]
    Relocation {
        path: PathBuf,
        #[source]
        cause: StorageError,
    },

    #[error("Method {0} cannot relocate uploads")]
    UnsupportedMethod(String),

    #[error("No request context set before relocating")]
    MissingRequestContext,

    #[error("Target {0} already exists")]
    TargetExists(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// An uploaded file waiting in its temporary location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the upload was spooled to
    pub tmp_name: PathBuf,
    /// File name supplied by the client
    pub name: String,
    /// Size reported by the client
    pub size: Option<u64>,
    /// Content type reported by the client
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new(tmp_name: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            tmp_name: tmp_name.into(),
            name: name.into(),
            size: None,
            content_type: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Metadata for the stored object.
    ///
    /// Without a client content type, one is guessed from the extension of
    /// `target`.
    pub fn object_meta(&self, target: &str) -> ObjectMeta {
        match self.content_type.as_deref().map(str::trim) {
            Some(content_type) if !content_type.is_empty() => {
                ObjectMeta::with_content_type(content_type)
            }
            _ => ObjectMeta::guess_from_key(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocation_error_mentions_source() {
        let err = UploadError::Relocation {
            path: PathBuf::from("/tmp/php123"),
            cause: StorageError::ShortWrite {
                expected: 10,
                written: 0,
            },
        };
        let message = err.to_string();
        assert!(message.contains("/tmp/php123"));
        assert!(message.contains("Short write"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_object_meta_prefers_client_content_type() {
        let upload = UploadedFile::new("/tmp/php123", "photo.png").with_content_type("image/webp");
        assert_eq!(
            upload.object_meta("s3://uploads/photo.png").content_type,
            Some("image/webp".to_string())
        );
    }

    #[test]
    fn test_object_meta_guesses_from_target() {
        let upload = UploadedFile::new("/tmp/php123", "photo").with_content_type(" ");
        assert_eq!(
            upload.object_meta("s3://uploads/avatars/photo.png").content_type,
            Some("image/png".to_string())
        );
        assert_eq!(
            UploadedFile::new("/tmp/php123", "blob")
                .object_meta("s3://uploads/php123")
                .content_type,
            None
        );
    }
}
