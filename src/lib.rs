//! S3 Rename Upload Library
//!
//! Upload filter that sends uploaded files to an object-storage bucket
//! instead of the local disk, optionally renaming them.
//!
//! # Features
//!
//! - **Method aware**: `POST` uploads are moved, `PUT`/`PATCH` bodies copied
//! - **Renaming**: keep the upload name, keep its extension, randomize
//! - **Pluggable storage**: S3 (SigV4) or a local directory tree
//! - **Streaming copies**: optional, instead of buffering whole files
//!
//! # Example
//!
//! ```no_run
//! use s3_rename_upload::{config::Config, request::UploadRequestContext};
//! use s3_rename_upload::upload::{S3RenameUpload, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let storage = s3_rename_upload::storage_from_config(&config)?;
//!
//!     let mut filter = S3RenameUpload::from_config(storage, &config.filter, config.transfer.mode);
//!     filter.set_request(UploadRequestContext::from_method("POST"));
//!
//!     let target = filter.filter(&UploadedFile::new("/tmp/php123", "avatar.png")).await?;
//!     println!("Stored at {}", target);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod metrics;
pub mod request;
pub mod s3;
pub mod storage;
pub mod upload;

use config::{BackendKind, Config};
use std::sync::Arc;
use storage::{LocalStorage, StorageBackend, StorageError};

// Re-export commonly used types
pub use request::{HttpMethod, UploadRequestContext};
pub use upload::{S3RenameUpload, UploadError, UploadedFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the storage backend selected by `storage.backend`
pub fn storage_from_config(config: &Config) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match config.storage.backend {
        BackendKind::S3 => {
            let s3 = config.storage.s3.as_ref().ok_or_else(|| {
                StorageError::Config("storage.s3 section missing".into())
            })?;
            Ok(Arc::new(s3::S3Client::from_config(s3)?))
        }
        BackendKind::Local => {
            let local = config.storage.local.as_ref().ok_or_else(|| {
                StorageError::Config("storage.local section missing".into())
            })?;
            Ok(Arc::new(LocalStorage::new(local.root.clone())))
        }
    }
}
