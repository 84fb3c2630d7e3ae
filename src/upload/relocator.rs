//! Upload relocator
//!
//! [`S3RenameUpload`] sends an uploaded temp file to a bucket instead of the
//! local disk, optionally renaming it on the way.
//!
//! # Strategy
//!
//! | Method | Transfer | Temp file afterwards |
//! |--------|----------|----------------------|
//! | POST | storage move | removed |
//! | PUT, PATCH | read then write (or streaming copy) | kept |
//! | other | rejected | kept |
//!
//! # Example
//!
//! ```no_run
//! use s3_rename_upload::request::UploadRequestContext;
//! use s3_rename_upload::storage::LocalStorage;
//! use s3_rename_upload::upload::{RenameOptions, S3RenameUpload, UploadedFile};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(LocalStorage::new("/srv/objects"));
//! let options = RenameOptions {
//!     target: Some("avatars/".into()),
//!     use_upload_name: true,
//!     ..Default::default()
//! };
//!
//! let mut filter = S3RenameUpload::new(storage, options);
//! filter.set_bucket("/user-uploads/");
//! filter.set_request(UploadRequestContext::from_method("PUT"));
//!
//! let target = filter.filter(&UploadedFile::new("/tmp/php123", "me.png")).await?;
//! assert_eq!(target, "s3://user-uploads/avatars/me.png");
//! # Ok(())
//! # }
//! ```

use super::rename::RenameOptions;
use super::{UploadError, UploadedFile};
use crate::config::{FilterConfig, TransferMode};
use crate::metrics;
use crate::request::{MoveStrategy, UploadRequestContext};
use crate::storage::{ObjectMeta, StorageBackend, StorageError};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a successful relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub strategy: MoveStrategy,
    pub bytes: u64,
}

/// Upload filter writing to object storage
pub struct S3RenameUpload {
    storage: Arc<dyn StorageBackend>,
    bucket: Option<String>,
    options: RenameOptions,
    transfer_mode: TransferMode,
    request: Option<UploadRequestContext>,
    /// Temp file -> final target of uploads this instance already handled
    already_filtered: HashMap<PathBuf, String>,
}

impl S3RenameUpload {
    /// Create a filter over `storage` with no bucket and no request set
    pub fn new(storage: Arc<dyn StorageBackend>, options: RenameOptions) -> Self {
        Self {
            storage,
            bucket: None,
            options,
            transfer_mode: TransferMode::default(),
            request: None,
            already_filtered: HashMap::new(),
        }
    }

    /// Create a filter from the `filter` configuration section
    pub fn from_config(
        storage: Arc<dyn StorageBackend>,
        filter: &FilterConfig,
        transfer_mode: TransferMode,
    ) -> Self {
        let mut upload = Self::new(storage, filter.rename.clone());
        if let Some(ref bucket) = filter.bucket {
            upload.set_bucket(bucket);
        }
        upload.set_transfer_mode(transfer_mode);
        upload
    }

    /// Set the bucket name, trimming slashes on both ends.
    ///
    /// A name that is empty after trimming unsets the bucket.
    pub fn set_bucket(&mut self, bucket: &str) -> &mut Self {
        let bucket = bucket.trim_matches('/');
        self.bucket = (!bucket.is_empty()).then(|| bucket.to_string());
        self
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Set the request whose method picks the transfer strategy
    pub fn set_request(&mut self, request: UploadRequestContext) -> &mut Self {
        self.request = Some(request);
        self
    }

    pub fn request(&self) -> Option<&UploadRequestContext> {
        self.request.as_ref()
    }

    pub fn set_options(&mut self, options: RenameOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenameOptions {
        &self.options
    }

    pub fn set_transfer_mode(&mut self, mode: TransferMode) -> &mut Self {
        self.transfer_mode = mode;
        self
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    /// Turn a derived target path into `<scheme>://<bucket>/<key>`.
    ///
    /// Backslashes become slashes, slashes are trimmed from both ends and a
    /// leading `./` is dropped.
    pub fn compute_final_target(&self, key_hint: &str) -> Result<String, UploadError> {
        let bucket = self.bucket.as_deref().ok_or(UploadError::MissingBucket)?;

        let key = key_hint.replace('\\', "/");
        let key = key.trim_matches('/');
        let key = key.strip_prefix("./").unwrap_or(key);

        Ok(format!("{}://{}/{}", self.storage.scheme(), bucket, key))
    }

    /// Final target of `upload` under the current options
    pub fn final_target(&self, upload: &UploadedFile) -> Result<String, UploadError> {
        if self.bucket.is_none() {
            return Err(UploadError::MissingBucket);
        }
        self.compute_final_target(&self.options.derive_target(upload))
    }

    /// Transfer `source` to `target` using the strategy of the current request.
    ///
    /// The content type is guessed from the extension of `target`.
    pub async fn relocate(&self, source: &Path, target: &str) -> Result<Relocation, UploadError> {
        self.relocate_with_meta(source, target, &ObjectMeta::guess_from_key(target))
            .await
    }

    /// Like [`relocate`](Self::relocate), storing `meta` with the object
    #[tracing::instrument(
        name = "upload.relocate",
        skip_all,
        fields(
            source = %source.display(),
            target = %target,
            content_type = ?meta.content_type,
            http.method = tracing::field::Empty,
            upload.bytes = tracing::field::Empty
        ),
        err
    )]
    pub async fn relocate_with_meta(
        &self,
        source: &Path,
        target: &str,
        meta: &ObjectMeta,
    ) -> Result<Relocation, UploadError> {
        let request = self
            .request
            .as_ref()
            .ok_or(UploadError::MissingRequestContext)?;
        let method = request.method().as_str();
        let strategy = request.strategy();

        let span = tracing::Span::current();
        span.record("http.method", method);

        let start_time = Instant::now();
        let result = match strategy {
            MoveStrategy::Move => self.storage.rename(source, target, meta).await,
            MoveStrategy::Copy => self.copy(source, target, meta).await,
            MoveStrategy::Reject => {
                metrics::record_error("unsupported_method");
                tracing::warn!(method = %method, "Refusing to relocate upload");
                return Err(UploadError::UnsupportedMethod(method.to_string()));
            }
        };

        let duration = start_time.elapsed();
        metrics::record_relocation_duration(method, duration.as_secs_f64());

        match result {
            Ok(bytes) => {
                metrics::record_relocation_success(method, bytes);
                span.record("upload.bytes", bytes);

                tracing::info!(
                    strategy = ?strategy,
                    bytes = bytes,
                    duration_ms = duration.as_millis(),
                    "Upload relocated"
                );

                Ok(Relocation { strategy, bytes })
            }
            Err(cause) => {
                metrics::record_relocation_failure(method);
                metrics::record_error("relocation");

                tracing::error!(
                    error = %cause,
                    duration_ms = duration.as_millis(),
                    "Upload relocation failed"
                );

                Err(UploadError::Relocation {
                    path: source.to_path_buf(),
                    cause,
                })
            }
        }
    }

    /// Copy without consuming the source
    async fn copy(
        &self,
        source: &Path,
        target: &str,
        meta: &ObjectMeta,
    ) -> Result<u64, StorageError> {
        match self.transfer_mode {
            TransferMode::Buffered => {
                let content = Bytes::from(tokio::fs::read(source).await?);
                let expected = content.len() as u64;
                let written = self.storage.write(target, content, meta).await?;
                if written != expected {
                    return Err(StorageError::ShortWrite { expected, written });
                }
                Ok(written)
            }
            TransferMode::Streaming => self.storage.copy_from_path(source, target, meta).await,
        }
    }

    /// Relocate `upload` to its final target and return that target.
    ///
    /// An upload already handled by this instance is not transferred again.
    #[tracing::instrument(
        name = "upload.filter",
        skip_all,
        fields(upload.name = %upload.name, bucket = ?self.bucket),
        err
    )]
    pub async fn filter(&mut self, upload: &UploadedFile) -> Result<String, UploadError> {
        if let Some(target) = self.already_filtered.get(&upload.tmp_name) {
            tracing::debug!(target = %target, "Upload already filtered");
            return Ok(target.clone());
        }

        let target = self.final_target(upload)?;

        if !self.options.overwrite && self.storage.exists(&target).await? {
            return Err(UploadError::TargetExists(target));
        }

        let meta = upload.object_meta(&target);
        let relocation = self
            .relocate_with_meta(&upload.tmp_name, &target, &meta)
            .await?;
        if let Some(size) = upload.size.filter(|size| *size != relocation.bytes) {
            tracing::warn!(
                reported = size,
                relocated = relocation.bytes,
                "Upload size differs from the size the client reported"
            );
        }

        self.already_filtered
            .insert(upload.tmp_name.clone(), target.clone());

        Ok(target)
    }
}
