//! Local filesystem backend
//!
//! Lays `<scheme>://<bucket>/<key>` out as `<root>/<bucket>/<key>`. Useful
//! for development and tests where no object store is available.
//!
//! Objects are written to a hidden staging file next to the target and
//! renamed into place, so a failed write never leaves a truncated object.

use super::{discard_moved_source, ObjectMeta, StorageBackend, StorageError, StorageUri};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Default scheme accepted by [`LocalStorage`]
pub const DEFAULT_SCHEME: &str = "s3";

/// Directory-backed storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    scheme: &'static str,
}

impl LocalStorage {
    /// Create a backend rooted at `root`, accepting `s3://` targets
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scheme: DEFAULT_SCHEME,
        }
    }

    /// Accept targets with a different scheme
    pub fn with_scheme(mut self, scheme: &'static str) -> Self {
        self.scheme = scheme;
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a target onto the filesystem
    pub fn resolve(&self, target: &str) -> Result<PathBuf, StorageError> {
        let uri = StorageUri::parse_with_scheme(target, self.scheme)?;

        if uri.bucket == ".." || uri.bucket == "." {
            return Err(StorageError::InvalidUri(format!(
                "invalid bucket: {}",
                target
            )));
        }

        let mut path = self.root.join(&uri.bucket);
        for segment in uri.key.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(StorageError::InvalidUri(format!(
                        "parent segment in key: {}",
                        target
                    )))
                }
                s => path.push(s),
            }
        }
        Ok(path)
    }

    /// Resolve a target and make sure its parent directory exists
    async fn prepare(&self, target: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve(target)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }
}

/// Staging file in the directory of `path`
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

/// Rename a filled staging file onto `path`. The staging file is removed
/// if filling or renaming failed.
async fn commit(
    staged: &Path,
    path: &Path,
    filled: std::io::Result<u64>,
) -> Result<u64, StorageError> {
    let result = match filled {
        Ok(bytes) => fs::rename(staged, path).await.map(|_| bytes),
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = fs::remove_file(staged).await;
    }
    result.map_err(StorageError::from)
}

async fn copy_staged(source: &Path, path: &Path) -> Result<u64, StorageError> {
    let staged = staging_path(path);
    let filled: std::io::Result<u64> = async {
        let mut reader = fs::File::open(source).await?;
        let mut writer = fs::File::create(&staged).await?;
        let copied = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.sync_all().await?;
        Ok(copied)
    }
    .await;
    commit(&staged, path, filled).await
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn scheme(&self) -> &'static str {
        self.scheme
    }

    async fn exists(&self, target: &str) -> Result<bool, StorageError> {
        let path = self.resolve(target)?;
        Ok(fs::try_exists(&path).await?)
    }

    // The filesystem keeps no content type
    async fn write(
        &self,
        target: &str,
        body: Bytes,
        _meta: &ObjectMeta,
    ) -> Result<u64, StorageError> {
        let path = self.prepare(target).await?;
        let staged = staging_path(&path);
        let filled: std::io::Result<u64> = async {
            let mut file = fs::File::create(&staged).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            Ok(body.len() as u64)
        }
        .await;
        commit(&staged, &path, filled).await
    }

    async fn copy_from_path(
        &self,
        source: &Path,
        target: &str,
        _meta: &ObjectMeta,
    ) -> Result<u64, StorageError> {
        let path = self.prepare(target).await?;
        copy_staged(source, &path).await
    }

    async fn rename(
        &self,
        source: &Path,
        target: &str,
        _meta: &ObjectMeta,
    ) -> Result<u64, StorageError> {
        let path = self.prepare(target).await?;
        let size = fs::metadata(source).await?.len();

        match fs::rename(source, &path).await {
            Ok(()) => Ok(size),
            Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
                tracing::debug!(
                    source = %source.display(),
                    target = %path.display(),
                    "rename crosses devices, falling back to copy and delete"
                );
                let copied = copy_staged(source, &path).await?;
                discard_moved_source(source).await;
                Ok(copied)
            }
            Err(e) => Err(e.into()),
        }
    }
}
