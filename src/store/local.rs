//! Filesystem-backed store
//!
//! Containers are sub-directories of a root directory and keys are paths
//! relative to the container. Downloads stream the object in fixed-size
//! chunks so progress reporting behaves like a remote chunked transfer.

use super::{ProgressFn, RemoteStore, StoreError};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Default chunk size for streamed downloads (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `key` inside `container`.
    pub fn object_path(&self, container: &str, key: &str) -> PathBuf {
        self.root
            .join(container)
            .join(key.trim_start_matches('/').trim_end_matches('/'))
    }

    /// Size in bytes of a stored object.
    pub async fn object_size(&self, container: &str, key: &str) -> Result<u64, StoreError> {
        let path = self.object_path(container, key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        let path = self.object_path(container, key);
        let found = tokio::fs::try_exists(&path).await?;
        if !found {
            return Ok(false);
        }
        // A folder key only matches a directory, a file key only a file.
        let is_dir = tokio::fs::metadata(&path).await?.is_dir();
        Ok(is_dir == key.ends_with('/'))
    }

    async fn move_object(
        &self,
        container: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError> {
        let source = self.object_path(container, source_key);
        let destination = self.object_path(container, destination_key);

        if !tokio::fs::try_exists(&source).await? {
            return Err(StoreError::NotFound(source_key.to_string()));
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Moving {:?} -> {:?}", source, destination);
        tokio::fs::rename(&source, &destination).await?;
        Ok(())
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        destination: &Path,
        known_size: u64,
        on_progress: ProgressFn<'_>,
    ) -> Result<(), StoreError> {
        let source = self.object_path(container, key);
        let file = match File::open(&source).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let total = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(_) => known_size,
        };

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut output = File::create(destination).await?;
        let mut stream = ReaderStream::with_capacity(file, self.chunk_size);
        let mut downloaded = 0u64;

        on_progress(0, total);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            output.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_progress(downloaded, total);
        }

        output.flush().await?;
        Ok(())
    }
}
