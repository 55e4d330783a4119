//! Remote object-store collaborator seam
//!
//! The queues never speak a wire protocol themselves. They drive whatever
//! implements [`RemoteStore`]: an S3-compatible client in the app, a mock in
//! tests, or [`LocalStore`] for a directory on disk.

pub mod key;
pub mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Progress callback invoked with `(bytes_done, bytes_total)`.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Errors reported by a remote store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the task queues consume from an already-connected store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether `key` exists in `container`.
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError>;

    /// Move (rename) an object or folder placeholder within `container`.
    async fn move_object(
        &self,
        container: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError>;

    /// Download `key` into `destination` in chunks, calling `on_progress`
    /// after each chunk.
    async fn download(
        &self,
        container: &str,
        key: &str,
        destination: &Path,
        known_size: u64,
        on_progress: ProgressFn<'_>,
    ) -> Result<(), StoreError>;
}
