//! Error handling for bucketflow

use crate::store::StoreError;
use thiserror::Error;

/// Main error type for queue execution units and settings
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is not configured with a remote store")]
    NotConfigured,

    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    #[error("Skipped, destination already exists: {0}")]
    Skipped(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Execution unit panicked: {0}")]
    UnitPanicked(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl QueueError {
    /// Whether this error ends a task as `Cancelled` rather than `Failed`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, QueueError::Cancelled | QueueError::Skipped(_))
    }
}
