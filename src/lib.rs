//! bucketflow library
//!
//! Concurrent move and download queues for object-storage file managers.

pub mod conflict;
pub mod queue;
pub mod store;
pub mod transfer;
pub mod utils;

// Re-export main types for easier use
pub use conflict::{ConflictResolution, ConflictSettings, RenamePattern};
pub use queue::{QueueManager, QueueSnapshot, Task, TaskExecutor, TaskId, TaskStatus};
pub use store::{LocalStore, RemoteStore, StoreError};
pub use transfer::{DownloadItem, DownloadQueue, MoveItem, MoveQueue};
pub use utils::{QueueError, QueueSettings};
