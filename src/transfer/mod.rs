//! Concrete queues built on the generic manager

pub mod downloads;
pub mod moves;
pub mod progress;

// Re-export for convenience
pub use downloads::{DownloadExecutor, DownloadItem, DownloadJob, DownloadQueue};
pub use moves::{MoveExecutor, MoveItem, MoveJob, MoveQueue};
pub use progress::{format_bytes, format_eta, format_speed, SpeedEstimator};
