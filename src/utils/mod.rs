//! Utility modules for error handling, configuration and platform paths

pub mod config;
pub mod error;
pub mod paths;

// Re-export for convenience
pub use config::QueueSettings;
pub use error::QueueError;
pub use paths::{app_config_dir, default_download_dir, settings_path};
