//! Platform directory resolution
//!
//! Settings live in the platform config directory:
//! - macOS: ~/Library/Application Support/bucketflow
//! - Windows: %APPDATA%\bucketflow
//! - Linux: ~/.config/bucketflow

use std::path::PathBuf;
use tracing::debug;

const APP_DIR: &str = "bucketflow";

/// Directory holding bucketflow's own files
pub fn app_config_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    debug!("App config directory: {:?}", dir);
    dir
}

/// Default location of the settings file
pub fn settings_path() -> PathBuf {
    app_config_dir().join("settings.json")
}

/// Where downloads land when the caller gives no directory.
///
/// Never a relative path when the platform knows a downloads folder.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}
