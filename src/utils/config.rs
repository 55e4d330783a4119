//! Queue settings

use crate::conflict::{ConflictResolution, ConflictSettings, RenamePattern};
use crate::utils::error::QueueError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Lowest accepted concurrency ceiling.
pub const MIN_CONCURRENT: usize = 1;
/// Highest accepted concurrency ceiling.
pub const MAX_CONCURRENT: usize = 10;

/// Settings read when a queue is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Maximum concurrent execution units (1..=10)
    pub max_concurrent: usize,

    /// Strategy when a move destination already exists
    pub conflict_resolution: ConflictResolution,

    /// Template used by the rename strategy
    pub rename_pattern: RenamePattern,

    /// Template for `RenamePattern::Custom`, must contain `{n}`
    pub custom_rename_template: Option<String>,

    /// Minimum interval between throttled state notifications (ms)
    pub notify_interval_ms: u64,

    /// Minimum interval between transfer speed recomputations (ms)
    pub speed_sample_interval_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            conflict_resolution: ConflictResolution::Rename,
            rename_pattern: RenamePattern::Parentheses,
            custom_rename_template: None,
            notify_interval_ms: 250,
            speed_sample_interval_ms: 500,
        }
    }
}

impl QueueSettings {
    /// Clamp a concurrency value into the accepted range.
    pub fn clamp_concurrency(value: usize) -> usize {
        value.clamp(MIN_CONCURRENT, MAX_CONCURRENT)
    }

    /// Enforce sane ranges on every knob
    pub fn normalized(mut self) -> Self {
        self.max_concurrent = Self::clamp_concurrency(self.max_concurrent);
        if self.speed_sample_interval_ms == 0 {
            self.speed_sample_interval_ms = 1;
        }
        self
    }

    /// Check values a user may have typed by hand.
    pub fn validate(&self) -> Result<(), QueueError> {
        if !(MIN_CONCURRENT..=MAX_CONCURRENT).contains(&self.max_concurrent) {
            return Err(QueueError::InvalidSetting(format!(
                "max_concurrent must be between {} and {}, got {}",
                MIN_CONCURRENT, MAX_CONCURRENT, self.max_concurrent
            )));
        }
        if self.rename_pattern == RenamePattern::Custom {
            let template = self.custom_rename_template.as_deref().unwrap_or_default();
            if !template.contains(crate::conflict::naming::COUNTER_PLACEHOLDER) {
                return Err(QueueError::InvalidSetting(format!(
                    "custom rename template {:?} must contain {{n}}",
                    template
                )));
            }
        }
        Ok(())
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    pub fn speed_sample_interval(&self) -> Duration {
        Duration::from_millis(self.speed_sample_interval_ms)
    }

    /// Conflict knobs for the move queue
    pub fn conflict(&self) -> ConflictSettings {
        ConflictSettings {
            resolution: self.conflict_resolution,
            pattern: self.rename_pattern,
            custom_template: self.custom_rename_template.clone(),
        }
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings in {:?}", path))?;
        if let Err(e) = settings.validate() {
            warn!("Settings in {:?} out of range: {}", path, e);
        }
        Ok(settings.normalized())
    }

    /// Load settings, falling back to defaults when the file is missing or broken
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("{:#}; using default settings", e);
            Self::default()
        })
    }

    /// Save settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = QueueSettings::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.conflict_resolution, ConflictResolution::Rename);
        assert!(config.notify_interval_ms > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_clamps_concurrency() {
        let low = QueueSettings {
            max_concurrent: 0,
            ..Default::default()
        };
        assert_eq!(low.normalized().max_concurrent, 1);

        let high = QueueSettings {
            max_concurrent: 64,
            ..Default::default()
        };
        assert!(high.validate().is_err());
        assert_eq!(high.normalized().max_concurrent, 10);
    }

    #[test]
    fn test_custom_pattern_requires_counter() {
        let config = QueueSettings {
            rename_pattern: RenamePattern::Custom,
            custom_rename_template: Some("copy".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(QueueError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: QueueSettings =
            serde_json::from_str(r#"{"max_concurrent": 5, "conflict_resolution": "skip"}"#)
                .unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.conflict_resolution, ConflictResolution::Skip);
        assert_eq!(config.rename_pattern, RenamePattern::Parentheses);
        assert_eq!(config.speed_sample_interval_ms, 500);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/settings.json");
        let config = QueueSettings {
            max_concurrent: 7,
            rename_pattern: RenamePattern::Custom,
            custom_rename_template: Some("({n})".into()),
            ..Default::default()
        };

        config.save(&path).unwrap();
        assert_eq!(QueueSettings::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(QueueSettings::load_or_default(&path), QueueSettings::default());
        assert_eq!(
            QueueSettings::load_or_default(&temp.path().join("missing.json")),
            QueueSettings::default()
        );
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{\"max_concurrent\": ").unwrap();

        let err = QueueSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
        assert!(err.downcast_ref::<serde_json::Error>().is_some());
    }

    #[test]
    fn test_conflict_settings_follow_config() {
        let config = QueueSettings {
            conflict_resolution: ConflictResolution::Replace,
            rename_pattern: RenamePattern::Dash,
            ..Default::default()
        };
        let conflict = config.conflict();
        assert_eq!(conflict.resolution, ConflictResolution::Replace);
        assert_eq!(conflict.template().apply("a", 4), "a-4");
    }
}
