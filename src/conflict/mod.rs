//! Destination conflict resolution for move tasks
//!
//! When a move's destination key is already taken the active
//! [`ConflictResolution`] decides what happens. `Rename` searches for a free
//! alternate key by feeding an increasing counter through the active rename
//! template. The search asks the store one candidate at a time, so it is a
//! best-effort guarantee: another writer can still claim the key between the
//! check and the move.

pub mod naming;

pub use naming::{KeyParts, RenamePattern, RenameTemplate};

use crate::utils::error::QueueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Upper bound on rename candidates tried before giving up.
pub const MAX_RENAME_ATTEMPTS: u32 = 100;

/// What to do when a destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Leave the source alone and mark the task cancelled.
    Skip,
    /// Move to a generated free key.
    #[default]
    Rename,
    /// Selectable, but never overwrites: always reports the conflict.
    Replace,
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResolution::Skip => write!(f, "skip"),
            ConflictResolution::Rename => write!(f, "rename"),
            ConflictResolution::Replace => write!(f, "replace"),
        }
    }
}

/// Conflict knobs read by the move queue at execution time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSettings {
    pub resolution: ConflictResolution,
    pub pattern: RenamePattern,
    pub custom_template: Option<String>,
}

impl ConflictSettings {
    pub fn template(&self) -> RenameTemplate {
        RenameTemplate::for_pattern(self.pattern, self.custom_template.as_deref())
    }
}

/// Asynchronous "does this key exist" check.
#[async_trait]
pub trait ExistenceOracle: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, QueueError>;
}

/// Result of checking a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// Move to this key (the original one, or a generated alternate).
    Proceed(String),
    /// Destination taken and the strategy says skip.
    Skip,
}

/// Decide where a move may go.
pub async fn resolve_destination(
    destination: &str,
    is_directory: bool,
    settings: &ConflictSettings,
    oracle: &dyn ExistenceOracle,
) -> Result<ConflictOutcome, QueueError> {
    if !oracle.exists(destination).await? {
        return Ok(ConflictOutcome::Proceed(destination.to_string()));
    }

    debug!(
        "Destination {} exists, applying {} strategy",
        destination, settings.resolution
    );
    match settings.resolution {
        ConflictResolution::Skip => Ok(ConflictOutcome::Skip),
        ConflictResolution::Replace => Err(QueueError::DestinationExists(destination.to_string())),
        ConflictResolution::Rename => {
            let key = unique_key(destination, is_directory, &settings.template(), oracle).await?;
            info!("Renamed destination {} -> {}", destination, key);
            Ok(ConflictOutcome::Proceed(key))
        }
    }
}

/// First free alternate for `original`, trying counters
/// `1..=MAX_RENAME_ATTEMPTS`.
pub async fn unique_key(
    original: &str,
    is_directory: bool,
    template: &RenameTemplate,
    oracle: &dyn ExistenceOracle,
) -> Result<String, QueueError> {
    let parts = KeyParts::split(original, is_directory);

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = parts.with_base(&template.apply(&parts.base, n));
        if !oracle.exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(QueueError::DestinationExists(original.to_string()))
}
