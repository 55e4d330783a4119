//! Move queue: relocate objects within a container, resolving destination
//! conflicts first

use crate::conflict::{self, ConflictOutcome, ConflictSettings, ExistenceOracle};
use crate::queue::{Job, QueueManager, Task, TaskExecutor, UnitContext};
use crate::store::key;
use crate::utils::config::QueueSettings;
use crate::utils::error::QueueError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::RwLock;
use tracing::{debug, info};

/// Source object selected for a move
#[derive(Debug, Clone)]
pub struct MoveItem {
    pub key: String,
    pub is_directory: bool,
}

impl MoveItem {
    pub fn file(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_directory: false,
        }
    }

    pub fn directory(key: impl Into<String>) -> Self {
        let mut key = key.into();
        if !key::is_directory_key(&key) {
            key.push(key::SEPARATOR);
        }
        Self {
            key,
            is_directory: true,
        }
    }

    /// Infer folder-ness from a trailing separator
    pub fn from_key(key: impl Into<String>) -> Self {
        let key = key.into();
        let is_directory = key::is_directory_key(&key);
        Self { key, is_directory }
    }
}

/// Payload of a move task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveJob {
    pub source_key: String,
    pub destination_key: String,
    pub is_directory: bool,
}

impl Job for MoveJob {
    fn source_key(&self) -> &str {
        &self.source_key
    }
}

fn describe(source: &str, destination: &str) -> String {
    format!("{} → {}", source, destination)
}

/// Executes move tasks
#[derive(Debug, Default)]
pub struct MoveExecutor {
    conflict: RwLock<ConflictSettings>,
}

impl MoveExecutor {
    pub fn new(conflict: ConflictSettings) -> Self {
        Self {
            conflict: RwLock::new(conflict),
        }
    }

    /// Conflict settings used by tasks that start from now on
    pub fn conflict_settings(&self) -> ConflictSettings {
        self.conflict
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    pub fn set_conflict_settings(&self, settings: ConflictSettings) {
        if let Ok(mut current) = self.conflict.write() {
            *current = settings;
        }
    }
}

/// Existence checks for one unit, honoring its cancellation
struct StoreOracle<'a> {
    ctx: &'a UnitContext<MoveJob>,
}

#[async_trait]
impl<'a> ExistenceOracle for StoreOracle<'a> {
    async fn exists(&self, key: &str) -> Result<bool, QueueError> {
        self.ctx
            .guard(self.ctx.store.exists(&self.ctx.container, key))
            .await
    }
}

#[async_trait]
impl TaskExecutor for MoveExecutor {
    type Job = MoveJob;
    type Item = MoveItem;
    /// Destination prefix; empty for the container root
    type Destination = String;

    fn kind(&self) -> &'static str {
        "move"
    }

    fn build_task(&self, item: MoveItem, destination: &String) -> Task<MoveJob> {
        let destination_key = key::rebase(&item.key, destination);
        let name = key::object_name(&item.key)
            .trim_end_matches(key::SEPARATOR)
            .to_string();
        Task::new(
            name,
            describe(&item.key, &destination_key),
            MoveJob {
                source_key: item.key,
                destination_key,
                is_directory: item.is_directory,
            },
        )
    }

    async fn execute(&self, ctx: UnitContext<MoveJob>) -> Result<(), QueueError> {
        ctx.check_cancelled()?;
        let job = ctx.task.job.clone();
        let settings = self.conflict_settings();

        let oracle = StoreOracle { ctx: &ctx };
        let destination = match conflict::resolve_destination(
            &job.destination_key,
            job.is_directory,
            &settings,
            &oracle,
        )
        .await?
        {
            ConflictOutcome::Skip => {
                info!("Skipping move of {}: destination exists", job.source_key);
                return Err(QueueError::Skipped(job.destination_key));
            }
            ConflictOutcome::Proceed(destination) => destination,
        };

        if destination != job.destination_key {
            let detail = describe(&job.source_key, &destination);
            ctx.retarget(
                MoveJob {
                    destination_key: destination.clone(),
                    ..job.clone()
                },
                detail,
            );
        }

        debug!("Moving {} -> {}", job.source_key, destination);
        ctx.guard(
            ctx.store
                .move_object(&ctx.container, &job.source_key, &destination),
        )
        .await?;
        ctx.report_progress(1.0);
        Ok(())
    }
}

/// Queue of move tasks
pub type MoveQueue = QueueManager<MoveExecutor>;

impl QueueManager<MoveExecutor> {
    /// Move queue using the conflict knobs from `settings`
    pub fn for_moves(settings: &QueueSettings) -> Self {
        Self::new(MoveExecutor::new(settings.conflict()), settings)
    }
}
