//! Queued task model and the per-queue execution seam

use crate::store::{RemoteStore, StoreError};
use crate::utils::error::QueueError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Task identifier
pub type TaskId = Uuid;

/// Task status
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed(String),
    Cancelled,
}

impl TaskStatus {
    /// Pending or processing.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }

    /// Removed by `clear_completed`.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed(reason) => write!(f, "failed: {}", reason),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Payload of a concrete task kind
pub trait Job: Clone + fmt::Debug + Send + Sync + 'static {
    /// Key used to drop duplicate requests while a task is active.
    fn source_key(&self) -> &str;
}

/// One queued unit of work
#[derive(Debug, Clone, Serialize)]
pub struct Task<J> {
    pub id: TaskId,
    pub display_name: String,
    pub display_detail: String,
    pub progress: f64,
    pub status: TaskStatus,
    pub added_at: DateTime<Utc>,
    pub job: J,
}

impl<J: Job> Task<J> {
    /// Create a new pending task
    pub fn new(display_name: impl Into<String>, display_detail: impl Into<String>, job: J) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            display_detail: display_detail.into(),
            progress: 0.0,
            status: TaskStatus::Pending,
            added_at: Utc::now(),
            job,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Raise progress, never lowering it and never leaving [0, 1].
    pub(crate) fn advance_progress(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction > self.progress {
            self.progress = fraction;
        }
    }

    /// Back to pending for another attempt.
    pub(crate) fn reset_for_retry(&mut self) {
        self.status = TaskStatus::Pending;
        self.progress = 0.0;
    }
}

/// Messages an execution unit sends back to its manager
#[derive(Debug)]
pub(crate) enum UnitUpdate<J> {
    Progress(f64),
    Retarget { job: J, display_detail: String },
}

/// Everything an execution unit needs to run one task.
pub struct UnitContext<J> {
    pub task: Task<J>,
    pub store: Arc<dyn RemoteStore>,
    pub container: String,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<UnitUpdate<J>>,
}

impl<J: Job> UnitContext<J> {
    pub(crate) fn new(
        task: Task<J>,
        store: Arc<dyn RemoteStore>,
        container: String,
        cancel: CancellationToken,
        updates: mpsc::UnboundedSender<UnitUpdate<J>>,
    ) -> Self {
        Self {
            task,
            store,
            container,
            cancel,
            updates,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the task has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), QueueError> {
        if self.is_cancelled() {
            Err(QueueError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a store call as a cancellation point: a cancel while it is
    /// pending abandons the call, and a cancel that lands while it finishes
    /// still wins.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, QueueError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(QueueError::Cancelled),
            result = call => {
                let value = result?;
                self.check_cancelled()?;
                Ok(value)
            }
        }
    }

    /// Report fractional progress in [0, 1].
    pub fn report_progress(&self, fraction: f64) {
        let _ = self.updates.send(UnitUpdate::Progress(fraction));
    }

    /// A cloneable, synchronous progress sink for store callbacks.
    pub fn progress_sink(&self) -> ProgressSink<J> {
        ProgressSink {
            updates: self.updates.clone(),
        }
    }

    /// Point the task at a new destination before its transfer starts.
    pub fn retarget(&self, job: J, display_detail: String) {
        let _ = self.updates.send(UnitUpdate::Retarget {
            job,
            display_detail,
        });
    }
}

/// Synchronous progress reporter handed to store callbacks
pub struct ProgressSink<J> {
    updates: mpsc::UnboundedSender<UnitUpdate<J>>,
}

impl<J> Clone for ProgressSink<J> {
    fn clone(&self) -> Self {
        Self {
            updates: self.updates.clone(),
        }
    }
}

impl<J> ProgressSink<J> {
    pub fn report(&self, fraction: f64) {
        let _ = self.updates.send(UnitUpdate::Progress(fraction));
    }
}

/// Per-queue behavior plugged into the generic [`QueueManager`].
///
/// [`QueueManager`]: crate::queue::QueueManager
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    type Job: Job;
    /// Raw descriptor handed to `add_tasks`.
    type Item: Send;
    /// Batch destination handed to `add_tasks`.
    type Destination: Send + Sync;

    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    fn build_task(&self, item: Self::Item, destination: &Self::Destination) -> Task<Self::Job>;

    /// Called when the queue goes from idle to processing.
    fn cycle_started(&self) {}

    /// Perform the task. `Err(Cancelled | Skipped)` ends as cancelled, any
    /// other error as failed.
    async fn execute(&self, ctx: UnitContext<Self::Job>) -> Result<(), QueueError>;
}
