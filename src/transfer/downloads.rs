//! Download queue: chunked transfers to local files with speed and ETA

use super::progress::{format_bytes, format_eta, format_speed, SpeedEstimator};
use crate::queue::{Job, QueueManager, Task, TaskExecutor, TaskId, UnitContext};
use crate::store::key;
use crate::utils::config::QueueSettings;
use crate::utils::error::QueueError;
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Appended to the destination file name while a download is in flight
pub const PARTIAL_SUFFIX: &str = ".part";

/// Remote object selected for download
#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub key: String,
    pub size: u64,
}

impl DownloadItem {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Payload of a download task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadJob {
    pub key: String,
    pub size: u64,
    pub destination: PathBuf,
}

impl DownloadJob {
    /// Sibling file the bytes stream into before the final rename
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(PARTIAL_SUFFIX);
        self.destination.with_file_name(name)
    }
}

impl Job for DownloadJob {
    fn source_key(&self) -> &str {
        &self.key
    }
}

/// Executes download tasks and samples their throughput
#[derive(Debug, Clone)]
pub struct DownloadExecutor {
    estimator: Arc<Mutex<SpeedEstimator>>,
}

impl DownloadExecutor {
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            estimator: Arc::new(Mutex::new(SpeedEstimator::new(sample_interval))),
        }
    }

    /// Published speed in bytes per second
    pub fn current_speed(&self) -> f64 {
        self.estimator
            .lock()
            .map(|est| est.current_speed())
            .unwrap_or(0.0)
    }

    /// Remaining time for `(size, progress)` pairs
    pub fn estimate_remaining<I>(&self, active: I) -> Duration
    where
        I: IntoIterator<Item = (u64, f64)>,
    {
        self.estimator
            .lock()
            .map(|est| est.estimate_remaining(active))
            .unwrap_or_default()
    }

    fn forget_task(&self, task: TaskId) {
        if let Ok(mut est) = self.estimator.lock() {
            est.forget_task(task);
        }
    }
}

impl Default for DownloadExecutor {
    fn default() -> Self {
        Self::new(super::progress::DEFAULT_SAMPLE_INTERVAL)
    }
}

#[async_trait]
impl TaskExecutor for DownloadExecutor {
    type Job = DownloadJob;
    type Item = DownloadItem;
    /// Local directory receiving the files
    type Destination = PathBuf;

    fn kind(&self) -> &'static str {
        "download"
    }

    fn build_task(&self, item: DownloadItem, destination: &PathBuf) -> Task<DownloadJob> {
        let name = key::object_name(&item.key)
            .trim_end_matches(key::SEPARATOR)
            .to_string();
        Task::new(
            name.clone(),
            format_bytes(item.size),
            DownloadJob {
                destination: destination.join(&name),
                key: item.key,
                size: item.size,
            },
        )
    }

    fn cycle_started(&self) {
        if let Ok(mut est) = self.estimator.lock() {
            est.reset();
        }
    }

    async fn execute(&self, ctx: UnitContext<DownloadJob>) -> Result<(), QueueError> {
        ctx.check_cancelled()?;
        let job = ctx.task.job.clone();
        let task_id = ctx.task.id;

        if let Some(parent) = job.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // A retried task starts again from zero bytes
        self.forget_task(task_id);

        let sink = ctx.progress_sink();
        let estimator = Arc::clone(&self.estimator);
        let known_size = job.size;
        let on_progress = move |done: u64, total: u64| {
            let total = if total > 0 { total } else { known_size };
            if total > 0 {
                sink.report(done as f64 / total as f64);
            }
            if let Ok(mut est) = estimator.lock() {
                est.record(task_id, done);
            }
        };

        // The destination is only written by the final rename
        let part_path = job.partial_path();
        debug!("Downloading {} -> {:?}", job.key, part_path);
        let result = ctx
            .guard(ctx.store.download(
                &ctx.container,
                &job.key,
                &part_path,
                job.size,
                &on_progress,
            ))
            .await;

        match result {
            Ok(()) => {
                tokio::fs::rename(&part_path, &job.destination).await?;
                Ok(())
            }
            Err(e) => {
                debug!("Removing partial download {:?} after: {}", part_path, e);
                if let Err(remove_err) = tokio::fs::remove_file(&part_path).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            "Failed to remove partial download {:?}: {}",
                            part_path, remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

/// Queue of download tasks
pub type DownloadQueue = QueueManager<DownloadExecutor>;

impl QueueManager<DownloadExecutor> {
    /// Download queue sampling speed at the configured interval
    pub fn for_downloads(settings: &QueueSettings) -> Self {
        Self::new(
            DownloadExecutor::new(settings.speed_sample_interval()),
            settings,
        )
    }

    /// Current throughput in bytes per second
    pub fn current_speed(&self) -> f64 {
        self.executor().current_speed()
    }

    pub fn formatted_speed(&self) -> String {
        format_speed(self.current_speed())
    }

    /// Time left for every active download at the current speed
    pub async fn estimated_time_remaining(&self) -> Duration {
        let tasks = self.tasks().await;
        self.executor().estimate_remaining(
            tasks
                .iter()
                .filter(|t| t.is_active())
                .map(|t| (t.job.size, t.progress)),
        )
    }

    pub async fn formatted_eta(&self) -> String {
        format_eta(self.estimated_time_remaining().await)
    }
}
