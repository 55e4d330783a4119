//! Generic task queue manager with bounded concurrent execution

use super::task::{Job, Task, TaskExecutor, TaskId, TaskStatus, UnitContext, UnitUpdate};
use crate::store::RemoteStore;
use crate::utils::config::QueueSettings;
use crate::utils::error::QueueError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Callback fired once each time the queue drains.
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Observable queue state published to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot<J> {
    pub tasks: Vec<Task<J>>,
    pub is_processing: bool,
    pub is_panel_visible: bool,
    pub aggregate_progress: f64,
}

impl<J> QueueSnapshot<J> {
    fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            is_processing: false,
            is_panel_visible: false,
            aggregate_progress: 0.0,
        }
    }

    /// Tasks still pending or processing.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.status.is_active()).count()
    }

    /// Tasks currently processing.
    pub fn processing_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Processing)
            .count()
    }
}

/// Remote store and container the units run against
#[derive(Clone)]
struct StoreBinding {
    store: Arc<dyn RemoteStore>,
    container: String,
}

/// Bookkeeping for a unit that currently owns a concurrency slot
struct RunningUnit {
    run: u64,
    cancel: CancellationToken,
}

/// Whether a publish may be deferred by the throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Publish {
    Throttled,
    Immediate,
}

struct QueueState<J> {
    tasks: Vec<Task<J>>,
    running: HashMap<TaskId, RunningUnit>,
    next_run: u64,
    max_concurrent: usize,
    binding: Option<StoreBinding>,
    is_processing: bool,
    panel_visible: bool,
    last_publish: Option<Instant>,
    flush_scheduled: bool,
}

impl<J: Job> QueueState<J> {
    fn task_mut(&mut self, id: TaskId) -> Option<&mut Task<J>> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn owns_run(&self, id: TaskId, run: u64) -> bool {
        matches!(self.running.get(&id), Some(unit) if unit.run == run)
    }

    fn has_active(&self) -> bool {
        self.tasks.iter().any(|t| t.status.is_active())
    }

    fn aggregate_progress(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.tasks.iter().map(|t| t.progress).sum::<f64>() / self.tasks.len() as f64
    }

    fn snapshot(&self) -> QueueSnapshot<J> {
        QueueSnapshot {
            tasks: self.tasks.clone(),
            is_processing: self.is_processing,
            is_panel_visible: self.panel_visible,
            aggregate_progress: self.aggregate_progress(),
        }
    }
}

struct Inner<E: TaskExecutor> {
    executor: E,
    state: Mutex<QueueState<E::Job>>,
    snapshot_tx: watch::Sender<QueueSnapshot<E::Job>>,
    notify_interval: Duration,
    on_complete: std::sync::Mutex<Option<CompletionCallback>>,
}

/// Task queue manager with bounded concurrent execution.
///
/// All task mutation goes through this handle; clones share one queue.
pub struct QueueManager<E: TaskExecutor> {
    inner: Arc<Inner<E>>,
}

impl<E: TaskExecutor> Clone for QueueManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: TaskExecutor> QueueManager<E> {
    /// Create new queue manager
    pub fn new(executor: E, settings: &QueueSettings) -> Self {
        let settings = settings.clone().normalized();
        let (snapshot_tx, _) = watch::channel(QueueSnapshot::empty());

        Self {
            inner: Arc::new(Inner {
                executor,
                state: Mutex::new(QueueState {
                    tasks: Vec::new(),
                    running: HashMap::new(),
                    next_run: 0,
                    max_concurrent: settings.max_concurrent,
                    binding: None,
                    is_processing: false,
                    panel_visible: false,
                    last_publish: None,
                    flush_scheduled: false,
                }),
                snapshot_tx,
                notify_interval: settings.notify_interval(),
                on_complete: std::sync::Mutex::new(None),
            }),
        }
    }

    /// The per-queue executor.
    pub fn executor(&self) -> &E {
        &self.inner.executor
    }

    /// Bind the remote store and container that units run against.
    pub async fn configure(&self, store: Arc<dyn RemoteStore>, container: impl Into<String>) {
        let container = container.into();
        info!(
            "Configured {} queue for container {}",
            self.inner.executor.kind(),
            container
        );
        let mut state = self.inner.state.lock().await;
        state.binding = Some(StoreBinding { store, container });
    }

    /// Register the callback fired when the queue drains.
    pub fn set_on_complete<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.inner.on_complete.lock() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// Change the concurrency ceiling (clamped to 1..=10).
    pub async fn set_max_concurrent(&self, max_concurrent: usize) {
        let max_concurrent = QueueSettings::clamp_concurrency(max_concurrent);
        let mut state = self.inner.state.lock().await;
        state.max_concurrent = max_concurrent;
        self.inner.schedule(&mut state);
        info!("Max concurrent set to {}", max_concurrent);
    }

    /// Add a batch of tasks
    pub async fn add_tasks(&self, items: Vec<E::Item>, destination: E::Destination) {
        if items.is_empty() {
            return;
        }

        let mut state = self.inner.state.lock().await;
        let mut added = 0usize;
        for item in items {
            let task = self.inner.executor.build_task(item, &destination);
            let duplicate = state
                .tasks
                .iter()
                .any(|t| t.is_active() && t.job.source_key() == task.job.source_key());
            if duplicate {
                debug!("Skipping duplicate task for {}", task.job.source_key());
                continue;
            }
            state.tasks.push(task);
            added += 1;
        }

        info!(
            "Added {} task(s) to {} queue",
            added,
            self.inner.executor.kind()
        );
        state.panel_visible = true;
        self.inner.schedule(&mut state);
        self.inner.publish(&mut state, Publish::Immediate);
    }

    /// Cancel task
    pub async fn cancel_task(&self, task_id: TaskId) {
        let drained = {
            let mut state = self.inner.state.lock().await;
            let Some(task) = state.task_mut(task_id) else {
                warn!("Cancel requested for unknown task {}", task_id);
                return;
            };
            if !task.is_active() {
                debug!("Task {} is not active, nothing to cancel", task_id);
                return;
            }
            task.status = TaskStatus::Cancelled;

            if let Some(unit) = state.running.remove(&task_id) {
                unit.cancel.cancel();
            }
            info!("Cancelled task {}", task_id);

            self.inner.schedule(&mut state);
            let drained = self.inner.take_drain(&mut state);
            self.inner.publish(&mut state, Publish::Immediate);
            drained
        };

        if drained {
            self.inner.fire_completion();
        }
    }

    /// Retry a task that is no longer active
    pub async fn retry_task(&self, task_id: TaskId) {
        let mut state = self.inner.state.lock().await;
        let Some(task) = state.task_mut(task_id) else {
            warn!("Retry requested for unknown task {}", task_id);
            return;
        };
        if task.is_active() {
            debug!("Task {} is still active, ignoring retry", task_id);
            return;
        }
        task.reset_for_retry();
        info!("Retrying task {}", task_id);

        self.inner.schedule(&mut state);
        self.inner.publish(&mut state, Publish::Immediate);
    }

    /// Retry every failed task
    pub async fn retry_all_failed(&self) {
        let mut state = self.inner.state.lock().await;
        let mut retried = 0usize;
        for task in state
            .tasks
            .iter_mut()
            .filter(|t| matches!(t.status, TaskStatus::Failed(_)))
        {
            task.reset_for_retry();
            retried += 1;
        }
        if retried == 0 {
            return;
        }
        info!("Retrying {} failed task(s)", retried);

        self.inner.schedule(&mut state);
        self.inner.publish(&mut state, Publish::Immediate);
    }

    /// Remove completed and cancelled tasks
    pub async fn clear_completed(&self) {
        let mut state = self.inner.state.lock().await;
        let before = state.tasks.len();
        state.tasks.retain(|t| !t.status.is_finished());
        if state.tasks.is_empty() {
            state.panel_visible = false;
        }

        info!("Cleared {} finished task(s)", before - state.tasks.len());
        self.inner.publish(&mut state, Publish::Immediate);
    }

    /// Cancel everything and empty the queue
    pub async fn clear_all(&self) {
        let mut state = self.inner.state.lock().await;
        for (_, unit) in state.running.drain() {
            unit.cancel.cancel();
        }
        state.tasks.clear();
        state.is_processing = false;
        state.panel_visible = false;

        info!("Cleared {} queue", self.inner.executor.kind());
        self.inner.publish(&mut state, Publish::Immediate);
    }

    /// Get all tasks
    pub async fn tasks(&self) -> Vec<Task<E::Job>> {
        self.inner.state.lock().await.tasks.clone()
    }

    /// Current state, bypassing the notification throttle
    pub async fn snapshot(&self) -> QueueSnapshot<E::Job> {
        self.inner.state.lock().await.snapshot()
    }

    /// Receive throttled state updates
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot<E::Job>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub async fn is_processing(&self) -> bool {
        self.inner.state.lock().await.is_processing
    }

    pub async fn is_panel_visible(&self) -> bool {
        self.inner.state.lock().await.panel_visible
    }

    /// Mean progress of all tasks, 0 when empty
    pub async fn aggregate_progress(&self) -> f64 {
        self.inner.state.lock().await.aggregate_progress()
    }

    /// Units currently holding a concurrency slot
    pub async fn running_count(&self) -> usize {
        self.inner.state.lock().await.running.len()
    }

    pub async fn max_concurrent(&self) -> usize {
        self.inner.state.lock().await.max_concurrent
    }

    /// Wait until no task is pending or processing
    pub async fn wait_for_drain(&self) {
        let mut rx = self.subscribe();
        if rx.wait_for(|snapshot| snapshot.active_count() == 0).await.is_err() {
            warn!("Queue snapshot channel closed while waiting for drain");
        }
    }
}

impl<E: TaskExecutor> Inner<E> {
    /// Admit pending tasks, oldest first, until the ceiling is reached.
    fn schedule(self: &Arc<Self>, state: &mut QueueState<E::Job>) {
        while state.running.len() < state.max_concurrent {
            let Some(index) = state
                .tasks
                .iter()
                .position(|t| t.status == TaskStatus::Pending)
            else {
                break;
            };

            if !state.is_processing {
                state.is_processing = true;
                self.executor.cycle_started();
                info!("{} queue started processing", self.executor.kind());
            }

            state.next_run += 1;
            let run = state.next_run;
            let cancel = CancellationToken::new();

            let task = &mut state.tasks[index];
            task.status = TaskStatus::Processing;
            let task = task.clone();
            let task_id = task.id;

            state.running.insert(
                task_id,
                RunningUnit {
                    run,
                    cancel: cancel.clone(),
                },
            );

            let binding = state.binding.clone();
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.run_unit(task, run, binding, cancel).await;
            });

            debug!("Started task {} (run {})", task_id, run);
        }
    }

    async fn run_unit(
        self: Arc<Self>,
        task: Task<E::Job>,
        run: u64,
        binding: Option<StoreBinding>,
        cancel: CancellationToken,
    ) {
        let task_id = task.id;
        let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();

        // Apply progress and retarget messages in order while the unit runs
        let inner = Arc::clone(&self);
        let forwarder = tokio::spawn(async move {
            while let Some(update) = updates_rx.recv().await {
                inner.apply_update(task_id, run, update).await;
            }
        });

        let result = match binding {
            None => {
                drop(updates_tx);
                Err(QueueError::NotConfigured)
            }
            Some(binding) => {
                let ctx = UnitContext::new(
                    task,
                    binding.store,
                    binding.container,
                    cancel,
                    updates_tx,
                );
                // A panicking executor must still reach `finish` and free its slot
                let inner = Arc::clone(&self);
                match tokio::spawn(async move { inner.executor.execute(ctx).await }).await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Execution unit for task {} panicked: {}", task_id, e);
                        Err(QueueError::UnitPanicked(e.to_string()))
                    }
                }
            }
        };

        if let Err(e) = forwarder.await {
            error!("Progress forwarder for task {} panicked: {}", task_id, e);
        }

        self.finish(task_id, run, result).await;
    }

    async fn apply_update(self: &Arc<Self>, task_id: TaskId, run: u64, update: UnitUpdate<E::Job>) {
        let mut state = self.state.lock().await;
        if !state.owns_run(task_id, run) {
            return;
        }
        let Some(task) = state.task_mut(task_id) else {
            return;
        };
        if task.status != TaskStatus::Processing {
            return;
        }

        match update {
            UnitUpdate::Progress(fraction) => task.advance_progress(fraction),
            UnitUpdate::Retarget {
                job,
                display_detail,
            } => {
                task.job = job;
                task.display_detail = display_detail;
            }
        }
        self.publish(&mut state, Publish::Throttled);
    }

    /// Record a unit's terminal outcome and backfill its slot.
    async fn finish(self: &Arc<Self>, task_id: TaskId, run: u64, result: Result<(), QueueError>) {
        let drained = {
            let mut state = self.state.lock().await;
            if !state.owns_run(task_id, run) {
                debug!("Ignoring late result for task {} (run {})", task_id, run);
                return;
            }
            state.running.remove(&task_id);

            if let Some(task) = state.task_mut(task_id) {
                // Only a still-processing task may take the unit's outcome
                if task.status == TaskStatus::Processing {
                    match result {
                        Ok(()) => {
                            task.status = TaskStatus::Completed;
                            task.advance_progress(1.0);
                            info!("Task {} completed", task_id);
                        }
                        Err(e) if e.is_cancellation() => {
                            task.status = TaskStatus::Cancelled;
                            info!("Task {} cancelled: {}", task_id, e);
                        }
                        Err(e) => {
                            error!("Task {} failed: {}", task_id, e);
                            task.status = TaskStatus::Failed(e.to_string());
                        }
                    }
                }
            }

            self.schedule(&mut state);
            let drained = self.take_drain(&mut state);
            let urgency = if drained {
                Publish::Immediate
            } else {
                Publish::Throttled
            };
            self.publish(&mut state, urgency);
            drained
        };

        if drained {
            self.fire_completion();
        }
    }

    /// Flip `is_processing` off once nothing is left to do. True at most
    /// once per processing cycle.
    fn take_drain(&self, state: &mut QueueState<E::Job>) -> bool {
        if state.is_processing && !state.has_active() {
            state.is_processing = false;
            info!("{} queue drained", self.executor.kind());
            return true;
        }
        false
    }

    fn fire_completion(&self) {
        let callback = match self.on_complete.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Publish a snapshot, deferring throttled updates to a trailing flush.
    fn publish(self: &Arc<Self>, state: &mut QueueState<E::Job>, urgency: Publish) {
        let now = Instant::now();
        let elapsed = state.last_publish.map(|at| now.duration_since(at));
        let due = elapsed.map_or(true, |e| e >= self.notify_interval);

        if urgency == Publish::Immediate || due {
            state.last_publish = Some(now);
            self.snapshot_tx.send_replace(state.snapshot());
            return;
        }

        if state.flush_scheduled {
            return;
        }
        state.flush_scheduled = true;
        let wait = self
            .notify_interval
            .saturating_sub(elapsed.unwrap_or_default());
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let mut state = inner.state.lock().await;
            state.flush_scheduled = false;
            state.last_publish = Some(Instant::now());
            inner.snapshot_tx.send_replace(state.snapshot());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProgressFn, StoreError};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct Echo(String);

    impl Job for Echo {
        fn source_key(&self) -> &str {
            &self.0
        }
    }

    /// Completes after a short sleep; keys starting with "fail" fail and
    /// keys starting with "panic" panic.
    struct EchoExecutor {
        cycles: AtomicUsize,
    }

    #[async_trait]
    impl TaskExecutor for EchoExecutor {
        type Job = Echo;
        type Item = String;
        type Destination = ();

        fn kind(&self) -> &'static str {
            "echo"
        }

        fn build_task(&self, item: String, _destination: &()) -> Task<Echo> {
            Task::new(item.clone(), "", Echo(item))
        }

        fn cycle_started(&self) {
            self.cycles.fetch_add(1, Ordering::SeqCst);
        }

        async fn execute(&self, ctx: UnitContext<Echo>) -> Result<(), QueueError> {
            ctx.report_progress(0.5);
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.check_cancelled()?;
            if ctx.task.job.0.starts_with("fail") {
                return Err(QueueError::Store(StoreError::Transport("boom".into())));
            }
            if ctx.task.job.0.starts_with("panic") {
                panic!("executor blew up on {}", ctx.task.job.0);
            }
            Ok(())
        }
    }

    struct NullStore;

    #[async_trait]
    impl RemoteStore for NullStore {
        async fn exists(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn move_object(&self, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn download(
            &self,
            _: &str,
            _: &str,
            _: &Path,
            _: u64,
            _: ProgressFn<'_>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn settings(max_concurrent: usize) -> QueueSettings {
        QueueSettings {
            max_concurrent,
            notify_interval_ms: 10,
            ..Default::default()
        }
    }

    async fn echo_queue(max_concurrent: usize) -> QueueManager<EchoExecutor> {
        let qm = QueueManager::new(
            EchoExecutor {
                cycles: AtomicUsize::new(0),
            },
            &settings(max_concurrent),
        );
        qm.configure(Arc::new(NullStore), "bucket").await;
        qm
    }

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_empty_batch_is_noop() {
        let qm = echo_queue(2).await;
        qm.add_tasks(Vec::new(), ()).await;
        assert!(qm.tasks().await.is_empty());
        assert!(!qm.is_panel_visible().await);
    }

    #[tokio::test]
    async fn test_admits_up_to_ceiling_in_fifo_order() {
        let qm = echo_queue(2).await;
        qm.add_tasks(items(&["a", "b", "c"]), ()).await;

        let tasks = qm.tasks().await;
        assert_eq!(tasks[0].status, TaskStatus::Processing);
        assert_eq!(tasks[1].status, TaskStatus::Processing);
        assert_eq!(tasks[2].status, TaskStatus::Pending);
        assert_eq!(qm.running_count().await, 2);
        assert!(qm.is_panel_visible().await);
    }

    #[tokio::test]
    async fn test_drain_marks_completed_and_fires_once() {
        let qm = echo_queue(2).await;
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        qm.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        qm.add_tasks(items(&["a", "b", "fail-c"]), ()).await;
        qm.wait_for_drain().await;

        let tasks = qm.tasks().await;
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[0].progress, 1.0);
        assert_eq!(tasks[2].status, TaskStatus::Failed("boom".into()));
        assert!(!qm.is_processing().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(qm.executor().cycles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_batch_starts_new_cycle() {
        let qm = echo_queue(1).await;
        qm.add_tasks(items(&["a"]), ()).await;
        qm.wait_for_drain().await;
        qm.add_tasks(items(&["b"]), ()).await;
        assert!(qm.is_processing().await);
        qm.wait_for_drain().await;
        assert_eq!(qm.executor().cycles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_queue_fails_tasks() {
        let qm = QueueManager::new(
            EchoExecutor {
                cycles: AtomicUsize::new(0),
            },
            &settings(3),
        );
        qm.add_tasks(items(&["a", "b"]), ()).await;
        qm.wait_for_drain().await;

        for task in qm.tasks().await {
            assert_eq!(
                task.status,
                TaskStatus::Failed(QueueError::NotConfigured.to_string())
            );
        }
        assert_eq!(qm.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_unit_fails_and_frees_slot() {
        let qm = echo_queue(1).await;
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        qm.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        qm.add_tasks(items(&["panic-a", "b"]), ()).await;
        tokio::time::timeout(Duration::from_secs(5), qm.wait_for_drain())
            .await
            .expect("queue stalled after a panic");

        let tasks = qm.tasks().await;
        assert!(
            matches!(&tasks[0].status, TaskStatus::Failed(reason) if reason.contains("panicked")),
            "unexpected status {:?}",
            tasks[0].status
        );
        assert_eq!(tasks[1].status, TaskStatus::Completed);
        assert_eq!(qm.running_count().await, 0);
        assert!(!qm.is_processing().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_inactive_task_is_noop() {
        let qm = echo_queue(1).await;
        qm.add_tasks(items(&["a"]), ()).await;
        qm.wait_for_drain().await;

        let id = qm.tasks().await[0].id;
        qm.cancel_task(id).await;
        assert_eq!(qm.tasks().await[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_retry_ignored_while_active() {
        let qm = echo_queue(1).await;
        qm.add_tasks(items(&["a"]), ()).await;
        let id = qm.tasks().await[0].id;

        qm.retry_task(id).await;
        assert_eq!(qm.tasks().await[0].status, TaskStatus::Processing);
        qm.wait_for_drain().await;
    }

    #[tokio::test]
    async fn test_set_max_concurrent_admits_more() {
        let qm = echo_queue(1).await;
        qm.add_tasks(items(&["a", "b", "c"]), ()).await;
        assert_eq!(qm.running_count().await, 1);

        qm.set_max_concurrent(3).await;
        assert_eq!(qm.running_count().await, 3);
        assert_eq!(qm.max_concurrent().await, 3);

        qm.set_max_concurrent(50).await;
        assert_eq!(qm.max_concurrent().await, 10);
        qm.wait_for_drain().await;
    }

    #[tokio::test]
    async fn test_clear_all_empties_without_completion() {
        let qm = echo_queue(2).await;
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        qm.set_on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        qm.add_tasks(items(&["a", "b", "c"]), ()).await;
        qm.clear_all().await;

        assert!(qm.tasks().await.is_empty());
        assert!(!qm.is_processing().await);
        assert!(!qm.is_panel_visible().await);
        assert_eq!(qm.running_count().await, 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aggregate_progress_is_mean() {
        let qm = echo_queue(1).await;
        assert_eq!(qm.aggregate_progress().await, 0.0);

        qm.add_tasks(items(&["a", "b"]), ()).await;
        qm.wait_for_drain().await;
        assert_eq!(qm.aggregate_progress().await, 1.0);
    }
}
