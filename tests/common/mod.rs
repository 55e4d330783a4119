//! Shared fixtures for the integration tests
//!
//! `MockStore` is an in-memory container that records every call, counts
//! how many operations are in flight at once, and can hold operations at a
//! gate until the test releases them.

#![allow(dead_code)]

use async_trait::async_trait;
use bucketflow::queue::{Job, QueueManager, QueueSnapshot, TaskExecutor, TaskStatus};
use bucketflow::store::{ProgressFn, RemoteStore, StoreError};
use bucketflow::QueueSettings;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const CONTAINER: &str = "bucket";

#[derive(Default)]
pub struct MockStore {
    objects: Mutex<HashSet<String>>,
    moves: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    exists_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    gate: Option<Semaphore>,
    delay: Duration,
    chunks: usize,
}

/// Decrements the in-flight counter when an operation ends
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            chunks: 4,
            ..Default::default()
        }
    }

    pub fn with_objects<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut objects = self.objects.lock().unwrap();
            objects.extend(keys.into_iter().map(Into::into));
        }
        self
    }

    /// Every operation sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of progress callbacks a download emits after the initial one.
    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = chunks.max(1);
        self
    }

    /// Moves and downloads wait until [`MockStore::open_gate`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1024);
        }
    }

    /// Transfers touching `key` fail with a transport error.
    pub fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.failing.lock().unwrap().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.moves.lock().unwrap().clone()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Highest number of moves/downloads observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            // The permit goes back on drop so one release opens the gate for all
            let _permit = gate.acquire().await;
        }
    }

    fn check_failing(&self, key: &str) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StoreError::Transport(format!("connection reset on {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn exists(&self, _container: &str, key: &str) -> Result<bool, StoreError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().unwrap().contains(key))
    }

    async fn move_object(
        &self,
        _container: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.enter();
        self.pass_gate().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.check_failing(source_key)?;

        let mut objects = self.objects.lock().unwrap();
        if !objects.remove(source_key) {
            return Err(StoreError::NotFound(source_key.to_string()));
        }
        objects.insert(destination_key.to_string());
        self.moves
            .lock()
            .unwrap()
            .push((source_key.to_string(), destination_key.to_string()));
        Ok(())
    }

    async fn download(
        &self,
        _container: &str,
        key: &str,
        destination: &Path,
        known_size: u64,
        on_progress: ProgressFn<'_>,
    ) -> Result<(), StoreError> {
        let _guard = self.enter();
        self.pass_gate().await;
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }

        tokio::fs::write(destination, b"").await?;
        on_progress(0, known_size);
        let chunk = known_size / self.chunks as u64;
        for i in 1..=self.chunks {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.check_failing(key)?;
            let done = if i == self.chunks {
                known_size
            } else {
                chunk * i as u64
            };
            on_progress(done, known_size);
        }
        Ok(())
    }
}

/// Settings with a short notification interval so tests see updates quickly
pub fn fast_settings(max_concurrent: usize) -> QueueSettings {
    QueueSettings {
        max_concurrent,
        notify_interval_ms: 10,
        speed_sample_interval_ms: 50,
        ..Default::default()
    }
}

/// Bind `store` to `queue` under the test container.
pub async fn bind<E: TaskExecutor>(queue: &QueueManager<E>, store: &Arc<MockStore>) {
    queue
        .configure(Arc::clone(store) as Arc<dyn RemoteStore>, CONTAINER)
        .await;
}

/// Wait for the queue to drain, failing the test after `limit`.
pub async fn drain<E: TaskExecutor>(queue: &QueueManager<E>, limit: Duration) {
    tokio::time::timeout(limit, queue.wait_for_drain())
        .await
        .expect("queue did not drain in time");
}

pub fn count_status<J: Job>(snapshot: &QueueSnapshot<J>, status: &TaskStatus) -> usize {
    snapshot.tasks.iter().filter(|t| &t.status == status).count()
}

pub fn failed_count<J: Job>(snapshot: &QueueSnapshot<J>) -> usize {
    snapshot
        .tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Failed(_)))
        .count()
}
