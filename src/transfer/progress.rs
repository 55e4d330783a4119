//! Throughput sampling and remaining-time estimation for transfers

use crate::queue::TaskId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default minimum time between speed recomputations.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Samples cumulative transferred bytes and publishes a smoothed speed.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    sample_interval: Duration,
    started_at: Option<Instant>,
    last_sample: Option<(Instant, u64)>,
    bytes_by_task: HashMap<TaskId, u64>,
    total_bytes: u64,
    current_speed: f64, // bytes per second
    recomputations: u64,
}

impl SpeedEstimator {
    /// Create a new estimator
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            sample_interval,
            started_at: None,
            last_sample: None,
            bytes_by_task: HashMap::new(),
            total_bytes: 0,
            current_speed: 0.0,
            recomputations: 0,
        }
    }

    /// Forget all samples; called when a queue goes from idle to busy.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.last_sample = None;
        self.bytes_by_task.clear();
        self.total_bytes = 0;
        self.current_speed = 0.0;
    }

    /// Record cumulative bytes for one task. Returns true when the speed
    /// was recomputed.
    pub fn record(&mut self, task: TaskId, bytes_done: u64) -> bool {
        self.record_at(Instant::now(), task, bytes_done)
    }

    pub fn record_at(&mut self, now: Instant, task: TaskId, bytes_done: u64) -> bool {
        let previous = self.bytes_by_task.insert(task, bytes_done).unwrap_or(0);
        self.total_bytes = (self.total_bytes + bytes_done).saturating_sub(previous);
        self.started_at.get_or_insert(now);

        let Some((last_at, last_total)) = self.last_sample else {
            self.last_sample = Some((now, self.total_bytes));
            return false;
        };

        let elapsed = now.saturating_duration_since(last_at);
        if elapsed < self.sample_interval {
            return false;
        }

        let delta = self.total_bytes.saturating_sub(last_total);
        self.current_speed = delta as f64 / elapsed.as_secs_f64();
        self.last_sample = Some((now, self.total_bytes));
        self.recomputations += 1;
        true
    }

    /// Drop a task's contribution, e.g. before it is retried from zero.
    pub fn forget_task(&mut self, task: TaskId) {
        if let Some(bytes) = self.bytes_by_task.remove(&task) {
            self.total_bytes = self.total_bytes.saturating_sub(bytes);
            if let Some((at, total)) = self.last_sample {
                self.last_sample = Some((at, total.saturating_sub(bytes)));
            }
        }
    }

    /// Published speed in bytes per second
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    /// Bytes recorded since the last reset
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// How many times the speed has been recomputed
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Remaining time for `(size, progress)` pairs of the active tasks.
    /// Zero when no speed has been measured yet.
    pub fn estimate_remaining<I>(&self, active: I) -> Duration
    where
        I: IntoIterator<Item = (u64, f64)>,
    {
        if self.current_speed <= 0.0 {
            return Duration::ZERO;
        }
        let remaining: f64 = active
            .into_iter()
            .map(|(size, progress)| size as f64 * (1.0 - progress.clamp(0.0, 1.0)))
            .sum();
        // Saturates when the remainder dwarfs a very slow measured speed
        Duration::try_from_secs_f64(remaining / self.current_speed).unwrap_or(Duration::MAX)
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

/// Human-readable byte count using decimal units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Throughput such as `"2.5 MB/s"`
pub fn format_speed(bytes_per_second: f64) -> String {
    let bytes = if bytes_per_second.is_finite() && bytes_per_second > 0.0 {
        bytes_per_second.round() as u64
    } else {
        0
    };
    format!("{}/s", format_bytes(bytes))
}

/// Remaining time such as `"1h 02m"`, `"3m 04s"` or `"12s"`
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
