//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by every unit of every wave
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Waves started
    waves: AtomicU64,
    /// Outcomes that completed an HTTP exchange
    completed: AtomicU64,
    /// Outcomes that failed before or during the exchange
    failed: AtomicU64,
    /// Subset of `failed` that hit the per-call timeout
    timeouts: AtomicU64,
    /// Subset of `failed` whose unit panicked
    aborted: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waves(&self) -> u64 {
        self.waves.load(Ordering::Relaxed)
    }

    pub fn inc_waves(&self) {
        self.waves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn inc_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            waves: self.waves(),
            completed: self.completed(),
            failed: self.failed(),
            timeouts: self.timeouts(),
            aborted: self.aborted(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub waves: u64,
    pub completed: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub aborted: u64,
}
