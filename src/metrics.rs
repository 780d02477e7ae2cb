// Action metrics
//
// Lightweight counters describing how the action pipeline has been used

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Action pipeline metrics
///
/// Uses atomic operations so any thread that dispatches or posts an action can
/// record it without taking a lock. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Actions that validated and ran successfully
    pub actions_dispatched: AtomicU64,

    /// Actions rejected by validation or failing while running
    pub actions_rejected: AtomicU64,

    /// Undo steps applied
    pub actions_undone: AtomicU64,

    /// Redo steps applied
    pub actions_redone: AtomicU64,

    /// Actions queued onto the application thread
    pub actions_posted: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            actions_dispatched: AtomicU64::new(0),
            actions_rejected: AtomicU64::new(0),
            actions_undone: AtomicU64::new(0),
            actions_redone: AtomicU64::new(0),
            actions_posted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_dispatched(&self) {
        self.actions_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.actions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undone(&self) {
        self.actions_undone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redone(&self) {
        self.actions_redone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_posted(&self) {
        self.actions_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of executed actions that were rejected, between 0 and 1
    pub fn rejection_rate(&self) -> f64 {
        let rejected = self.actions_rejected.load(Ordering::Relaxed);
        let total = rejected + self.actions_dispatched.load(Ordering::Relaxed);
        if total > 0 {
            rejected as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Action Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Actions: {} dispatched, {} rejected ({:.0}%), {} posted",
            self.actions_dispatched.load(Ordering::Relaxed),
            self.actions_rejected.load(Ordering::Relaxed),
            self.rejection_rate() * 100.0,
            self.actions_posted.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Undo: {} undone, {} redone",
            self.actions_undone.load(Ordering::Relaxed),
            self.actions_redone.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
