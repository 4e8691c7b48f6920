//! Process-wide counters for the query service.
//!
//! Increments are lock-free. [`Metrics::flush`] logs every counter as one
//! `info!` event, typically on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    queries_received: AtomicU64,
    queries_rejected: AtomicU64,
    queries_answered: AtomicU64,
    engine_failures: AtomicU64,
    engine_timeouts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            queries_received: AtomicU64::new(0),
            queries_rejected: AtomicU64::new(0),
            queries_answered: AtomicU64::new(0),
            engine_failures: AtomicU64::new(0),
            engine_timeouts: AtomicU64::new(0),
        }
    }

    pub fn inc_received(&self) {
        self.queries_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A request failed validation.
    pub fn inc_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_answered(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Engine or configuration failure, timeouts excluded.
    pub fn inc_engine_failures(&self) {
        self.engine_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "engine_failures", "counter incremented");
    }

    pub fn inc_engine_timeouts(&self) {
        self.engine_timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "engine_timeouts", "counter incremented");
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            queries_received = self.queries_received(),
            queries_rejected = self.queries_rejected(),
            queries_answered = self.queries_answered(),
            engine_failures = self.engine_failures(),
            engine_timeouts = self.engine_timeouts(),
        );
    }

    pub fn queries_received(&self) -> u64 {
        self.queries_received.load(Ordering::Relaxed)
    }

    pub fn queries_rejected(&self) -> u64 {
        self.queries_rejected.load(Ordering::Relaxed)
    }

    pub fn queries_answered(&self) -> u64 {
        self.queries_answered.load(Ordering::Relaxed)
    }

    pub fn engine_failures(&self) -> u64 {
        self.engine_failures.load(Ordering::Relaxed)
    }

    pub fn engine_timeouts(&self) -> u64 {
        self.engine_timeouts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.queries_received.store(0, Ordering::Relaxed);
        self.queries_rejected.store(0, Ordering::Relaxed);
        self.queries_answered.store(0, Ordering::Relaxed);
        self.engine_failures.store(0, Ordering::Relaxed);
        self.engine_timeouts.store(0, Ordering::Relaxed);
    }
}
