//! Global atomic counters for the oracle bridge.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at shutdown).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    registrations: AtomicU64,
    registration_failures: AtomicU64,
    requests_received: AtomicU64,
    transport_errors: AtomicU64,
    submissions_attempted: AtomicU64,
    submissions_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            registration_failures: AtomicU64::new(0),
            requests_received: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            submissions_attempted: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
        }
    }

    pub fn inc_registrations(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "registrations", "counter incremented");
    }

    pub fn inc_registration_failures(&self) {
        self.registration_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "registration_failures", "counter incremented");
    }

    pub fn inc_requests(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requests_received", "counter incremented");
    }

    pub fn inc_transport_errors(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transport_errors", "counter incremented");
    }

    pub fn inc_submissions(&self) {
        self.submissions_attempted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "submissions_attempted", "counter incremented");
    }

    pub fn inc_submission_failures(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "submissions_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            registrations = self.registrations(),
            registration_failures = self.registration_failures(),
            requests_received = self.requests_received(),
            transport_errors = self.transport_errors(),
            submissions_attempted = self.submissions_attempted(),
            submissions_failed = self.submissions_failed(),
        );
    }

    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    pub fn registration_failures(&self) -> u64 {
        self.registration_failures.load(Ordering::Relaxed)
    }

    pub fn requests_received(&self) -> u64 {
        self.requests_received.load(Ordering::Relaxed)
    }

    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    pub fn submissions_attempted(&self) -> u64 {
        self.submissions_attempted.load(Ordering::Relaxed)
    }

    pub fn submissions_failed(&self) -> u64 {
        self.submissions_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.registrations.store(0, Ordering::Relaxed);
        self.registration_failures.store(0, Ordering::Relaxed);
        self.requests_received.store(0, Ordering::Relaxed);
        self.transport_errors.store(0, Ordering::Relaxed);
        self.submissions_attempted.store(0, Ordering::Relaxed);
        self.submissions_failed.store(0, Ordering::Relaxed);
    }
}
