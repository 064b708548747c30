//! Reconfiguration counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics; exactness per counter, not across counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every component of one orchestrator.
#[derive(Debug, Default)]
pub struct ReconfigMetrics {
    config_reads: AtomicU64,
    config_fallback_reads: AtomicU64,
    reconfig_attempts: AtomicU64,
    reconfig_retries: AtomicU64,
    reconfig_successes: AtomicU64,
    reconfig_failures: AtomicU64,
    psa_transitions: AtomicU64,
    psa_partial_transitions: AtomicU64,
}

impl ReconfigMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_config_reads(&self) {
        self.config_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_config_fallback_reads(&self) {
        self.config_fallback_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconfig_attempts(&self) {
        self.reconfig_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconfig_retries(&self) {
        self.reconfig_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconfig_successes(&self) {
        self.reconfig_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconfig_failures(&self) {
        self.reconfig_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_psa_transitions(&self) {
        self.psa_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_psa_partial_transitions(&self) {
        self.psa_partial_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            config_reads: self.config_reads.load(Ordering::Relaxed),
            config_fallback_reads: self.config_fallback_reads.load(Ordering::Relaxed),
            reconfig_attempts: self.reconfig_attempts.load(Ordering::Relaxed),
            reconfig_retries: self.reconfig_retries.load(Ordering::Relaxed),
            reconfig_successes: self.reconfig_successes.load(Ordering::Relaxed),
            reconfig_failures: self.reconfig_failures.load(Ordering::Relaxed),
            psa_transitions: self.psa_transitions.load(Ordering::Relaxed),
            psa_partial_transitions: self.psa_partial_transitions.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        serde_json::json!({
            "config_reads": s.config_reads,
            "config_fallback_reads": s.config_fallback_reads,
            "reconfig_attempts": s.reconfig_attempts,
            "reconfig_retries": s.reconfig_retries,
            "reconfig_successes": s.reconfig_successes,
            "reconfig_failures": s.reconfig_failures,
            "psa_transitions": s.psa_transitions,
            "psa_partial_transitions": s.psa_partial_transitions,
        })
        .to_string()
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub config_reads: u64,
    pub config_fallback_reads: u64,
    pub reconfig_attempts: u64,
    pub reconfig_retries: u64,
    pub reconfig_successes: u64,
    pub reconfig_failures: u64,
    pub psa_transitions: u64,
    pub psa_partial_transitions: u64,
}
