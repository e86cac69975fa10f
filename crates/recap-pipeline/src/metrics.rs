//! Job, backend and cache metrics.

use metrics::{counter, gauge};

/// Metric names as constants for consistency.
pub mod names {
    // Queue metrics
    pub const QUEUE_PENDING_WORK: &str = "recap_queue_pending_work";
    pub const QUEUE_PENDING_JOBS: &str = "recap_queue_pending_jobs";
    pub const JOBS_ENQUEUED_TOTAL: &str = "recap_jobs_enqueued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "recap_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "recap_jobs_failed_total";
    pub const JOBS_REJECTED_TOTAL: &str = "recap_jobs_rejected_total";
    pub const JOBS_DISCONNECTED_TOTAL: &str = "recap_jobs_disconnected_total";

    // Backend metrics
    pub const BACKEND_CALLS_TOTAL: &str = "recap_backend_calls_total";
    pub const BACKEND_FAILURES_TOTAL: &str = "recap_backend_failures_total";
    pub const CACHE_HITS_TOTAL: &str = "recap_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "recap_cache_misses_total";
    pub const RENDERS_TOTAL: &str = "recap_renders_total";
}

pub fn set_queue_depth(pending_jobs: usize, pending_work: u64) {
    gauge!(names::QUEUE_PENDING_JOBS).set(pending_jobs as f64);
    gauge!(names::QUEUE_PENDING_WORK).set(pending_work as f64);
}

pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

pub fn record_job_rejected(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_REJECTED_TOTAL, &labels).increment(1);
}

pub fn record_job_disconnected() {
    counter!(names::JOBS_DISCONNECTED_TOTAL).increment(1);
}

/// Record a paid backend call (`kind` is `video`, `image` or `fold`).
pub fn record_backend_call(kind: &str, success: bool) {
    let labels = [("kind", kind.to_string())];
    counter!(names::BACKEND_CALLS_TOTAL, &labels).increment(1);
    if !success {
        counter!(names::BACKEND_FAILURES_TOTAL, &labels).increment(1);
    }
}

pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }
}

pub fn record_render(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
}
