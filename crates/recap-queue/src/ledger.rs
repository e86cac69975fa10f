//! In-process usage ledger.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, warn};

use recap_models::JobId;

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Fallback interval for re-checking the queue head
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl LedgerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("QUEUE_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    busy: bool,
    pending: VecDeque<(JobId, u64)>,
    pending_work: u64,
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub busy: bool,
    pub pending_jobs: usize,
    pub pending_work: u64,
}

/// Queue of jobs waiting to run, with aggregate work accounting.
///
/// Invariant: `pending_work` equals the sum of the work sizes of the entries
/// in `pending`. Each mutation happens under a single lock acquisition.
#[derive(Debug)]
pub struct UsageLedger {
    state: Mutex<LedgerState>,
    head_changed: Notify,
    config: LedgerConfig,
}

impl UsageLedger {
    /// Create a new, empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            head_changed: Notify::new(),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(LedgerConfig::from_env())
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        // The state is plain data; a panic mid-mutation cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a job to the tail of the queue.
    pub fn enqueue(&self, job_id: JobId, work_size: u64) {
        let became_head = {
            let mut state = self.state();
            state.pending.push_back((job_id.clone(), work_size));
            state.pending_work += work_size;
            state.pending.len() == 1
        };
        debug!(job_id = %job_id, work_size, "Enqueued job");
        if became_head {
            self.head_changed.notify_waiters();
        }
    }

    /// Pop the head of the queue.
    pub fn dequeue(&self) -> Option<JobId> {
        let head = {
            let mut state = self.state();
            let (job_id, work_size) = state.pending.pop_front()?;
            state.pending_work = state.pending_work.saturating_sub(work_size);
            job_id
        };
        self.head_changed.notify_waiters();
        Some(head)
    }

    /// Current head of the queue, without removing it.
    pub fn peek_head(&self) -> Option<JobId> {
        self.state().pending.front().map(|(id, _)| id.clone())
    }

    /// Remove the first occurrence of a job.
    ///
    /// Absent ids leave the ledger untouched. Returns whether an entry was
    /// removed.
    pub fn remove(&self, job_id: &JobId, work_size: u64) -> bool {
        let (removed, head_changed) = {
            let mut state = self.state();
            match state.pending.iter().position(|(id, _)| id == job_id) {
                Some(index) => {
                    state.pending.remove(index);
                    state.pending_work = state.pending_work.saturating_sub(work_size);
                    (true, index == 0)
                }
                None => (false, false),
            }
        };
        if removed {
            debug!(job_id = %job_id, work_size, "Removed job from ledger");
        }
        if head_changed {
            self.head_changed.notify_waiters();
        }
        removed
    }

    /// Aggregate work of all queued jobs.
    pub fn pending_work(&self) -> u64 {
        self.state().pending_work
    }

    /// Number of queued jobs (including the executing one).
    pub fn pending_jobs(&self) -> usize {
        self.state().pending.len()
    }

    /// Number of jobs ahead of the given one, if it is queued.
    pub fn position(&self, job_id: &JobId) -> Option<usize> {
        self.state().pending.iter().position(|(id, _)| id == job_id)
    }

    pub fn set_busy(&self) {
        self.state().busy = true;
    }

    pub fn clear_busy(&self) {
        self.state().busy = false;
    }

    /// Advisory flag: a pipeline is executing. Not used to gate admission.
    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state();
        LedgerSnapshot {
            busy: state.busy,
            pending_jobs: state.pending.len(),
            pending_work: state.pending_work,
        }
    }

    /// Wait until the job reaches the head of the queue.
    ///
    /// Wakes on every head change and re-checks at `poll_interval` as a
    /// fallback. Returns `false` if the job is no longer queued.
    pub async fn wait_for_turn(&self, job_id: &JobId) -> bool {
        loop {
            let notified = self.head_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.position(job_id) {
                Some(0) => return true,
                Some(_) => {}
                None => {
                    warn!(job_id = %job_id, "Job left the ledger while waiting for admission");
                    return false;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Enqueue a job and hand back a slot that releases it on drop.
    pub fn reserve(self: &Arc<Self>, job_id: JobId, work_size: u64) -> QueueSlot {
        self.enqueue(job_id.clone(), work_size);
        QueueSlot {
            ledger: Arc::clone(self),
            job_id,
            work_size,
            admitted: false,
        }
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

/// A job's place in the ledger.
///
/// Dropping the slot removes the entry (and clears the busy flag if the job
/// was admitted), whatever the exit path: completion, error, panic or the
/// owning future being dropped.
#[derive(Debug)]
pub struct QueueSlot {
    ledger: Arc<UsageLedger>,
    job_id: JobId,
    work_size: u64,
    admitted: bool,
}

impl QueueSlot {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn work_size(&self) -> u64 {
        self.work_size
    }

    /// Jobs currently ahead of this one.
    pub fn ahead(&self) -> usize {
        self.ledger.position(&self.job_id).unwrap_or(0)
    }

    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    /// Wait for the head of the queue and mark the ledger busy.
    pub async fn wait_for_turn(&mut self) -> bool {
        if !self.ledger.wait_for_turn(&self.job_id).await {
            return false;
        }
        self.ledger.set_busy();
        self.admitted = true;
        true
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.ledger.remove(&self.job_id, self.work_size);
        if self.admitted {
            self.ledger.clear_busy();
        }
    }
}
