use crate::error::Busy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const MAX_CONCURRENT_CEILING: usize = 256;

const DEFAULT_RETRY_AFTER_MS: u64 = 250;
const MIN_RETRY_AFTER_MS: u64 = 50;
const MAX_RETRY_AFTER_MS: u64 = 10_000;

/// How the `retryAfterMs` hint is derived for rejected calls.
///
/// With completed executions on record the hint is their average duration; otherwise the
/// default. Either way it is clamped to `[min_ms, max_ms]` and is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryHintPolicy {
    pub default_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for RetryHintPolicy {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_RETRY_AFTER_MS,
            min_ms: MIN_RETRY_AFTER_MS,
            max_ms: MAX_RETRY_AFTER_MS,
        }
    }
}

impl RetryHintPolicy {
    fn hint_ms(&self, avg_duration_ms: Option<u64>) -> u64 {
        let min = self.min_ms.max(1);
        let max = self.max_ms.max(min);
        avg_duration_ms
            .unwrap_or(self.default_ms)
            .clamp(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionSnapshot {
    pub max_concurrent: usize,
    pub active: usize,
    pub admitted_total: u64,
    pub rejected_total: u64,
    pub completed_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<u64>,
    pub retry_after_ms: u64,
}

#[derive(Debug, Default)]
struct AdmissionStats {
    active: AtomicUsize,
    admitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    total_duration_ms: AtomicU64,
}

impl AdmissionStats {
    fn avg_duration_ms(&self) -> Option<u64> {
        let completed = self.completed.load(Ordering::Relaxed);
        if completed == 0 {
            return None;
        }
        Some(self.total_duration_ms.load(Ordering::Relaxed) / completed)
    }
}

/// Process-wide ceiling on simultaneously running executions.
///
/// Acquisition never waits: either a permit is free right now or the caller gets [`Busy`].
#[derive(Debug, Clone)]
pub struct AdmissionController {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<AdmissionStats>,
    retry: RetryHintPolicy,
}

impl AdmissionController {
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_retry_policy(max_concurrent, RetryHintPolicy::default())
    }

    #[must_use]
    pub fn with_retry_policy(max_concurrent: usize, retry: RetryHintPolicy) -> Self {
        let max_concurrent = max_concurrent.clamp(1, MAX_CONCURRENT_CEILING);
        Self {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            stats: Arc::new(AdmissionStats::default()),
            retry,
        }
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn try_acquire(&self) -> Result<AdmissionTicket, Busy> {
        // The semaphore is never closed, so any failure means "no permits right now".
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            let retry_after_ms = self.retry_after_ms();
            log::debug!(
                "admission rejected (max_concurrent={}, retry_after_ms={retry_after_ms})",
                self.max_concurrent
            );
            return Err(Busy { retry_after_ms });
        };

        self.stats.active.fetch_add(1, Ordering::Relaxed);
        let sequence = self.stats.admitted.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(AdmissionTicket {
            sequence,
            started: Instant::now(),
            stats: Arc::clone(&self.stats),
            _permit: permit,
        })
    }

    #[must_use]
    pub fn retry_after_ms(&self) -> u64 {
        self.retry.hint_ms(self.stats.avg_duration_ms())
    }

    #[must_use]
    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            max_concurrent: self.max_concurrent,
            active: self.stats.active.load(Ordering::Relaxed),
            admitted_total: self.stats.admitted.load(Ordering::Relaxed),
            rejected_total: self.stats.rejected.load(Ordering::Relaxed),
            completed_total: self.stats.completed.load(Ordering::Relaxed),
            avg_duration_ms: self.stats.avg_duration_ms(),
            retry_after_ms: self.retry_after_ms(),
        }
    }
}

/// A held admission slot. Dropping it releases the slot and records the execution duration.
#[derive(Debug)]
pub struct AdmissionTicket {
    sequence: u64,
    started: Instant,
    stats: Arc<AdmissionStats>,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionTicket {
    /// Monotonic admission number, useful for correlating log lines.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.stats
            .total_duration_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        self.stats.active.fetch_sub(1, Ordering::Relaxed);
    }
}
