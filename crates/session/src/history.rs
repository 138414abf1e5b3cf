use crate::fingerprint::QueryKey;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One completed query as remembered by its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub fingerprint: u64,
    pub bucket: u64,
    pub normalized_intent: String,
    pub recorded_at_ms: u64,
    pub result_count: usize,
    /// Best candidate confidence the query produced; `0.0` when it returned nothing.
    pub aggregate_confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub touched_files: Vec<String>,
    /// Set while the query is still running; its outcome fields are not meaningful yet.
    #[serde(skip)]
    pub(crate) in_flight: Option<u64>,
}

impl QueryRecord {
    #[must_use]
    pub fn new(key: QueryKey, normalized_intent: impl Into<String>, recorded_at_ms: u64) -> Self {
        Self {
            fingerprint: key.fingerprint,
            bucket: key.bucket,
            normalized_intent: normalized_intent.into(),
            recorded_at_ms,
            result_count: 0,
            aggregate_confidence: 0.0,
            touched_files: Vec::new(),
            in_flight: None,
        }
    }

    pub(crate) fn in_flight(mut self, token: u64) -> Self {
        self.in_flight = Some(token);
        self
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn with_outcome(mut self, result_count: usize, aggregate_confidence: f64) -> Self {
        self.result_count = result_count;
        self.aggregate_confidence = if aggregate_confidence.is_finite() {
            aggregate_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    #[must_use]
    pub fn with_touched_files(mut self, files: Vec<String>) -> Self {
        self.touched_files = files;
        self
    }

    #[must_use]
    pub fn key(&self) -> QueryKey {
        QueryKey {
            fingerprint: self.fingerprint,
            bucket: self.bucket,
        }
    }
}

/// Bounded, oldest-first log of one session's queries.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    capacity: usize,
    records: VecDeque<QueryRecord>,
}

impl SessionHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    pub fn push(&mut self, record: QueryRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        let cleared = self.records.len();
        self.records.clear();
        cleared
    }

    /// Replace the in-flight record carrying `token` with its outcome, or drop it when there is
    /// none. Returns `false` when the record is gone (reset or evicted meanwhile).
    pub(crate) fn settle(&mut self, token: u64, outcome: Option<QueryRecord>) -> bool {
        let Some(idx) = self
            .records
            .iter()
            .position(|record| record.in_flight == Some(token))
        else {
            return false;
        };
        match outcome {
            Some(mut record) => {
                record.in_flight = None;
                self.records[idx] = record;
            }
            None => {
                self.records.remove(idx);
            }
        }
        true
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &QueryRecord> {
        self.records.iter()
    }

    /// Records no older than `window_ms` relative to `now_ms`.
    pub fn within_window(&self, now_ms: u64, window_ms: u64) -> impl Iterator<Item = &QueryRecord> {
        let cutoff = now_ms.saturating_sub(window_ms);
        self.records
            .iter()
            .filter(move |record| record.recorded_at_ms >= cutoff)
    }
}
