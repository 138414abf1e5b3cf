use crate::fingerprint::QueryKey;
use crate::history::{QueryRecord, SessionHistory};
use crate::loop_detector::LoopDetector;
use relay_protocol::{LoopDetection, RetrievalParams};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a session's history says about an incoming query.
#[derive(Debug, Clone, Default)]
pub struct SessionInsight {
    pub loop_detection: Option<LoopDetection>,
    pub episodic_hint: Option<String>,
}

/// Key-addressed owner of every session's history.
///
/// Each operation takes the lock for a short synchronous section; nothing here awaits.
#[derive(Debug)]
pub struct SessionRegistry {
    capacity: usize,
    detector: LoopDetector,
    next_token: AtomicU64,
    sessions: Mutex<HashMap<String, SessionHistory>>,
}

/// A query that has been checked against its session and is still running.
///
/// Its provisional record is visible to concurrent calls in the same session, so they see the
/// repeat. [`PendingQuery::complete`] stores the outcome; dropping the guard unsettled (failure
/// or cancellation) withdraws the record.
#[derive(Debug)]
#[must_use = "dropping a pending query withdraws it from the session history"]
pub struct PendingQuery<'a> {
    registry: &'a SessionRegistry,
    session_id: String,
    token: u64,
    settled: bool,
}

impl PendingQuery<'_> {
    pub fn complete(mut self, record: QueryRecord) {
        self.settled = true;
        self.registry.settle(&self.session_id, self.token, Some(record));
    }
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.settle(&self.session_id, self.token, None);
        }
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new(max_session_history: usize, detector: LoopDetector) -> Self {
        Self {
            capacity: max_session_history.max(1),
            detector,
            next_token: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Classify a query against its session and register it as in flight, in one critical
    /// section. The session is created on first use.
    pub fn begin(
        &self,
        session_id: &str,
        key: QueryKey,
        normalized_intent: &str,
        now_ms: u64,
        base: RetrievalParams,
    ) -> (SessionInsight, PendingQuery<'_>) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let insight = {
            let mut sessions = self.lock();
            let history = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| SessionHistory::new(self.capacity));
            let insight = SessionInsight {
                loop_detection: self.detector.evaluate(history, key, now_ms, base),
                episodic_hint: episodic_hint(history, key),
            };
            history.push(QueryRecord::new(key, normalized_intent, now_ms).in_flight(token));
            insight
        };
        let pending = PendingQuery {
            registry: self,
            session_id: session_id.to_string(),
            token,
            settled: false,
        };
        (insight, pending)
    }

    /// Forget a session. Returns how many queries were cleared; unknown sessions clear zero.
    pub fn reset(&self, session_id: &str) -> usize {
        let mut sessions = self.lock();
        sessions
            .remove(session_id)
            .map_or(0, |mut history| history.clear())
    }

    #[must_use]
    pub fn history_len(&self, session_id: &str) -> usize {
        self.lock().get(session_id).map_or(0, SessionHistory::len)
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.lock().len()
    }

    fn settle(&self, session_id: &str, token: u64, outcome: Option<QueryRecord>) {
        let mut sessions = self.lock();
        let settled = sessions
            .get_mut(session_id)
            .is_some_and(|history| history.settle(token, outcome));
        if !settled {
            log::debug!("session {session_id}: query {token} was cleared before it settled");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionHistory>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn episodic_hint(history: &SessionHistory, key: QueryKey) -> Option<String> {
    let earlier = history
        .iter()
        .rev()
        .find(|record| record.bucket == key.bucket && record.result_count > 0)?;
    Some(format!(
        "Earlier in this session \"{}\" returned {} result(s); start from those before widening \
         the search.",
        earlier.normalized_intent, earlier.result_count
    ))
}
