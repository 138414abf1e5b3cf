use relay_protocol::{ProgressEvent, ProgressStage};
use std::time::Instant;

/// Ordered log of the stages one call went through, timed from admission.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    started: Instant,
    events: Vec<ProgressEvent>,
}

impl ProgressLog {
    #[must_use]
    pub fn starting_at(started: Instant) -> Self {
        Self {
            started,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: ProgressStage) {
        self.push(stage, None);
    }

    pub fn record_with(&mut self, stage: ProgressStage, detail: impl Into<String>) {
        self.push(stage, Some(detail.into()));
    }

    #[must_use]
    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }

    fn push(&mut self, stage: ProgressStage, detail: Option<String>) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.events.push(ProgressEvent {
            stage,
            elapsed_ms,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_keep_insertion_order_and_monotonic_time() {
        let mut log = ProgressLog::starting_at(Instant::now());
        log.record(ProgressStage::Admitted);
        log.record_with(ProgressStage::QueryTimedOut, "budget 10ms");

        let events = log.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].stage, ProgressStage::QueryTimedOut);
        assert!(events[0].elapsed_ms <= events[1].elapsed_ms);
        assert_eq!(events[1].detail.as_deref(), Some("budget 10ms"));
    }
}
