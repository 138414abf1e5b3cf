use crate::fingerprint::QueryKey;
use crate::history::{QueryRecord, SessionHistory};
use relay_protocol::{LoopDetection, LoopPattern, RetrievalParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopDetectorConfig {
    pub window_seconds: u64,
    /// Occurrences of one fingerprint, current query included, that count as a repeat.
    pub exact_repeat_threshold: usize,
    /// Occurrences of one semantic bucket, current query included.
    pub semantic_repeat_threshold: usize,
    /// Matching prior queries that must all have come back empty-handed.
    pub futile_repeat_threshold: usize,
    pub auto_escalate_strategy: bool,
    /// Best-candidate confidence at or below which a prior query counts as empty-handed.
    pub near_zero_confidence: f64,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            exact_repeat_threshold: 2,
            semantic_repeat_threshold: 3,
            futile_repeat_threshold: 2,
            auto_escalate_strategy: true,
            near_zero_confidence: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopDetector {
    config: LoopDetectorConfig,
}

impl LoopDetector {
    #[must_use]
    pub fn new(config: LoopDetectorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LoopDetectorConfig {
        &self.config
    }

    /// Classify `key` against the session's recent history, before the query is recorded.
    ///
    /// Only the most severe pattern is reported. With auto-escalation enabled the detection
    /// carries the widened parameters derived from `base`.
    #[must_use]
    pub fn evaluate(
        &self,
        history: &SessionHistory,
        key: QueryKey,
        now_ms: u64,
        base: RetrievalParams,
    ) -> Option<LoopDetection> {
        let window_ms = self.config.window_seconds.saturating_mul(1_000);
        let mut identical: Vec<&QueryRecord> = Vec::new();
        let mut same_bucket = 0usize;
        for record in history.within_window(now_ms, window_ms) {
            if record.fingerprint == key.fingerprint {
                identical.push(record);
            }
            if record.bucket == key.bucket {
                same_bucket += 1;
            }
        }

        let identical_occurrences = identical.len() + 1;
        let semantic_occurrences = same_bucket + 1;

        let is_identical =
            !identical.is_empty() && identical_occurrences >= self.config.exact_repeat_threshold;
        let is_semantic =
            same_bucket > 0 && semantic_occurrences >= self.config.semantic_repeat_threshold;
        let is_futile = is_identical
            && identical.len() >= self.config.futile_repeat_threshold
            && identical.iter().all(|record| self.came_back_empty(record));

        let (pattern, occurrences) = if is_futile {
            (LoopPattern::FutileRepeat, identical_occurrences)
        } else if is_semantic {
            (LoopPattern::SemanticRepeat, semantic_occurrences)
        } else if is_identical {
            (LoopPattern::IdenticalQuery, identical_occurrences)
        } else {
            return None;
        };

        let escalated_to = self
            .config
            .auto_escalate_strategy
            .then(|| base.escalated());

        log::debug!(
            "loop detected: pattern={} occurrences={occurrences} escalate={}",
            pattern.as_str(),
            escalated_to.is_some()
        );

        Some(LoopDetection {
            detected: true,
            pattern,
            occurrences,
            window_seconds: self.config.window_seconds,
            message: self.message(pattern, occurrences, escalated_to.as_ref()),
            alternative_strategies: alternative_strategies(pattern),
            human_review_suggested: pattern == LoopPattern::FutileRepeat,
            escalated_to,
        })
    }

    fn came_back_empty(&self, record: &QueryRecord) -> bool {
        !record.is_in_flight()
            && (record.result_count == 0
                || record.aggregate_confidence <= self.config.near_zero_confidence)
    }

    fn message(
        &self,
        pattern: LoopPattern,
        occurrences: usize,
        escalated_to: Option<&RetrievalParams>,
    ) -> String {
        let window = self.config.window_seconds;
        let mut message = match pattern {
            LoopPattern::IdenticalQuery => format!(
                "The same query was issued {occurrences} times in the last {window}s."
            ),
            LoopPattern::SemanticRepeat => format!(
                "{occurrences} rephrasings of the same query were issued in the last {window}s."
            ),
            LoopPattern::FutileRepeat => format!(
                "The same query was issued {occurrences} times in the last {window}s and every \
                 earlier attempt came back without usable results."
            ),
        };
        if let Some(params) = escalated_to {
            message.push_str(&format!(
                " Retrying with depth={} and minConfidence={:.2}.",
                params.depth.as_str(),
                params.min_confidence
            ));
        }
        message
    }
}

fn alternative_strategies(pattern: LoopPattern) -> Vec<String> {
    let strategies: &[&str] = match pattern {
        LoopPattern::IdenticalQuery => &[
            "Rephrase the intent with concrete identifiers, file names or error text.",
            "Narrow the scope with includePaths or filePattern.",
            "Page through the earlier results with pageIdx instead of re-running the query.",
        ],
        LoopPattern::SemanticRepeat => &[
            "Name a symbol or file instead of describing the behaviour again.",
            "Look at a neighbouring topic (callers, tests, configuration).",
            "Request depth=deep once rather than repeating shallow variants.",
        ],
        LoopPattern::FutileRepeat => &[
            "Run bootstrap to refresh the workspace registration.",
            "Drop includePaths/filePattern filters to broaden the search.",
            "Ask a human where the relevant code lives.",
        ],
    };
    strategies.iter().map(|s| (*s).to_string()).collect()
}
