use crate::error::{Result, SearchError};
use crate::oracle::{DepthBudget, RankingOracle, RankingQuery};
use crate::query_classifier::{QueryClassifier, QueryType};
use crate::scanner::WorkspaceScanner;
use async_trait::async_trait;
use relay_protocol::ResultCandidate;
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

const SUMMARY_MAX_CHARS: usize = 160;

/// Default oracle: term overlap between the intent and each file's path and content.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOracle;

impl LexicalOracle {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RankingOracle for LexicalOracle {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn rank(&self, query: RankingQuery) -> Result<Vec<ResultCandidate>> {
        if !query.workspace.is_dir() {
            return Err(SearchError::InvalidWorkspace(format!(
                "{} is not a directory",
                query.workspace.display()
            )));
        }
        tokio::task::spawn_blocking(move || rank_blocking(&query))
            .await
            .map_err(|err| SearchError::TaskFailed(err.to_string()))
    }
}

fn rank_blocking(query: &RankingQuery) -> Vec<ResultCandidate> {
    let terms = QueryClassifier::terms(&query.intent);
    if terms.is_empty() {
        return Vec::new();
    }
    // Path-shaped intents are mostly answered by the path itself.
    let path_weight = match QueryClassifier::classify(&query.intent) {
        QueryType::Path => 0.6,
        QueryType::Identifier | QueryType::Conceptual => 0.3,
    };

    let budget = DepthBudget::for_depth(query.params.depth);
    let scanner = WorkspaceScanner::new(&query.workspace, budget.max_files);
    let produced_at = unix_now_ms();

    let mut candidates: Vec<ResultCandidate> = Vec::new();
    for path in scanner.scan().files {
        let rel = scanner.relative(&path);
        if !query.scope.allows(&rel) {
            continue;
        }
        // Unreadable or non-UTF-8 files still score on their path.
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let Some((confidence, summary)) = score(&terms, &rel, &content, path_weight) else {
            continue;
        };
        if confidence < query.params.min_confidence {
            continue;
        }
        candidates.push(
            ResultCandidate::new(rel.clone(), "file", confidence)
                .with_summary(summary)
                .with_related_file(rel)
                .with_created_at(produced_at),
        );
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(budget.max_results);
    candidates
}

fn score(terms: &[String], rel_path: &str, content: &str, path_weight: f64) -> Option<(f64, String)> {
    let path_lower = rel_path.to_lowercase();
    let content_lower = content.to_lowercase();

    let mut in_path = 0usize;
    let mut anywhere = 0usize;
    for term in terms {
        let path_hit = path_lower.contains(term.as_str());
        let content_hit = content_lower.contains(term.as_str());
        if path_hit {
            in_path += 1;
        }
        if path_hit || content_hit {
            anywhere += 1;
        }
    }
    if anywhere == 0 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let total = terms.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let confidence =
        (1.0 - path_weight) * (anywhere as f64 / total) + path_weight * (in_path as f64 / total);

    let summary = first_matching_line(terms, content)
        .unwrap_or_else(|| format!("Path matches {in_path} of {} term(s)", terms.len()));
    Some((confidence.clamp(0.0, 1.0), summary))
}

fn first_matching_line(terms: &[String], content: &str) -> Option<String> {
    content.lines().enumerate().find_map(|(idx, line)| {
        let lowered = line.to_lowercase();
        terms
            .iter()
            .any(|term| lowered.contains(term.as_str()))
            .then(|| format!("L{}: {}", idx + 1, truncate(line.trim(), SUMMARY_MAX_CHARS)))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
