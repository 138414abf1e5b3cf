//! # Relay Search
//!
//! Result post-processing for the Context Relay: confidence tiering with human-review
//! escalation, freshness evaluation, and the ranking-oracle seam with its default
//! [`LexicalOracle`].

mod confidence;
mod error;
mod freshness;
mod lexical;
mod oracle;
mod query_classifier;
mod scanner;

pub use confidence::{review_recommendation, ConfidenceThresholds};
pub use error::{Result, SearchError};
pub use freshness::{FileStat, FreshnessConfig, FreshnessEvaluator, FreshnessOutcome, TokioFileStat};
pub use lexical::LexicalOracle;
pub use oracle::{DepthBudget, RankingOracle, RankingQuery};
pub use query_classifier::{QueryClassifier, QueryType};
pub use scanner::{ScanOutcome, WorkspaceScanner};
