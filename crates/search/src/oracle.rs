use crate::error::Result;
use async_trait::async_trait;
use relay_protocol::path_filters::ScopeFilter;
use relay_protocol::{RetrievalDepth, RetrievalParams, ResultCandidate};
use std::path::PathBuf;

/// Everything a ranking oracle is told about one retrieval call.
#[derive(Debug, Clone)]
pub struct RankingQuery {
    pub intent: String,
    /// Canonical workspace root.
    pub workspace: PathBuf,
    pub params: RetrievalParams,
    pub scope: ScopeFilter,
}

/// Scores candidates for an intent. Implementations must return candidates ordered by
/// descending confidence; scores outside `[0, 1]` are clamped by the caller.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    fn name(&self) -> &'static str;

    async fn rank(&self, query: RankingQuery) -> Result<Vec<ResultCandidate>>;
}

/// How much work each depth buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthBudget {
    pub max_files: usize,
    pub max_results: usize,
}

impl DepthBudget {
    #[must_use]
    pub const fn for_depth(depth: RetrievalDepth) -> Self {
        match depth {
            RetrievalDepth::Shallow => Self {
                max_files: 250,
                max_results: 10,
            },
            RetrievalDepth::Standard => Self {
                max_files: 1_000,
                max_results: 25,
            },
            RetrievalDepth::Deep => Self {
                max_files: 5_000,
                max_results: 50,
            },
        }
    }
}
