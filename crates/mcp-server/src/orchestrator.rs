//! One retrieval call, end to end.
//!
//! ```text
//! validate ─> admit ─> resolve workspace ─> loop check (may escalate) ─> oracle under timeout
//!          ─> normalize + scrub ─> freshness + tiers ─> page or output file, plus stream chunks
//!          ─> record into session history ─> release ticket
//! ```
//!
//! Validation runs before admission so malformed calls never consume a slot.

use crate::config::{ConfigError, RelayConfig};
use crate::envelope::{
    near_misses, paginate, resolve_output_path, stream_chunks, NearMiss, OutputFileBody,
    OutputFileSummary, OutputSink, Pagination, ScoredResult, StreamManifest, TokioOutputSink,
};
use crate::error::{oracle_failure, ToolFailure};
use crate::streams::{StreamCache, StreamError};
use crate::tools::schemas::{
    BootstrapRequest, FetchStreamChunkRequest, QueryContextRequest, ResetSessionStateRequest,
    ServerStatusRequest, DEFAULT_SESSION_ID,
};
use crate::util::now_ms;
use crate::workspace::{WorkspaceError, WorkspaceRecord, WorkspaceRegistry};
use relay_control::{
    run_with_timeout, AdmissionController, AdmissionSnapshot, Deduplicated, InFlightDeduplicator,
    ProgressLog, TimedOutcome,
};
use relay_protocol::disclosure::DebugChannel;
use relay_protocol::path_filters::ScopeFilter;
use relay_protocol::{
    AggregateConfidence, ErrorCode, HumanReviewRecommendation, IntentType, LoopDetection,
    ProgressEvent, ProgressStage, ResultCandidate, RetrievalParams, PROTOCOL_SCHEMA_VERSION,
};
use relay_search::{
    review_recommendation, ConfidenceThresholds, FileStat, FreshnessEvaluator, LexicalOracle,
    QueryClassifier, RankingOracle, RankingQuery,
};
use relay_session::{
    clear_episodes_best_effort, persist_episode_best_effort, FileSessionStore, LoopDetector,
    MemorySessionStore, QueryKey, QueryRecord, SessionRegistry, SessionStore,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const BOOTSTRAP_OPERATION: &str = "bootstrap";

type BootstrapKey = (PathBuf, &'static str);
type BootstrapOutcome = Result<WorkspaceRecord, WorkspaceError>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutInfo {
    pub code: ErrorCode,
    pub elapsed_ms: u64,
    pub budget_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSummary {
    pub requested: RetrievalParams,
    pub dispatched: RetrievalParams,
    pub escalated: bool,
    pub oracle: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContextResponse {
    pub workspace: String,
    pub session_id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ScoredResult>>,
    pub pagination: Pagination,
    pub aggregate_confidence: AggregateConfidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_review_recommendation: Option<HumanReviewRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_detection: Option<LoopDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodic_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_misses: Option<Vec<NearMiss>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<OutputFileSummary>,
    pub timed_out: bool,
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutInfo>,
    pub retrieval: RetrievalSummary,
    pub progress: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugChannel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub workspace: String,
    pub run_id: String,
    pub file_count: usize,
    pub truncated: bool,
    /// This call joined a bootstrap another caller had already started.
    pub deduplicated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStreamChunkResponse {
    pub stream_id: String,
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub items: Vec<ScoredResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSessionStateResponse {
    pub session_id: String,
    pub cleared_queries: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCacheStatus {
    pub entries: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub protocol_version: u32,
    pub oracle: String,
    pub admission: AdmissionSnapshot,
    pub pending_executions: usize,
    pub active_sessions: usize,
    pub registered_workspaces: usize,
    pub stream_cache: StreamCacheStatus,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_history_len: Option<usize>,
}

/// A query that passed validation; nothing has been admitted yet.
struct PlannedQuery {
    intent: String,
    root: PathBuf,
    workspace: String,
    session_id: String,
    intent_type: Option<IntentType>,
    params: RetrievalParams,
    scope: ScopeFilter,
    page_size: usize,
    page_idx: usize,
    output_path: Option<PathBuf>,
    stream_chunk_size: Option<usize>,
    explain_misses: bool,
}

/// Result of the oracle phase, timed out or not.
struct OracleOutcome {
    candidates: Vec<ResultCandidate>,
    timeout: Option<TimeoutInfo>,
}

pub struct Orchestrator {
    config: RelayConfig,
    admission: AdmissionController,
    bootstraps: InFlightDeduplicator<BootstrapKey, BootstrapOutcome>,
    sessions: SessionRegistry,
    workspaces: Arc<WorkspaceRegistry>,
    streams: StreamCache,
    thresholds: ConfidenceThresholds,
    freshness: FreshnessEvaluator,
    oracle: Arc<dyn RankingOracle>,
    sink: Arc<dyn OutputSink>,
    store: Arc<dyn SessionStore>,
}

impl Orchestrator {
    /// Build with the default collaborators: lexical oracle, tokio filesystem, and a file-backed
    /// episode store when `session.session_dir` is set (in-memory otherwise).
    pub fn from_config(config: RelayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = config.confidence_thresholds()?;
        let store: Arc<dyn SessionStore> = match config.session.session_dir.as_ref() {
            Some(dir) => Arc::new(FileSessionStore::new(dir.clone())),
            None => Arc::new(MemorySessionStore::new()),
        };

        Ok(Self {
            admission: AdmissionController::with_retry_policy(
                config.admission.max_concurrent,
                config.retry_policy(),
            ),
            bootstraps: InFlightDeduplicator::new(),
            sessions: SessionRegistry::new(
                config.session.max_session_history,
                LoopDetector::new(config.loop_detector_config()),
            ),
            workspaces: Arc::new(WorkspaceRegistry::new(config.workspace.bootstrap_max_files)),
            streams: StreamCache::new(config.stream_cache.capacity),
            thresholds,
            freshness: FreshnessEvaluator::with_tokio_fs(config.freshness_config()),
            oracle: Arc::new(LexicalOracle::new()),
            sink: Arc::new(TokioOutputSink),
            store,
            config,
        })
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn RankingOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    #[must_use]
    pub fn with_file_stat(mut self, stat: Arc<dyn FileStat>) -> Self {
        self.freshness = FreshnessEvaluator::new(self.config.freshness_config(), stat);
        self
    }

    #[must_use]
    pub fn with_output_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub async fn query_context(
        &self,
        request: QueryContextRequest,
    ) -> Result<QueryContextResponse, ToolFailure> {
        let plan = self.plan_query(request).await?;

        let ticket = self.admission.try_acquire()?;
        let mut progress = ProgressLog::starting_at(ticket.started());
        progress.record_with(ProgressStage::Admitted, format!("ticket #{}", ticket.sequence()));

        self.run_query(plan, progress).await
    }

    pub async fn bootstrap(
        &self,
        request: BootstrapRequest,
    ) -> Result<BootstrapResponse, ToolFailure> {
        let root = canonical_workspace(&request.workspace).await?;
        let _ticket = self.admission.try_acquire()?;

        let Deduplicated { value, joined } = self.bootstrap_root(root).await?;
        Ok(BootstrapResponse {
            workspace: value.root.display().to_string(),
            run_id: value.run_id,
            file_count: value.file_count,
            truncated: value.truncated,
            deduplicated: joined,
        })
    }

    pub fn fetch_stream_chunk(
        &self,
        request: &FetchStreamChunkRequest,
    ) -> Result<FetchStreamChunkResponse, ToolFailure> {
        let stream_id = request.stream_id.trim();
        if stream_id.is_empty() {
            return Err(ToolFailure::validation("streamId must not be empty"));
        }
        let chunk = self
            .streams
            .chunk(stream_id, request.chunk_index)
            .map_err(|err| {
                let details = match &err {
                    StreamError::UnknownStream(id) => json!({ "streamId": id }),
                    StreamError::ChunkOutOfRange {
                        stream_id,
                        index,
                        chunk_count,
                    } => json!({
                        "streamId": stream_id,
                        "chunkIndex": index,
                        "chunkCount": chunk_count,
                    }),
                };
                ToolFailure::invalid_argument(err.to_string(), details)
            })?;
        Ok(FetchStreamChunkResponse {
            stream_id: stream_id.to_string(),
            chunk_index: chunk.index,
            chunk_count: chunk.chunk_count,
            items: chunk.items,
        })
    }

    pub async fn reset_session_state(
        &self,
        request: &ResetSessionStateRequest,
    ) -> Result<ResetSessionStateResponse, ToolFailure> {
        let session_id = request.session_id.trim();
        if session_id.is_empty() {
            return Err(ToolFailure::validation("sessionId must not be empty"));
        }
        let cleared_queries = self.sessions.reset(session_id);
        clear_episodes_best_effort(self.store.as_ref(), session_id).await;
        log::info!("session {session_id}: cleared {cleared_queries} quer(ies)");
        Ok(ResetSessionStateResponse {
            session_id: session_id.to_string(),
            cleared_queries,
        })
    }

    #[must_use]
    pub fn status(&self, request: &ServerStatusRequest) -> ServerStatus {
        let session_history_len = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| self.sessions.history_len(id));
        ServerStatus {
            protocol_version: PROTOCOL_SCHEMA_VERSION,
            oracle: self.oracle.name().to_string(),
            admission: self.admission.snapshot(),
            pending_executions: self.bootstraps.pending_count(),
            active_sessions: self.sessions.active_sessions(),
            registered_workspaces: self.workspaces.len(),
            stream_cache: StreamCacheStatus {
                entries: self.streams.len(),
                capacity: self.streams.capacity(),
            },
            timeout_ms: self.config.timeout.timeout_ms,
            session_history_len,
        }
    }

    async fn plan_query(&self, request: QueryContextRequest) -> Result<PlannedQuery, ToolFailure> {
        let intent = request.intent.trim().to_string();
        if intent.is_empty() {
            return Err(ToolFailure::validation("intent must not be empty"));
        }

        let envelope = &self.config.envelope;
        let page_size = bounded(
            "pageSize",
            request.page_size,
            envelope.default_page_size,
            envelope.max_page_size,
        )?;
        let stream = request.stream.unwrap_or(false);
        let stream_chunk_size = if stream {
            Some(bounded(
                "streamChunkSize",
                request.stream_chunk_size,
                envelope.default_stream_chunk_size,
                envelope.max_stream_chunk_size,
            )?)
        } else {
            None
        };
        let output_file = request
            .output_file
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty());
        if stream && output_file.is_some() {
            return Err(ToolFailure::validation(
                "stream and outputFile are mutually exclusive",
            ));
        }

        let defaults = self.config.retrieval_defaults();
        let min_confidence = match request.min_confidence {
            Some(value) if !(0.0..=1.0).contains(&value) => {
                return Err(ToolFailure::invalid_argument(
                    format!("minConfidence must lie in [0, 1], got {value}"),
                    json!({ "field": "minConfidence", "value": value, "min": 0.0, "max": 1.0 }),
                ));
            }
            Some(value) => value,
            None => defaults.min_confidence,
        };
        let params = RetrievalParams::new(request.depth.unwrap_or(defaults.depth), min_confidence);

        let scope = ScopeFilter::new(
            &request.include_paths,
            &request.exclude_paths,
            request.file_pattern.as_deref(),
        )
        .map_err(|err| ToolFailure::validation(format!("invalid filePattern: {err}")))?;

        let root = canonical_workspace(&request.workspace).await?;
        let output_path = output_file
            .map(|raw| resolve_output_path(&root, raw))
            .transpose()
            .map_err(ToolFailure::Validation)?;

        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
            .to_string();

        Ok(PlannedQuery {
            intent,
            workspace: root.display().to_string(),
            root,
            session_id,
            intent_type: request.intent_type,
            params,
            scope,
            page_size,
            page_idx: request.page_idx.unwrap_or(0),
            output_path,
            stream_chunk_size,
            explain_misses: request.explain_misses.unwrap_or(false),
        })
    }

    async fn run_query(
        &self,
        plan: PlannedQuery,
        mut progress: ProgressLog,
    ) -> Result<QueryContextResponse, ToolFailure> {
        let record = self.registered_workspace(&plan).await?;

        let now = now_ms();
        let (key, normalized) = QueryKey::from_intent(&plan.intent);
        let (insight, pending) = self
            .sessions
            .begin(&plan.session_id, key, &normalized, now, plan.params);
        match insight.loop_detection.as_ref() {
            Some(detection) => progress.record_with(
                ProgressStage::LoopChecked,
                format!("{} x{}", detection.pattern.as_str(), detection.occurrences),
            ),
            None => progress.record(ProgressStage::LoopChecked),
        }

        let dispatched = insight
            .loop_detection
            .as_ref()
            .and_then(|detection| detection.escalated_to)
            .unwrap_or(plan.params);
        let escalated = dispatched != plan.params;
        if escalated {
            progress.record_with(
                ProgressStage::StrategyEscalated,
                format!(
                    "depth={} minConfidence={:.2}",
                    dispatched.depth.as_str(),
                    dispatched.min_confidence
                ),
            );
        }

        let oracle_outcome = self.dispatch(&plan, dispatched, &mut progress).await?;
        let timed_out = oracle_outcome.timeout.is_some();

        let mut debug = DebugChannel::new();
        let candidates = normalize_candidates(oracle_outcome.candidates, dispatched, &mut debug);

        let freshness = self.freshness.evaluate(&plan.root, &candidates, now).await;
        let stale_warning = freshness
            .stale_warning
            .as_deref()
            .map(|warning| debug.scrub("staleWarning", warning));
        let scored: Vec<ScoredResult> = candidates
            .into_iter()
            .zip(freshness.reports)
            .map(|(candidate, freshness)| ScoredResult {
                tier: self.thresholds.tier_for(candidate.confidence),
                candidate,
                freshness,
            })
            .collect();

        let streaming = plan.stream_chunk_size.filter(|_| !timed_out);
        let (window, pagination) = paginate(scored.len(), plan.page_size, plan.page_idx);
        let visible = &scored[window.clone()];

        let visible_candidates: Vec<ResultCandidate> =
            visible.iter().map(|item| item.candidate.clone()).collect();
        let mut aggregate_confidence = self.thresholds.aggregate(&visible_candidates);
        aggregate_confidence.statement =
            debug.scrub("aggregateConfidence.statement", &aggregate_confidence.statement);
        let write_risk = QueryClassifier::is_write_risk(&plan.intent, plan.intent_type);
        let human_review_recommendation = review_recommendation(&aggregate_confidence, write_risk);

        let near_misses = plan
            .explain_misses
            .then(|| near_misses(&scored, &window, self.config.envelope.near_miss_limit))
            .filter(|misses| !misses.is_empty());

        if !timed_out {
            progress.record(ProgressStage::PostProcessed);
        }

        let stream = streaming.map(|chunk_size| StreamManifest {
            chunks: stream_chunks(&scored, chunk_size),
            stream_id: self.streams.insert(scored.clone(), chunk_size),
            chunk_size,
            total_items: scored.len(),
        });

        let mut results = None;
        let mut output_file = None;
        match plan.output_path.as_ref().filter(|_| !timed_out) {
            Some(path) => {
                let body = OutputFileBody {
                    items: visible,
                    pagination: &pagination,
                };
                let bytes = serde_json::to_vec_pretty(&body)
                    .map_err(|err| ToolFailure::Internal(format!("serialize page: {err}")))?;
                self.sink.write_atomic(path, bytes).await.map_err(|err| {
                    ToolFailure::Internal(format!("write {}: {err}", path.display()))
                })?;
                progress.record_with(ProgressStage::OutputWritten, path.display().to_string());
                output_file = Some(OutputFileSummary {
                    file_path: path.display().to_string(),
                    total_items: pagination.total_items,
                    page_count: pagination.page_count,
                    summary: pagination.summary.clone(),
                });
            }
            None => results = Some(visible.to_vec()),
        }

        let best_confidence = scored
            .iter()
            .map(|item| item.candidate.confidence)
            .fold(0.0_f64, f64::max);
        let touched_files: Vec<String> = visible
            .iter()
            .flat_map(|item| item.candidate.related_files.iter().cloned())
            .collect();
        let query_record = QueryRecord::new(key, normalized, now)
            .with_outcome(scored.len(), best_confidence)
            .with_touched_files(touched_files);
        pending.complete(query_record.clone());
        persist_episode_best_effort(
            self.store.as_ref(),
            &plan.session_id,
            &query_record,
            self.config.session.episode_log_cap,
        )
        .await;

        let episodic_hint = insight
            .episodic_hint
            .as_deref()
            .map(|hint| debug.scrub("episodicHint", hint));
        if !debug.is_empty() {
            log::debug!("stripped {} diagnostic marker(s): {:?}", debug.disclosures.len(), debug);
        }

        Ok(QueryContextResponse {
            workspace: plan.workspace,
            session_id: plan.session_id,
            run_id: record.run_id,
            results,
            pagination,
            aggregate_confidence,
            human_review_recommendation,
            loop_detection: insight.loop_detection,
            episodic_hint,
            stale_warning,
            near_misses,
            stream,
            output_file,
            timed_out,
            partial: timed_out,
            timeout: oracle_outcome.timeout,
            retrieval: RetrievalSummary {
                requested: plan.params,
                dispatched,
                escalated,
                oracle: self.oracle.name().to_string(),
            },
            progress: progress.into_events(),
            debug: (self.config.expose_debug && !debug.is_empty()).then_some(debug),
        })
    }

    async fn registered_workspace(&self, plan: &PlannedQuery) -> Result<WorkspaceRecord, ToolFailure> {
        if let Some(record) = self.workspaces.get(&plan.root) {
            return Ok(record);
        }
        if !self.config.workspace.auto_bootstrap {
            return Err(ToolFailure::WorkspaceUnavailable {
                workspace: plan.workspace.clone(),
                reason: "workspace has not been bootstrapped".to_string(),
            });
        }
        log::info!("auto-bootstrapping {}", plan.workspace);
        Ok(self.bootstrap_root(plan.root.clone()).await?.value)
    }

    /// Coalesces concurrent bootstraps of one root into a single scan.
    async fn bootstrap_root(
        &self,
        root: PathBuf,
    ) -> Result<Deduplicated<WorkspaceRecord>, ToolFailure> {
        let registry = Arc::clone(&self.workspaces);
        let key = (root.clone(), BOOTSTRAP_OPERATION);
        let workspace = root.display().to_string();
        let Deduplicated { value, joined } = self
            .bootstraps
            .dedupe(key, move || async move { registry.bootstrap(&root).await })
            .await?;
        match value {
            Ok(record) => Ok(Deduplicated {
                value: record,
                joined,
            }),
            Err(WorkspaceError::ScanFailed(detail)) => {
                Err(ToolFailure::Internal(format!("bootstrap scan: {detail}")))
            }
            Err(err) => Err(ToolFailure::WorkspaceUnavailable {
                workspace,
                reason: err.to_string(),
            }),
        }
    }

    async fn dispatch(
        &self,
        plan: &PlannedQuery,
        params: RetrievalParams,
        progress: &mut ProgressLog,
    ) -> Result<OracleOutcome, ToolFailure> {
        let query = RankingQuery {
            intent: plan.intent.clone(),
            workspace: plan.root.clone(),
            params,
            scope: plan.scope.clone(),
        };
        let oracle = Arc::clone(&self.oracle);
        progress.record_with(ProgressStage::OracleDispatched, oracle.name());

        let budget = Duration::from_millis(self.config.timeout.timeout_ms);
        let outcome = run_with_timeout("query_context", budget, async move {
            oracle.rank(query).await
        })
        .await?;

        match outcome {
            TimedOutcome::Completed { value, elapsed } => {
                let candidates = value.map_err(|err| oracle_failure(&plan.workspace, err))?;
                progress.record_with(
                    ProgressStage::OracleCompleted,
                    format!("{} candidate(s) in {}ms", candidates.len(), elapsed.as_millis()),
                );
                Ok(OracleOutcome {
                    candidates,
                    timeout: None,
                })
            }
            TimedOutcome::TimedOut { elapsed } => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                progress.record_with(
                    ProgressStage::QueryTimedOut,
                    format!("elapsedMs={elapsed_ms}"),
                );
                Ok(OracleOutcome {
                    candidates: Vec::new(),
                    timeout: Some(TimeoutInfo {
                        code: ErrorCode::Timeout,
                        elapsed_ms,
                        budget_ms: self.config.timeout.timeout_ms,
                    }),
                })
            }
        }
    }
}

/// Clamp scores, apply the confidence floor, scrub user-visible text and order by descending
/// confidence. The sort is stable, so oracle order breaks ties.
fn normalize_candidates(
    candidates: Vec<ResultCandidate>,
    params: RetrievalParams,
    debug: &mut DebugChannel,
) -> Vec<ResultCandidate> {
    let mut kept: Vec<ResultCandidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            candidate.normalize();
            if candidate.confidence < params.min_confidence {
                return None;
            }
            candidate.summary = debug.scrub(&format!("{}.summary", candidate.id), &candidate.summary);
            Some(candidate)
        })
        .collect();
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    kept
}

fn bounded(name: &str, value: Option<usize>, default: usize, max: usize) -> Result<usize, ToolFailure> {
    match value {
        None => Ok(default),
        Some(value) if (1..=max).contains(&value) => Ok(value),
        Some(value) => Err(ToolFailure::invalid_argument(
            format!("{name} must lie in [1, {max}], got {value}"),
            json!({ "field": name, "value": value, "min": 1, "max": max }),
        )),
    }
}

async fn canonical_workspace(raw: &str) -> Result<PathBuf, ToolFailure> {
    if raw.trim().is_empty() {
        return Err(ToolFailure::validation("workspace must not be empty"));
    }
    WorkspaceRegistry::canonicalize(raw)
        .await
        .map_err(|err| ToolFailure::validation(err.to_string()))
}
