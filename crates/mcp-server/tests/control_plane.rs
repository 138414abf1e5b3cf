//! In-process control-plane scenarios driven by a scripted ranking oracle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use relay_mcp::orchestrator::QueryContextResponse;
use relay_mcp::tools::schemas::{
    BootstrapRequest, FetchStreamChunkRequest, QueryContextRequest, ResetSessionStateRequest,
    ServerStatusRequest,
};
use relay_mcp::{Orchestrator, RelayConfig, ToolFailure};
use relay_protocol::{
    ConfidenceTier, ErrorCode, IntentType, LoopPattern, ProgressStage, ResultCandidate,
    RetrievalDepth, RetrievalParams, RiskLevel,
};
use relay_search::{RankingOracle, RankingQuery, SearchError};
use relay_session::{load_episodes, MemorySessionStore, SessionStore};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;

/// Returns a fixed candidate list; optionally waits on a gate or sleeps first.
#[derive(Default)]
struct ScriptedOracle {
    candidates: Vec<ResultCandidate>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    entered: AtomicUsize,
    dispatched: Mutex<Vec<RetrievalParams>>,
}

impl ScriptedOracle {
    fn returning(candidates: Vec<ResultCandidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    fn dispatched(&self) -> Vec<RetrievalParams> {
        self.dispatched.lock().expect("lock").clone()
    }
}

#[async_trait]
impl RankingOracle for ScriptedOracle {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn rank(&self, query: RankingQuery) -> relay_search::Result<Vec<ResultCandidate>> {
        self.dispatched.lock().expect("lock").push(query.params);
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gate.as_ref() {
            let _permit = gate
                .acquire()
                .await
                .map_err(|err| SearchError::TaskFailed(err.to_string()))?;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.candidates.clone())
    }
}

fn candidate(id: &str, confidence: f64) -> ResultCandidate {
    ResultCandidate::new(id, "file", confidence).with_summary(format!("summary of {id}"))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn workspace_string(dir: &tempfile::TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}

async fn bootstrapped(
    config: RelayConfig,
    oracle: Arc<ScriptedOracle>,
) -> Result<(Orchestrator, tempfile::TempDir)> {
    let dir = tempfile::tempdir().context("tempdir")?;
    std::fs::write(dir.path().join("lib.rs"), "pub fn retry() {}\n").context("write")?;
    let orchestrator = Orchestrator::from_config(config)?.with_oracle(oracle);
    orchestrator
        .bootstrap(BootstrapRequest {
            workspace: workspace_string(&dir),
        })
        .await
        .map_err(|err| anyhow::anyhow!("bootstrap: {err}"))?;
    Ok((orchestrator, dir))
}

fn query(dir: &tempfile::TempDir, intent: &str) -> QueryContextRequest {
    QueryContextRequest {
        intent: intent.to_string(),
        workspace: workspace_string(dir),
        ..QueryContextRequest::default()
    }
}

async fn run(orchestrator: &Orchestrator, request: QueryContextRequest) -> QueryContextResponse {
    match orchestrator.query_context(request).await {
        Ok(response) => response,
        Err(err) => panic!("query_context failed: {err}"),
    }
}

#[tokio::test]
async fn calls_beyond_the_ceiling_are_rejected_immediately() -> Result<()> {
    let gate = Arc::new(Semaphore::new(0));
    let oracle = Arc::new(ScriptedOracle {
        candidates: vec![candidate("a", 0.9)],
        gate: Some(Arc::clone(&gate)),
        ..ScriptedOracle::default()
    });
    let mut config = RelayConfig::default();
    config.admission.max_concurrent = 2;
    let (orchestrator, dir) = bootstrapped(config, Arc::clone(&oracle)).await?;
    let orchestrator = Arc::new(orchestrator);

    let mut running = Vec::new();
    for _ in 0..2 {
        let orchestrator = Arc::clone(&orchestrator);
        let request = query(&dir, "admission gate");
        running.push(tokio::spawn(async move {
            orchestrator.query_context(request).await
        }));
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while oracle.entered.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("both admitted calls should reach the oracle")?;

    let rejected = orchestrator.query_context(query(&dir, "admission gate")).await;
    match rejected {
        Err(ToolFailure::Busy { retry_after_ms }) => assert!(retry_after_ms > 0),
        other => panic!("expected server_busy, got {other:?}"),
    }

    gate.add_permits(2);
    for handle in running {
        let response = handle.await.context("join")?;
        assert!(response.is_ok(), "admitted call failed: {response:?}");
    }

    let status = orchestrator.status(&ServerStatusRequest::default());
    assert_eq!(status.admission.active, 0);
    assert_eq!(status.admission.rejected_total, 1);
    assert_eq!(oracle.entered.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_twins_in_one_session_are_detected() -> Result<()> {
    let gate = Arc::new(Semaphore::new(0));
    let oracle = Arc::new(ScriptedOracle {
        candidates: vec![candidate("a", 0.9)],
        gate: Some(Arc::clone(&gate)),
        ..ScriptedOracle::default()
    });
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), Arc::clone(&oracle)).await?;
    let orchestrator = Arc::new(orchestrator);

    let mut running = Vec::new();
    for _ in 0..2 {
        let orchestrator = Arc::clone(&orchestrator);
        let request = QueryContextRequest {
            session_id: Some("twins".to_string()),
            ..query(&dir, "where is the retry loop")
        };
        running.push(tokio::spawn(async move {
            orchestrator.query_context(request).await
        }));
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while oracle.entered.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("both calls should reach the oracle")?;

    gate.add_permits(2);
    let mut detections = Vec::new();
    for handle in running {
        let response = handle
            .await
            .context("join")?
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        detections.push(response.loop_detection);
    }

    let repeats: Vec<LoopPattern> = detections.iter().flatten().map(|d| d.pattern).collect();
    assert_eq!(repeats, vec![LoopPattern::IdenticalQuery]);
    assert_eq!(
        orchestrator
            .status(&ServerStatusRequest {
                session_id: Some("twins".to_string()),
            })
            .session_history_len,
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn concurrent_bootstraps_share_one_run() -> Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    for i in 0..2_000 {
        std::fs::write(dir.path().join(format!("f{i}.rs")), "fn f() {}\n").context("write")?;
    }
    let orchestrator = Orchestrator::from_config(RelayConfig::default())?;
    let request = BootstrapRequest {
        workspace: workspace_string(&dir),
    };

    let (first, second) = tokio::join!(
        orchestrator.bootstrap(request.clone()),
        orchestrator.bootstrap(request)
    );
    let (first, second) = (
        first.map_err(|err| anyhow::anyhow!("{err}"))?,
        second.map_err(|err| anyhow::anyhow!("{err}"))?,
    );

    assert_eq!(first.run_id, second.run_id);
    assert_eq!(first.file_count, 2_000);
    assert!(first.deduplicated != second.deduplicated);
    assert_eq!(
        orchestrator
            .status(&ServerStatusRequest::default())
            .pending_executions,
        0
    );
    Ok(())
}

#[tokio::test]
async fn second_page_of_three_holds_the_last_item() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![
        candidate("one", 0.9),
        candidate("two", 0.8),
        candidate("three", 0.7),
    ]));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let response = run(
        &orchestrator,
        QueryContextRequest {
            page_size: Some(2),
            page_idx: Some(1),
            explain_misses: Some(true),
            ..query(&dir, "numbers")
        },
    )
    .await;

    let ids: Vec<String> = response
        .results
        .context("results")?
        .iter()
        .map(|item| item.candidate.id.clone())
        .collect();
    assert_eq!(ids, vec!["three".to_string()]);
    assert_eq!(response.pagination.page_count, 2);
    assert_eq!(response.pagination.total_items, 3);
    assert_eq!(
        response.pagination.summary,
        "Showing 3-3 of 3. Next: none. Total pages: 2."
    );

    let misses = response.near_misses.context("near misses")?;
    let ranks: Vec<usize> = misses.iter().map(|m| m.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
    assert_eq!(response.aggregate_confidence.visible_items, 1);
    Ok(())
}

#[tokio::test]
async fn futile_repeats_escalate_and_reset_clears_them() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(Vec::new()));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), Arc::clone(&oracle)).await?;
    let request = || QueryContextRequest {
        session_id: Some("loop".to_string()),
        ..query(&dir, "where is the retry budget configured")
    };

    let first = run(&orchestrator, request()).await;
    assert!(first.loop_detection.is_none());
    assert!(!first.retrieval.escalated);

    let second = run(&orchestrator, request()).await;
    let detection = second.loop_detection.context("second call detects a repeat")?;
    assert!(detection.detected);
    assert_eq!(detection.pattern, LoopPattern::IdenticalQuery);
    assert_eq!(detection.occurrences, 2);

    let third = run(&orchestrator, request()).await;
    let detection = third.loop_detection.context("third call detects futility")?;
    assert_eq!(detection.pattern, LoopPattern::FutileRepeat);
    assert!(detection.human_review_suggested);
    assert!(!detection.alternative_strategies.is_empty());
    assert!(third.retrieval.escalated);
    assert_eq!(third.retrieval.dispatched.depth, RetrievalDepth::Deep);
    assert!(third.retrieval.dispatched.min_confidence < third.retrieval.requested.min_confidence);

    let dispatched = oracle.dispatched();
    assert_eq!(dispatched.len(), 3);
    assert_eq!(dispatched[0], RetrievalParams::default());
    assert_eq!(dispatched[2].depth, RetrievalDepth::Deep);
    assert!(third
        .progress
        .iter()
        .any(|event| event.stage == ProgressStage::StrategyEscalated));

    let reset = orchestrator
        .reset_session_state(&ResetSessionStateRequest {
            session_id: "loop".to_string(),
        })
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_eq!(reset.cleared_queries, 3);

    let after_reset = run(&orchestrator, request()).await;
    assert!(after_reset.loop_detection.is_none());

    let unknown = orchestrator
        .reset_session_state(&ResetSessionStateRequest {
            session_id: "never-seen".to_string(),
        })
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_eq!(unknown.cleared_queries, 0);
    Ok(())
}

#[tokio::test]
async fn tiers_follow_the_configured_thresholds() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![candidate("edge", 0.86)]));
    let (default_tiers, dir) = bootstrapped(RelayConfig::default(), Arc::clone(&oracle)).await?;
    let response = run(&default_tiers, query(&dir, "edge")).await;
    assert_eq!(response.results.context("results")?[0].tier, ConfidenceTier::High);
    assert_eq!(response.aggregate_confidence.tier, ConfidenceTier::High);
    assert!(response.human_review_recommendation.is_none());

    let mut config = RelayConfig::default();
    config.confidence.definitive_min = 0.85;
    config.confidence.high_min = 0.70;
    config.confidence.medium_min = 0.55;
    config.confidence.low_min = 0.40;
    let (relaxed, dir) = bootstrapped(config, oracle).await?;
    let response = run(&relaxed, query(&dir, "edge")).await;
    assert_eq!(
        response.results.context("results")?[0].tier,
        ConfidenceTier::Definitive
    );
    Ok(())
}

#[tokio::test]
async fn write_risk_requests_on_weak_context_need_review() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![candidate("weak", 0.55)]));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let declared = run(
        &orchestrator,
        QueryContextRequest {
            intent_type: Some(IntentType::Refactor),
            ..query(&dir, "the retry helper")
        },
    )
    .await;
    let review = declared
        .human_review_recommendation
        .context("write risk at low confidence")?;
    assert!(review.recommended);
    assert_eq!(review.risk_level, RiskLevel::High);
    assert_eq!(review.aggregate_tier, ConfidenceTier::Low);

    let read_only = run(&orchestrator, query(&dir, "explain the retry helper")).await;
    assert!(read_only.human_review_recommendation.is_none());

    let keyword = run(&orchestrator, query(&dir, "delete the retry helper")).await;
    assert_eq!(
        keyword
            .human_review_recommendation
            .context("keyword write risk")?
            .risk_level,
        RiskLevel::High
    );
    Ok(())
}

#[tokio::test]
async fn empty_read_only_pages_are_uncertain_with_medium_review() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(Vec::new()));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let response = run(&orchestrator, query(&dir, "anything at all")).await;
    assert_eq!(response.aggregate_confidence.tier, ConfidenceTier::Uncertain);
    assert_eq!(
        response
            .human_review_recommendation
            .context("uncertain review")?
            .risk_level,
        RiskLevel::Medium
    );
    assert_eq!(
        response.pagination.summary,
        "Showing 0-0 of 0. Next: none. Total pages: 0."
    );
    Ok(())
}

#[tokio::test]
async fn results_older_than_their_files_are_stale() -> Result<()> {
    let produced_at = now_ms().saturating_sub(60 * 60 * 1_000);
    let oracle = Arc::new(ScriptedOracle::returning(vec![
        candidate("lib", 0.9)
            .with_related_file("lib.rs")
            .with_created_at(produced_at),
        candidate("untracked", 0.8),
    ]));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let response = run(&orchestrator, query(&dir, "retry")).await;
    let results = response.results.context("results")?;
    let freshness = results[0].freshness.as_ref().context("freshness report")?;
    assert!(freshness.stale);
    assert!(freshness.freshness_score < 0.1);
    assert_eq!(freshness.changed_files, vec!["lib.rs".to_string()]);
    assert!(results[1].freshness.is_none());

    let warning = response.stale_warning.context("stale warning")?;
    assert!(warning.starts_with("[STALE]"));
    assert!(warning.contains("lib (changed: lib.rs)"));
    Ok(())
}

#[tokio::test]
async fn slow_oracles_yield_partial_timed_out_responses() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle {
        candidates: vec![candidate("late", 0.9)],
        delay: Some(Duration::from_secs(5)),
        ..ScriptedOracle::default()
    });
    let mut config = RelayConfig::default();
    config.timeout.timeout_ms = 50;
    let (orchestrator, dir) = bootstrapped(config, oracle).await?;

    let response = run(&orchestrator, query(&dir, "slow")).await;
    assert!(response.timed_out);
    assert!(response.partial);
    assert_eq!(response.results.as_deref().map(<[_]>::len), Some(0));
    let timeout = response.timeout.context("timeout block")?;
    assert_eq!(timeout.code, ErrorCode::Timeout);
    assert_eq!(timeout.budget_ms, 50);
    assert_eq!(
        response.progress.last().map(|event| event.stage),
        Some(ProgressStage::QueryTimedOut)
    );

    let status = orchestrator.status(&ServerStatusRequest {
        session_id: Some("default".to_string()),
    });
    assert_eq!(status.admission.active, 0);
    assert_eq!(status.session_history_len, Some(1));
    Ok(())
}

#[tokio::test]
async fn invalid_input_is_rejected_before_admission() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![candidate("a", 0.9)]));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;
    let admitted_before = orchestrator
        .status(&ServerStatusRequest::default())
        .admission
        .admitted_total;

    let invalid = [
        query(&dir, "   "),
        QueryContextRequest {
            page_size: Some(0),
            ..query(&dir, "x")
        },
        QueryContextRequest {
            page_size: Some(201),
            ..query(&dir, "x")
        },
        QueryContextRequest {
            min_confidence: Some(1.5),
            ..query(&dir, "x")
        },
        QueryContextRequest {
            stream: Some(true),
            output_file: Some("out.json".to_string()),
            ..query(&dir, "x")
        },
        QueryContextRequest {
            file_pattern: Some("[unclosed*".to_string()),
            ..query(&dir, "x")
        },
        QueryContextRequest {
            workspace: dir.path().join("missing").to_string_lossy().to_string(),
            ..query(&dir, "x")
        },
    ];
    for request in invalid {
        let err = orchestrator
            .query_context(request)
            .await
            .expect_err("invalid request");
        assert_eq!(err.code(), ErrorCode::ValidationError, "{err}");
    }

    let status = orchestrator.status(&ServerStatusRequest::default());
    assert_eq!(status.admission.admitted_total, admitted_before);
    assert_eq!(status.admission.rejected_total, 0);
    Ok(())
}

#[tokio::test]
async fn unregistered_workspaces_need_bootstrap_unless_auto() -> Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let oracle: Arc<ScriptedOracle> = Arc::new(ScriptedOracle::returning(vec![candidate("a", 0.9)]));

    let strict = Orchestrator::from_config(RelayConfig::default())?.with_oracle(oracle.clone());
    let err = strict
        .query_context(query(&dir, "anything"))
        .await
        .expect_err("unregistered");
    assert_eq!(err.code(), ErrorCode::WorkspaceUnavailable);
    let envelope = err.into_envelope();
    assert_eq!(envelope.next_actions[0].tool, "bootstrap");
    assert!(envelope.remediation.is_some());

    let mut config = RelayConfig::default();
    config.workspace.auto_bootstrap = true;
    let auto = Orchestrator::from_config(config)?.with_oracle(oracle);
    let response = run(&auto, query(&dir, "anything")).await;
    assert!(response.run_id.starts_with("run-"));
    assert_eq!(
        auto.status(&ServerStatusRequest::default())
            .registered_workspaces,
        1
    );
    Ok(())
}

#[tokio::test]
async fn streamed_results_are_fetched_by_chunk() -> Result<()> {
    let candidates = (0..7)
        .map(|i| candidate(&format!("c{i}"), 0.9 - f64::from(i) * 0.01))
        .collect();
    let oracle = Arc::new(ScriptedOracle::returning(candidates));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let response = run(
        &orchestrator,
        QueryContextRequest {
            page_size: Some(2),
            stream: Some(true),
            stream_chunk_size: Some(3),
            ..query(&dir, "stream me")
        },
    )
    .await;
    let page: Vec<String> = response
        .results
        .context("inline page")?
        .iter()
        .map(|item| item.candidate.id.clone())
        .collect();
    assert_eq!(page, vec!["c0".to_string(), "c1".to_string()]);
    assert_eq!(
        response.pagination.summary,
        "Showing 1-2 of 7. Next: pageIdx=1. Total pages: 4."
    );
    assert_eq!(response.aggregate_confidence.visible_items, 2);
    assert_eq!(
        response.aggregate_confidence.highest_risk_element.as_deref(),
        Some("c1")
    );

    let manifest = response.stream.context("stream manifest")?;
    assert_eq!(manifest.total_items, 7);
    let counts: Vec<usize> = manifest.chunks.iter().map(|c| c.item_count).collect();
    assert_eq!(counts, vec![3, 3, 1]);

    let last = orchestrator
        .fetch_stream_chunk(&FetchStreamChunkRequest {
            stream_id: manifest.stream_id.clone(),
            chunk_index: 2,
        })
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_eq!(last.chunk_count, 3);
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].candidate.id, "c6");

    let out_of_range = orchestrator.fetch_stream_chunk(&FetchStreamChunkRequest {
        stream_id: manifest.stream_id.clone(),
        chunk_index: 3,
    });
    let failure = out_of_range.err().context("chunk 3 should be rejected")?;
    assert_eq!(failure.code(), ErrorCode::ValidationError);
    assert_eq!(
        failure.into_envelope().details,
        Some(serde_json::json!({
            "streamId": manifest.stream_id,
            "chunkIndex": 3,
            "chunkCount": 3,
        }))
    );
    Ok(())
}

#[tokio::test]
async fn output_files_receive_the_page() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![
        candidate("one", 0.9),
        candidate("two", 0.8),
    ]));
    let (orchestrator, dir) = bootstrapped(RelayConfig::default(), oracle).await?;

    let response = run(
        &orchestrator,
        QueryContextRequest {
            output_file: Some("reports/page.json".to_string()),
            ..query(&dir, "offload")
        },
    )
    .await;
    assert!(response.results.is_none());
    let summary = response.output_file.context("output file summary")?;
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.page_count, 1);

    let written = Path::new(&summary.file_path);
    assert!(written.ends_with("reports/page.json"));
    let body: serde_json::Value =
        serde_json::from_slice(&std::fs::read(written).context("read page")?)?;
    assert_eq!(body["items"][0]["id"], "one");
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(
        response.progress.last().map(|event| event.stage),
        Some(ProgressStage::OutputWritten)
    );
    Ok(())
}

#[tokio::test]
async fn diagnostic_markers_only_reach_the_debug_channel() -> Result<()> {
    let oracle = Arc::new(ScriptedOracle::returning(vec![ResultCandidate::new(
        "tagged", "file", 0.9,
    )
    .with_summary("retry loop [unverified: heuristic] lives here")]));
    let mut config = RelayConfig::default();
    config.expose_debug = true;
    let (orchestrator, dir) = bootstrapped(config, oracle).await?;

    let response = run(&orchestrator, query(&dir, "retry loop")).await;
    let results = response.results.clone().context("results")?;
    assert_eq!(results[0].candidate.summary, "retry loop lives here");
    let debug = response.debug.context("debug channel")?;
    assert_eq!(debug.disclosures.len(), 1);
    assert_eq!(debug.disclosures[0].field, "tagged.summary");
    Ok(())
}

#[tokio::test]
async fn episodes_are_logged_and_hint_later_queries() -> Result<()> {
    let store = Arc::new(MemorySessionStore::new());
    let oracle = Arc::new(ScriptedOracle::returning(vec![
        candidate("config", 0.9).with_related_file("lib.rs"),
    ]));
    let dir = tempfile::tempdir().context("tempdir")?;
    let orchestrator = Orchestrator::from_config(RelayConfig::default())?
        .with_oracle(oracle)
        .with_session_store(store.clone() as Arc<dyn SessionStore>);
    orchestrator
        .bootstrap(BootstrapRequest {
            workspace: workspace_string(&dir),
        })
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let first = run(&orchestrator, query(&dir, "parse the config")).await;
    assert!(first.episodic_hint.is_none());

    let second = run(&orchestrator, query(&dir, "parsing configs")).await;
    let hint = second.episodic_hint.context("episodic hint")?;
    assert!(hint.contains("parse the config"), "{hint}");

    let episodes = load_episodes(store.as_ref(), "default").await?;
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].result_count, 1);
    assert_eq!(episodes[0].touched_files, vec!["lib.rs".to_string()]);
    Ok(())
}
