//! Staleness of previously produced results.
//!
//! A candidate is stale when any of its related files was modified strictly after the candidate
//! was produced. Staleness dominates recency: a stale candidate never scores above
//! [`FreshnessConfig::stale_ceiling`], however young it is.

use async_trait::async_trait;
use relay_protocol::{FreshnessReport, ResultCandidate};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[async_trait]
pub trait FileStat: Send + Sync {
    /// Modification time in unix milliseconds, or `Ok(None)` when the file does not exist.
    async fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileStat;

#[async_trait]
impl FileStat for TokioFileStat {
    async fn modified_ms(&self, path: &Path) -> io::Result<Option<u64>> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let modified = meta.modified()?;
        let since_epoch = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(Some(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreshnessConfig {
    /// Age at which an unchanged result's score halves.
    pub half_life_hours: f64,
    pub stale_ceiling: f64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 72.0,
            stale_ceiling: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FreshnessOutcome {
    /// One entry per input candidate, `None` when the candidate had nothing to check.
    pub reports: Vec<Option<FreshnessReport>>,
    pub stale_warning: Option<String>,
}

pub struct FreshnessEvaluator {
    config: FreshnessConfig,
    stat: Arc<dyn FileStat>,
}

impl FreshnessEvaluator {
    #[must_use]
    pub fn new(config: FreshnessConfig, stat: Arc<dyn FileStat>) -> Self {
        Self { config, stat }
    }

    #[must_use]
    pub fn with_tokio_fs(config: FreshnessConfig) -> Self {
        Self::new(config, Arc::new(TokioFileStat))
    }

    pub async fn evaluate(
        &self,
        workspace_root: &Path,
        candidates: &[ResultCandidate],
        now_ms: u64,
    ) -> FreshnessOutcome {
        let mut reports = Vec::with_capacity(candidates.len());
        let mut stale_items: Vec<String> = Vec::new();

        for candidate in candidates {
            let report = self.evaluate_one(workspace_root, candidate, now_ms).await;
            if let Some(report) = report.as_ref().filter(|report| report.stale) {
                stale_items.push(format!(
                    "{} (changed: {})",
                    candidate.id,
                    report.changed_files.join(", ")
                ));
            }
            reports.push(report);
        }

        let stale_warning = (!stale_items.is_empty()).then(|| {
            format!(
                "[STALE] {} result(s) may be outdated because their sources changed after they \
                 were produced: {}",
                stale_items.len(),
                stale_items.join("; ")
            )
        });

        FreshnessOutcome {
            reports,
            stale_warning,
        }
    }

    async fn evaluate_one(
        &self,
        workspace_root: &Path,
        candidate: &ResultCandidate,
        now_ms: u64,
    ) -> Option<FreshnessReport> {
        let created_at = candidate.created_at?;
        if candidate.related_files.is_empty() {
            return None;
        }

        let mut changed_files = Vec::new();
        let mut unknown_files = Vec::new();
        for file in &candidate.related_files {
            let path = resolve(workspace_root, file);
            match self.stat.modified_ms(&path).await {
                Ok(Some(modified)) if modified > created_at => changed_files.push(file.clone()),
                Ok(_) => {}
                Err(err) => {
                    log::warn!("freshness: cannot stat {}: {err}", path.display());
                    unknown_files.push(file.clone());
                }
            }
        }

        let stale = !changed_files.is_empty();
        let mut score = self.decay(now_ms.saturating_sub(created_at));
        if stale {
            score = score.min(self.config.stale_ceiling);
        }

        Some(FreshnessReport {
            freshness_score: score.clamp(0.0, 1.0),
            stale,
            changed_files,
            unknown_files,
        })
    }

    fn decay(&self, age_ms: u64) -> f64 {
        let half_life = self.config.half_life_hours;
        if !half_life.is_finite() || half_life <= 0.0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let age_hours = age_ms as f64 / MS_PER_HOUR;
        0.5_f64.powf(age_hours / half_life)
    }
}

fn resolve(workspace_root: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}
