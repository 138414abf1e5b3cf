//! Response shaping: pagination windows, near misses, stream chunk metadata and output files.

use async_trait::async_trait;
use relay_protocol::{ConfidenceTier, FreshnessReport, ResultCandidate};
use serde::{Deserialize, Serialize};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const NEAR_MISS_REASON: &str = "Excluded by pagination window";

/// One ranked, tiered result as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    #[serde(flatten)]
    pub candidate: ResultCandidate,
    pub tier: ConfidenceTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<FreshnessReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_size: usize,
    pub page_idx: usize,
    pub total_items: usize,
    pub page_count: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_idx: Option<usize>,
    pub summary: String,
}

/// Window `[page_idx * page_size, +page_size)` over `total_items`, clipped to the item count.
#[must_use]
pub fn paginate(total_items: usize, page_size: usize, page_idx: usize) -> (Range<usize>, Pagination) {
    let page_size = page_size.max(1);
    let page_count = total_items.div_ceil(page_size);
    let start = page_idx.saturating_mul(page_size).min(total_items);
    let end = start.saturating_add(page_size).min(total_items);

    let has_more = page_idx.saturating_add(1) < page_count;
    let next_page_idx = has_more.then_some(page_idx + 1);

    let shown = if start < end {
        format!("Showing {}-{} of {total_items}.", start + 1, end)
    } else {
        format!("Showing 0-0 of {total_items}.")
    };
    let next = next_page_idx.map_or_else(|| "none".to_string(), |idx| format!("pageIdx={idx}"));
    let summary = format!("{shown} Next: {next}. Total pages: {page_count}.");

    (
        start..end,
        Pagination {
            page_size,
            page_idx,
            total_items,
            page_count,
            has_more,
            next_page_idx,
            summary,
        },
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearMiss {
    pub id: String,
    /// 1-based position in the full ranked list.
    pub rank: usize,
    pub confidence: f64,
    pub reason: String,
}

/// Items that only the page window hid, in original rank order.
#[must_use]
pub fn near_misses(items: &[ScoredResult], window: &Range<usize>, limit: usize) -> Vec<NearMiss> {
    let before = 0..window.start.min(items.len());
    let after = window.end.min(items.len())..items.len();
    before
        .chain(after)
        .take(limit)
        .map(|idx| {
            let candidate = &items[idx].candidate;
            NearMiss {
                id: candidate.id.clone(),
                rank: idx + 1,
                confidence: candidate.confidence,
                reason: NEAR_MISS_REASON.to_string(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunkInfo {
    pub index: usize,
    pub item_count: usize,
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamManifest {
    pub stream_id: String,
    pub chunk_size: usize,
    pub total_items: usize,
    pub chunks: Vec<StreamChunkInfo>,
}

#[must_use]
pub fn stream_chunks(items: &[ScoredResult], chunk_size: usize) -> Vec<StreamChunkInfo> {
    items
        .chunks(chunk_size.max(1))
        .enumerate()
        .map(|(index, chunk)| StreamChunkInfo {
            index,
            item_count: chunk.len(),
            item_ids: chunk.iter().map(|item| item.candidate.id.clone()).collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputFileSummary {
    pub file_path: String,
    pub total_items: usize,
    pub page_count: usize,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutputFileBody<'a> {
    pub(crate) items: &'a [ScoredResult],
    pub(crate) pagination: &'a Pagination,
}

/// Destination for offloaded pages.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Replace `path` with `bytes` so readers never observe a partial file.
    async fn write_atomic(&self, path: &Path, bytes: Vec<u8>) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioOutputSink;

#[async_trait]
impl OutputSink for TokioOutputSink {
    async fn write_atomic(&self, path: &Path, bytes: Vec<u8>) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        let tmp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }
        Ok(())
    }
}

/// Relative paths resolve against the workspace root.
pub fn resolve_output_path(workspace_root: &Path, raw: &str) -> Result<PathBuf, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("outputFile must not be empty".to_string());
    }
    let path = Path::new(trimmed);
    if path.file_name().is_none() {
        return Err(format!("outputFile '{trimmed}' does not name a file"));
    }
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    })
}
