//! Server configuration.
//!
//! Sources, later ones winning: built-in defaults, the TOML file named by
//! `CONTEXT_RELAY_CONFIG`, then individual `CONTEXT_RELAY_*` environment overrides. The merged
//! result is validated once at startup.

use relay_control::RetryHintPolicy;
use relay_protocol::{RetrievalDepth, RetrievalParams};
use relay_search::{ConfidenceThresholds, FreshnessConfig};
use relay_session::LoopDetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "CONTEXT_RELAY_CONFIG";
pub const MAX_CONCURRENT_ENV: &str = "CONTEXT_RELAY_MAX_CONCURRENT";
pub const TIMEOUT_MS_ENV: &str = "CONTEXT_RELAY_TIMEOUT_MS";
pub const MAX_SESSION_HISTORY_ENV: &str = "CONTEXT_RELAY_MAX_SESSION_HISTORY";
pub const AUTO_BOOTSTRAP_ENV: &str = "CONTEXT_RELAY_AUTO_BOOTSTRAP";
pub const SESSION_DIR_ENV: &str = "CONTEXT_RELAY_SESSION_DIR";
pub const EXPOSE_DEBUG_ENV: &str = "CONTEXT_RELAY_EXPOSE_DEBUG";

const MAX_CONCURRENT_CEILING: usize = 256;
const MAX_TIMEOUT_MS: u64 = 10 * 60 * 1_000;
const MAX_SESSION_HISTORY_CEILING: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AdmissionConfig {
    pub max_concurrent: usize,
    pub default_retry_after_ms: u64,
    pub min_retry_after_ms: u64,
    pub max_retry_after_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let policy = RetryHintPolicy::default();
        Self {
            max_concurrent: 8,
            default_retry_after_ms: policy.default_ms,
            min_retry_after_ms: policy.min_ms,
            max_retry_after_ms: policy.max_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TimeoutConfig {
    pub timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SessionConfig {
    pub max_session_history: usize,
    pub window_seconds: u64,
    pub exact_repeat_threshold: usize,
    pub semantic_repeat_threshold: usize,
    pub futile_repeat_threshold: usize,
    pub auto_escalate_strategy: bool,
    pub near_zero_confidence: f64,
    /// Directory for persisted episode logs; in-memory when unset.
    pub session_dir: Option<PathBuf>,
    pub episode_log_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let detector = LoopDetectorConfig::default();
        Self {
            max_session_history: 50,
            window_seconds: detector.window_seconds,
            exact_repeat_threshold: detector.exact_repeat_threshold,
            semantic_repeat_threshold: detector.semantic_repeat_threshold,
            futile_repeat_threshold: detector.futile_repeat_threshold,
            auto_escalate_strategy: detector.auto_escalate_strategy,
            near_zero_confidence: detector.near_zero_confidence,
            session_dir: None,
            episode_log_cap: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConfidenceConfig {
    pub definitive_min: f64,
    pub high_min: f64,
    pub medium_min: f64,
    pub low_min: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        let thresholds = ConfidenceThresholds::default();
        Self {
            definitive_min: thresholds.definitive_min(),
            high_min: thresholds.high_min(),
            medium_min: thresholds.medium_min(),
            low_min: thresholds.low_min(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FreshnessSection {
    pub half_life_hours: f64,
    pub stale_ceiling: f64,
}

impl Default for FreshnessSection {
    fn default() -> Self {
        let config = FreshnessConfig::default();
        Self {
            half_life_hours: config.half_life_hours,
            stale_ceiling: config.stale_ceiling,
        }
    }
}

/// Upper bound for both page sizes and stream chunk sizes.
pub const ENVELOPE_SIZE_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EnvelopeConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub default_stream_chunk_size: usize,
    pub max_stream_chunk_size: usize,
    pub near_miss_limit: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: ENVELOPE_SIZE_LIMIT,
            default_stream_chunk_size: 5,
            max_stream_chunk_size: ENVELOPE_SIZE_LIMIT,
            near_miss_limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StreamCacheConfig {
    pub capacity: usize,
}

impl Default for StreamCacheConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkspaceConfig {
    /// Register unknown workspaces on first query instead of failing.
    pub auto_bootstrap: bool,
    pub bootstrap_max_files: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            auto_bootstrap: false,
            bootstrap_max_files: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RetrievalConfig {
    pub default_depth: RetrievalDepth,
    pub default_min_confidence: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let params = RetrievalParams::default();
        Self {
            default_depth: params.depth,
            default_min_confidence: params.min_confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RelayConfig {
    pub admission: AdmissionConfig,
    pub timeout: TimeoutConfig,
    pub session: SessionConfig,
    pub confidence: ConfidenceConfig,
    pub freshness: FreshnessSection,
    pub envelope: EnvelopeConfig,
    pub stream_cache: StreamCacheConfig,
    pub workspace: WorkspaceConfig,
    pub retrieval: RetrievalConfig,
    /// Return stripped diagnostic markers under `debug` in responses.
    pub expose_debug: bool,
}

impl RelayConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match trimmed(env(CONFIG_PATH_ENV)) {
            Some(path) => {
                let path = PathBuf::from(path);
                let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                log::info!("loaded configuration from {}", path.display());
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Unparseable values are ignored with a warning, keeping the previous value.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(value) = parse_env(&env, MAX_CONCURRENT_ENV, parse_usize) {
            self.admission.max_concurrent = value.clamp(1, MAX_CONCURRENT_CEILING);
        }
        if let Some(value) = parse_env(&env, TIMEOUT_MS_ENV, parse_u64) {
            self.timeout.timeout_ms = value.clamp(1, MAX_TIMEOUT_MS);
        }
        if let Some(value) = parse_env(&env, MAX_SESSION_HISTORY_ENV, parse_usize) {
            self.session.max_session_history = value.clamp(1, MAX_SESSION_HISTORY_CEILING);
        }
        if let Some(value) = parse_env(&env, AUTO_BOOTSTRAP_ENV, parse_bool) {
            self.workspace.auto_bootstrap = value;
        }
        if let Some(value) = parse_env(&env, EXPOSE_DEBUG_ENV, parse_bool) {
            self.expose_debug = value;
        }
        if let Some(dir) = trimmed(env(SESSION_DIR_ENV)) {
            self.session.session_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.max_concurrent == 0 {
            return Err(invalid("admission.max_concurrent must be >= 1"));
        }
        if self.admission.max_concurrent > MAX_CONCURRENT_CEILING {
            return Err(invalid(format!(
                "admission.max_concurrent must be <= {MAX_CONCURRENT_CEILING}"
            )));
        }
        if self.admission.min_retry_after_ms == 0
            || self.admission.min_retry_after_ms > self.admission.max_retry_after_ms
        {
            return Err(invalid(
                "admission retry hints need 0 < min_retry_after_ms <= max_retry_after_ms",
            ));
        }
        if self.timeout.timeout_ms == 0 {
            return Err(invalid("timeout.timeout_ms must be > 0"));
        }

        let session = &self.session;
        if session.max_session_history == 0 {
            return Err(invalid("session.max_session_history must be >= 1"));
        }
        if session.window_seconds == 0 {
            return Err(invalid("session.window_seconds must be > 0"));
        }
        if session.exact_repeat_threshold == 0
            || session.semantic_repeat_threshold == 0
            || session.futile_repeat_threshold == 0
        {
            return Err(invalid("session repeat thresholds must be >= 1"));
        }
        if !(0.0..=1.0).contains(&session.near_zero_confidence) {
            return Err(invalid("session.near_zero_confidence must lie in [0, 1]"));
        }

        self.confidence_thresholds()?;

        if !(self.freshness.half_life_hours.is_finite() && self.freshness.half_life_hours > 0.0) {
            return Err(invalid("freshness.half_life_hours must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.freshness.stale_ceiling) {
            return Err(invalid("freshness.stale_ceiling must lie in [0, 1]"));
        }

        let envelope = &self.envelope;
        if envelope.max_page_size > ENVELOPE_SIZE_LIMIT
            || envelope.max_stream_chunk_size > ENVELOPE_SIZE_LIMIT
        {
            return Err(invalid(format!(
                "envelope.max_page_size and envelope.max_stream_chunk_size must be <= {ENVELOPE_SIZE_LIMIT}"
            )));
        }
        if envelope.max_page_size == 0
            || !(1..=envelope.max_page_size).contains(&envelope.default_page_size)
        {
            return Err(invalid(
                "envelope.default_page_size must lie in [1, envelope.max_page_size]",
            ));
        }
        if envelope.max_stream_chunk_size == 0
            || !(1..=envelope.max_stream_chunk_size).contains(&envelope.default_stream_chunk_size)
        {
            return Err(invalid(
                "envelope.default_stream_chunk_size must lie in [1, envelope.max_stream_chunk_size]",
            ));
        }
        if self.stream_cache.capacity == 0 {
            return Err(invalid("stream_cache.capacity must be >= 1"));
        }
        if self.workspace.bootstrap_max_files == 0 {
            return Err(invalid("workspace.bootstrap_max_files must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.default_min_confidence) {
            return Err(invalid("retrieval.default_min_confidence must lie in [0, 1]"));
        }
        Ok(())
    }

    pub fn confidence_thresholds(&self) -> Result<ConfidenceThresholds, ConfigError> {
        let c = &self.confidence;
        ConfidenceThresholds::new(c.definitive_min, c.high_min, c.medium_min, c.low_min)
            .map_err(|err| invalid(err.to_string()))
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryHintPolicy {
        RetryHintPolicy {
            default_ms: self.admission.default_retry_after_ms,
            min_ms: self.admission.min_retry_after_ms,
            max_ms: self.admission.max_retry_after_ms,
        }
    }

    #[must_use]
    pub fn loop_detector_config(&self) -> LoopDetectorConfig {
        LoopDetectorConfig {
            window_seconds: self.session.window_seconds,
            exact_repeat_threshold: self.session.exact_repeat_threshold,
            semantic_repeat_threshold: self.session.semantic_repeat_threshold,
            futile_repeat_threshold: self.session.futile_repeat_threshold,
            auto_escalate_strategy: self.session.auto_escalate_strategy,
            near_zero_confidence: self.session.near_zero_confidence,
        }
    }

    #[must_use]
    pub fn freshness_config(&self) -> FreshnessConfig {
        FreshnessConfig {
            half_life_hours: self.freshness.half_life_hours,
            stale_ceiling: self.freshness.stale_ceiling,
        }
    }

    #[must_use]
    pub fn retrieval_defaults(&self) -> RetrievalParams {
        RetrievalParams::new(
            self.retrieval.default_depth,
            self.retrieval.default_min_confidence,
        )
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn trimmed(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = trimmed(env(key))?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        log::warn!("ignoring {key}={raw:?}: not a valid value");
    }
    parsed
}

fn parse_usize(raw: &str) -> Option<usize> {
    raw.parse().ok()
}

fn parse_u64(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
