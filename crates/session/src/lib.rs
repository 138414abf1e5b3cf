//! # Relay Session
//!
//! Per-session memory for the Context Relay: a bounded query history per session id, the loop
//! detector that classifies repeats against it, and a best-effort episode log behind the
//! [`SessionStore`] shim.

mod error;
mod fingerprint;
mod history;
mod loop_detector;
mod registry;
mod store;

pub use error::{Result, SessionError};
pub use fingerprint::{normalize_intent, semantic_bucket, QueryKey};
pub use history::{QueryRecord, SessionHistory};
pub use loop_detector::{LoopDetector, LoopDetectorConfig};
pub use registry::{PendingQuery, SessionInsight, SessionRegistry};
pub use store::{
    clear_episodes_best_effort, load_episodes, persist_episode_best_effort, FileSessionStore,
    MemorySessionStore, SessionStore,
};
