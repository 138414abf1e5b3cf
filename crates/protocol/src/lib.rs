//! # Relay Protocol
//!
//! Wire types shared by every layer of the Context Relay control plane: result candidates,
//! confidence tiers, loop-detection metadata, progress events and the error envelope.
//!
//! Field names are camelCase on the wire. Optional blocks are `Option` fields that are omitted
//! (never `null`) when absent: absence is the "not applicable" signal.

mod candidate;
pub mod disclosure;
mod error;
mod loop_meta;
pub mod path_filters;
mod progress;
mod retrieval;
mod tiers;

pub use candidate::{FreshnessReport, ResultCandidate};
pub use error::{ErrorCode, ErrorEnvelope, ToolNextAction};
pub use loop_meta::{LoopDetection, LoopPattern};
pub use progress::{ProgressEvent, ProgressStage};
pub use retrieval::{IntentType, RetrievalDepth, RetrievalParams};
pub use tiers::{AggregateConfidence, ConfidenceTier, HumanReviewRecommendation, RiskLevel};

pub const PROTOCOL_SCHEMA_VERSION: u32 = 1;
