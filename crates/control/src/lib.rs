//! # Relay Control
//!
//! The execution control plane wrapped around every retrieval call.
//!
//! ```text
//! call ──> AdmissionController::try_acquire ──> Busy(retry_after_ms)      (never queues)
//!              │
//!              └─ ticket ──> InFlightDeduplicator (mutating ops only)
//!                               │
//!                               └─> run_with_timeout ──> Completed | TimedOut (op detached)
//! ```
//!
//! Tickets are RAII handles: dropping one releases the slot, so every exit path releases
//! exactly once.

mod admission;
mod dedup;
mod error;
mod progress;
mod timeout;

pub use admission::{AdmissionController, AdmissionSnapshot, AdmissionTicket, RetryHintPolicy};
pub use dedup::{Deduplicated, InFlightDeduplicator};
pub use error::{Busy, ControlError, Result};
pub use progress::ProgressLog;
pub use timeout::{run_with_timeout, TimedOutcome};
