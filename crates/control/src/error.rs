use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Immediate admission rejection. Nothing was started; retry after the hint.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("server busy; retry after {retry_after_ms}ms")]
pub struct Busy {
    pub retry_after_ms: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)]
    Busy(#[from] Busy),

    #[error("execution task failed: {0}")]
    TaskFailed(String),
}
