use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid confidence thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    #[error("Ranking task failed: {0}")]
    TaskFailed(String),
}
