use crate::types::SegmentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Segment not found: {0}")]
    SegmentNotFound(SegmentId),

    #[error("Overlap detected")]
    OverlapDetected,

    #[error("Invalid time string: {0:?}")]
    InvalidTime(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, CoreError>;
