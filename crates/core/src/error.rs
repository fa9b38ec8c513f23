//! Error types for the acceptance pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcceptanceError {
    #[error("Acceptance criteria file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("UI session not ready: {0}")]
    SessionNotReady(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AcceptanceResult<T> = Result<T, AcceptanceError>;
