//! Collaborator boundaries
//!
//! The pipeline decides which check to run and how to read its result. The
//! traits here are the only way it touches a device: performing UI actions,
//! grabbing screenshots, asking whether the session is usable, and writing
//! the finished report somewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::check::UiAction;
use crate::error::AcceptanceResult;

/// What the executor reports back for one action sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ExecutionFailure>,
    #[serde(default)]
    pub evidence: Vec<PathBuf>,
}

impl ExecutionOutcome {
    pub fn passed(elapsed_ms: u64) -> Self {
        Self {
            success: true,
            elapsed_ms,
            ..Default::default()
        }
    }

    pub fn failed(elapsed_ms: u64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed_ms,
            error: Some(ExecutionFailure {
                message: message.into(),
                details: None,
            }),
            ..Default::default()
        }
    }

    /// Failure message, or a generic one when the executor gave none
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "UI action failed without an error message".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// Runs UI actions against the live app session.
///
/// Timeout expiry is expected to come back as a failed outcome whose message
/// mentions the timeout; `Err` is reserved for the executor itself breaking.
#[async_trait]
pub trait UiActionExecutor: Send + Sync {
    async fn execute(
        &self,
        name: &str,
        actions: &[UiAction],
        timeout: Duration,
    ) -> AcceptanceResult<ExecutionOutcome>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub path: PathBuf,
}

#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    async fn capture(&self, name: &str) -> AcceptanceResult<Screenshot>;
}

/// Checked once before a batch run
#[async_trait]
pub trait SessionGate: Send + Sync {
    async fn is_ready(&self) -> bool;

    /// Human-readable reason shown when the gate is closed
    fn describe(&self) -> String {
        "UI session is not ready".to_string()
    }
}

/// Gate for setups with no readiness probe
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

#[async_trait]
impl SessionGate for AlwaysReady {
    async fn is_ready(&self) -> bool {
        true
    }
}

/// Where persisted report files ended up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default)]
    pub markdown: Option<PathBuf>,
    #[serde(default)]
    pub json: Option<PathBuf>,
}

pub trait ReportSink: Send + Sync {
    fn persist(&self, markdown: &str, json: &str) -> AcceptanceResult<ArtifactPaths>;
}
