//! Execution results for criteria and flow steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::CriterionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    /// The UI lacks the hooks needed to test it
    Blocked,
    Error,
}

impl CheckStatus {
    /// Whether a flow step ending in this status ends its flow. Blocked
    /// always does; skip, fail and error only under stop-on-failure.
    pub fn halts_flow(&self, stop_on_failure: bool) -> bool {
        match self {
            CheckStatus::Pass => false,
            CheckStatus::Blocked => true,
            CheckStatus::Fail | CheckStatus::Skip | CheckStatus::Error => stop_on_failure,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✅",
            CheckStatus::Fail => "❌",
            CheckStatus::Skip => "⏭️",
            CheckStatus::Blocked => "🚧",
            CheckStatus::Error => "💥",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Fail => write!(f, "fail"),
            CheckStatus::Skip => write!(f, "skip"),
            CheckStatus::Blocked => write!(f, "blocked"),
            CheckStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub screenshots: Vec<PathBuf>,
    #[serde(default)]
    pub log_excerpt: Option<String>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.screenshots.is_empty() && self.log_excerpt.is_none()
    }

    /// `None` when there is nothing worth attaching
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// Stable element identifier (`testID`)
    TestId,
    AccessibilityLabel,
    AccessibilityHint,
}

impl RequirementKind {
    /// Prop name as written in app code
    pub fn prop(&self) -> &'static str {
        match self {
            RequirementKind::TestId => "testID",
            RequirementKind::AccessibilityLabel => "accessibilityLabel",
            RequirementKind::AccessibilityHint => "accessibilityHint",
        }
    }
}

impl std::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prop())
    }
}

/// UI metadata that would make a criterion or step automatable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRequirement {
    pub kind: RequirementKind,
    pub element: String,
    pub suggested_value: String,
    pub reason: String,
    /// Criterion id or `flow-step-<n>`
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion_id: String,
    pub description: String,
    pub section: String,
    #[serde(default)]
    pub subsection: Option<String>,
    pub criterion_type: CriterionType,
    /// Kind of mapped check that ran (`ui-action`, `visual`, ...)
    pub check_kind: String,
    pub confidence: f64,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default)]
    pub evidence: Option<Evidence>,
    #[serde(default)]
    pub missing_requirements: Vec<MissingRequirement>,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStepResult {
    pub step_number: u32,
    pub description: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default)]
    pub evidence: Option<Evidence>,
    #[serde(default)]
    pub missing_requirements: Vec<MissingRequirement>,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResult {
    pub flow_name: String,
    pub flow_number: u32,
    /// Every step completed
    pub success: bool,
    pub total_steps: usize,
    pub completed_steps: usize,
    /// Step at which iteration stopped early
    #[serde(default)]
    pub aborted_at: Option<u32>,
    pub step_results: Vec<FlowStepResult>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halts_flow() {
        assert!(CheckStatus::Blocked.halts_flow(false));
        assert!(!CheckStatus::Pass.halts_flow(true));
        for status in [CheckStatus::Fail, CheckStatus::Skip, CheckStatus::Error] {
            assert!(!status.halts_flow(false));
            assert!(status.halts_flow(true));
        }
    }
}
