//! Criterion check execution and failure analysis

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::check::MappedCheck;
use crate::config::ExecutionConfig;
use crate::error::AcceptanceResult;
use crate::model::{AcceptanceCriterion, ElementSelector, FlowStep, SelectorStrategy};
use crate::ports::{ExecutionOutcome, ScreenshotCapture, UiActionExecutor};
use crate::result::{CheckStatus, CriterionResult, Evidence, MissingRequirement, RequirementKind};
use crate::selector::infer_test_id;

/// Checked in order against the lowercased error message
const ELEMENT_NOT_FOUND_PATTERNS: &[&str] = &[
    "element not found",
    "could not find element",
    "unable to find element",
    "no element found",
    "no such element",
    "could not find",
    "unable to find",
    "not found",
];

const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out"];

const ASSERTION_PATTERNS: &[&str] = &["expect", "assertion"];

/// Longest error text copied into reasons and log excerpts
const EXCERPT_LEN: usize = 200;

/// Classification of an executor failure message
#[derive(Debug, Clone, PartialEq)]
pub struct FailureAnalysis {
    pub status: CheckStatus,
    pub message: String,
    /// The failure points at absent test hooks rather than broken behavior
    pub element_missing: bool,
}

/// Decide whether a failure means "the element could not be located"
/// (blocked) or "the app misbehaved" (fail).
pub fn analyze_failure(error_message: &str) -> FailureAnalysis {
    let lower = error_message.to_lowercase();

    if ELEMENT_NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
        return FailureAnalysis {
            status: CheckStatus::Blocked,
            message: format!("Element not found, test hooks missing: {}", error_message),
            element_missing: true,
        };
    }

    let message = if TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
        format!("Timeout waiting for element: {}", error_message)
    } else if ASSERTION_PATTERNS.iter().any(|p| lower.contains(p)) {
        format!("Assertion failed: {}", error_message)
    } else {
        error_message.to_string()
    };

    FailureAnalysis {
        status: CheckStatus::Fail,
        message,
        element_missing: false,
    }
}

/// Suggestions that would let a blocked criterion locate its element.
///
/// Always yields a stable-id suggestion; adds an accessibility label when
/// the element was being found by its visible text.
pub fn generate_missing_requirements(
    criterion: &AcceptanceCriterion,
    error_message: &str,
) -> Vec<MissingRequirement> {
    let mut requirements = vec![test_id_requirement(&criterion.description, &criterion.id, error_message)];

    if let Some(selector) = criterion
        .config
        .selector
        .as_ref()
        .filter(|s| s.by == SelectorStrategy::Text)
    {
        requirements.push(accessibility_label_requirement(selector, &criterion.description, &criterion.id));
    }

    requirements
}

/// Stable-id suggestion for a flow step that could not find its element
pub fn step_missing_requirements(step: &FlowStep, error_message: &str) -> Vec<MissingRequirement> {
    vec![test_id_requirement(&step.description, &step.owner_id(), error_message)]
}

fn test_id_requirement(description: &str, owner: &str, error_message: &str) -> MissingRequirement {
    let suggested = infer_test_id(description);
    MissingRequirement {
        kind: RequirementKind::TestId,
        element: description.to_string(),
        reason: format!(
            "Element could not be located ({}); a stable testID=\"{}\" makes it addressable",
            excerpt(error_message),
            suggested
        ),
        suggested_value: suggested,
        owner: owner.to_string(),
    }
}

fn accessibility_label_requirement(
    selector: &ElementSelector,
    description: &str,
    owner: &str,
) -> MissingRequirement {
    MissingRequirement {
        kind: RequirementKind::AccessibilityLabel,
        element: description.to_string(),
        suggested_value: selector.value.clone(),
        reason: format!(
            "Element is matched by visible text \"{}\"; an accessibilityLabel keeps it reachable when copy changes",
            selector.value
        ),
        owner: owner.to_string(),
    }
}

pub(crate) fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(EXCERPT_LEN).collect();
        format!("{}…", cut)
    }
}

struct CheckOutcome {
    status: CheckStatus,
    message: String,
    evidence: Evidence,
    missing_requirements: Vec<MissingRequirement>,
}

/// Runs mapped criterion checks against the collaborators
pub struct Checker {
    executor: Arc<dyn UiActionExecutor>,
    screenshots: Arc<dyn ScreenshotCapture>,
    config: ExecutionConfig,
}

impl Checker {
    pub fn new(
        executor: Arc<dyn UiActionExecutor>,
        screenshots: Arc<dyn ScreenshotCapture>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            executor,
            screenshots,
            config,
        }
    }

    /// Execute one check. Never fails: collaborator errors become an
    /// `error` result so the rest of the run continues.
    pub async fn execute_criterion_check(
        &self,
        criterion: &AcceptanceCriterion,
        check: &MappedCheck,
    ) -> CriterionResult {
        let start = Instant::now();
        debug!("Checking {} ({})", criterion.id, check.kind());

        let outcome = match self.run_check(criterion, check).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("✗ {} - {}", criterion.id, e);
                CheckOutcome {
                    status: CheckStatus::Error,
                    message: format!("Check execution error: {}", e),
                    evidence: Evidence::default(),
                    missing_requirements: Vec::new(),
                }
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome.status {
            CheckStatus::Pass => info!("✓ {} ({} ms)", criterion.id, elapsed_ms),
            CheckStatus::Skip => info!("- {} skipped: {}", criterion.id, outcome.message),
            CheckStatus::Blocked => warn!("■ {} blocked: {}", criterion.id, outcome.message),
            CheckStatus::Fail => warn!("✗ {} - {}", criterion.id, outcome.message),
            CheckStatus::Error => {}
        }

        CriterionResult {
            criterion_id: criterion.id.clone(),
            description: criterion.description.clone(),
            section: criterion.section.clone(),
            subsection: criterion.subsection.clone(),
            criterion_type: criterion.criterion_type,
            check_kind: check.kind().to_string(),
            confidence: check.confidence(),
            status: outcome.status,
            message: outcome.message,
            evidence: outcome.evidence.into_option(),
            missing_requirements: outcome.missing_requirements,
            elapsed_ms,
            timestamp: Utc::now(),
        }
    }

    async fn run_check(
        &self,
        criterion: &AcceptanceCriterion,
        check: &MappedCheck,
    ) -> AcceptanceResult<CheckOutcome> {
        match check {
            MappedCheck::Manual { reason } => Ok(CheckOutcome {
                status: CheckStatus::Skip,
                message: reason.clone(),
                evidence: Evidence::default(),
                missing_requirements: Vec::new(),
            }),
            MappedCheck::Visual { name, .. } => {
                let screenshots = self.capture_evidence(name).await.into_iter().collect();
                Ok(CheckOutcome {
                    status: CheckStatus::Skip,
                    message: "Manual verification pending: compare the screenshot against the expected layout"
                        .to_string(),
                    evidence: Evidence {
                        screenshots,
                        log_excerpt: None,
                    },
                    missing_requirements: Vec::new(),
                })
            }
            MappedCheck::ScreenshotAnalysis {
                name,
                color_hex,
                target,
                ..
            } => {
                let screenshots = self.capture_evidence(name).await.into_iter().collect();
                Ok(CheckOutcome {
                    status: CheckStatus::Skip,
                    message: format!(
                        "Manual verification pending: confirm {} color {} in the screenshot",
                        target, color_hex
                    ),
                    evidence: Evidence {
                        screenshots,
                        log_excerpt: None,
                    },
                    missing_requirements: Vec::new(),
                })
            }
            MappedCheck::UiAction { name, actions, .. } => {
                let timeout = criterion
                    .config
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.config.criterion_timeout());
                let outcome = self.executor.execute(name, actions, timeout).await?;
                Ok(self.interpret(criterion, name, outcome).await)
            }
        }
    }

    async fn interpret(
        &self,
        criterion: &AcceptanceCriterion,
        name: &str,
        outcome: ExecutionOutcome,
    ) -> CheckOutcome {
        let mut evidence = Evidence {
            screenshots: outcome.evidence.clone(),
            log_excerpt: None,
        };

        if outcome.success {
            if self.config.capture_evidence {
                evidence.screenshots.extend(self.capture_evidence(name).await);
            }
            return CheckOutcome {
                status: CheckStatus::Pass,
                message: format!("All UI actions passed ({} ms)", outcome.elapsed_ms),
                evidence,
                missing_requirements: Vec::new(),
            };
        }

        let error_message = outcome.error_message();
        let analysis = analyze_failure(&error_message);
        evidence.log_excerpt = Some(excerpt(
            outcome
                .error
                .as_ref()
                .and_then(|e| e.details.as_deref())
                .unwrap_or(&error_message),
        ));

        let missing_requirements = if analysis.element_missing {
            generate_missing_requirements(criterion, &error_message)
        } else {
            Vec::new()
        };

        CheckOutcome {
            status: analysis.status,
            message: analysis.message,
            evidence,
            missing_requirements,
        }
    }

    /// Best-effort screenshot; failures are logged and dropped
    async fn capture_evidence(&self, name: &str) -> Option<PathBuf> {
        match self.screenshots.capture(name).await {
            Ok(shot) => Some(shot.path),
            Err(e) => {
                warn!("Screenshot for '{}' failed: {}", name, e);
                None
            }
        }
    }
}
