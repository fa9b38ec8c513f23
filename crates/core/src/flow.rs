//! Sequential execution of multi-step test flows

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::check::MappedCheck;
use crate::checker::{analyze_failure, excerpt, step_missing_requirements};
use crate::config::ExecutionConfig;
use crate::mapper::Mapper;
use crate::model::{FlowStep, TestFlow};
use crate::ports::{ScreenshotCapture, UiActionExecutor};
use crate::result::{CheckStatus, Evidence, FlowResult, FlowStepResult, MissingRequirement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOptions {
    /// Capture a screenshot after every completed step
    pub screenshot_each_step: bool,
    /// Halt at the first skip, fail or error
    pub stop_on_failure: bool,
}

/// Runs flows step by step against one live session.
///
/// Each step assumes the UI state left by the previous one, so steps are
/// never run concurrently and nothing after an abort is attempted.
pub struct FlowRunner {
    executor: Arc<dyn UiActionExecutor>,
    screenshots: Arc<dyn ScreenshotCapture>,
    mapper: Mapper,
    config: ExecutionConfig,
}

/// What happened to one step and whether the loop must stop
struct StepOutcome {
    result: FlowStepResult,
    completed: bool,
    abort: bool,
}

impl FlowRunner {
    pub fn new(
        executor: Arc<dyn UiActionExecutor>,
        screenshots: Arc<dyn ScreenshotCapture>,
        mapper: Mapper,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            executor,
            screenshots,
            mapper,
            config,
        }
    }

    pub async fn execute_test_flow(&self, flow: &TestFlow, options: FlowOptions) -> FlowResult {
        let start = Instant::now();
        info!("Running flow {}: {} ({} steps)", flow.number, flow.name, flow.steps.len());

        let mut step_results = Vec::with_capacity(flow.steps.len());
        let mut completed_steps = 0;
        let mut aborted_at = None;

        for step in &flow.steps {
            let outcome = self.execute_step(flow, step, options).await;
            if outcome.completed {
                completed_steps += 1;
            }
            step_results.push(outcome.result);
            if outcome.abort {
                warn!("Flow '{}' aborted at step {}", flow.name, step.number);
                aborted_at = Some(step.number);
                break;
            }
        }

        let total_steps = flow.steps.len();
        let success = completed_steps == total_steps;
        let duration_ms = start.elapsed().as_millis() as u64;

        if success {
            info!("✓ Flow '{}' ({} ms)", flow.name, duration_ms);
        } else {
            warn!(
                "✗ Flow '{}' completed {}/{} steps",
                flow.name, completed_steps, total_steps
            );
        }

        FlowResult {
            flow_name: flow.name.clone(),
            flow_number: flow.number,
            success,
            total_steps,
            completed_steps,
            aborted_at,
            step_results,
            duration_ms,
        }
    }

    async fn execute_step(&self, flow: &TestFlow, step: &FlowStep, options: FlowOptions) -> StepOutcome {
        let start = Instant::now();
        let check = self.mapper.map_flow_step(step);
        debug!("Step {}: {} -> {}", step.number, step.description, check.kind());

        let (actions, name) = match check {
            MappedCheck::UiAction { actions, name, .. } => (actions, name),
            MappedCheck::Manual { reason } => {
                return StepOutcome {
                    result: step_result(step, CheckStatus::Skip, reason, Evidence::default(), Vec::new(), start),
                    completed: false,
                    abort: CheckStatus::Skip.halts_flow(options.stop_on_failure),
                };
            }
            other => {
                // Flow steps only ever map to UI actions or manual
                let reason = format!("Unsupported check kind for a flow step: {}", other.kind());
                return StepOutcome {
                    result: step_result(step, CheckStatus::Skip, reason, Evidence::default(), Vec::new(), start),
                    completed: false,
                    abort: CheckStatus::Skip.halts_flow(options.stop_on_failure),
                };
            }
        };

        let outcome = match self
            .executor
            .execute(&name, &actions, self.config.flow_step_timeout())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Step {} errored: {}", step.number, e);
                return StepOutcome {
                    result: step_result(
                        step,
                        CheckStatus::Error,
                        format!("Step execution error: {}", e),
                        Evidence::default(),
                        Vec::new(),
                        start,
                    ),
                    completed: false,
                    abort: CheckStatus::Error.halts_flow(options.stop_on_failure),
                };
            }
        };

        let mut evidence = Evidence {
            screenshots: outcome.evidence.clone(),
            log_excerpt: None,
        };

        if outcome.success {
            if options.screenshot_each_step {
                match self.screenshots.capture(&screenshot_name(flow, step)).await {
                    Ok(shot) => evidence.screenshots.push(shot.path),
                    Err(e) => warn!("Screenshot for step {} failed: {}", step.number, e),
                }
            }
            let message = format!("Step completed ({} ms)", outcome.elapsed_ms);
            return StepOutcome {
                result: step_result(step, CheckStatus::Pass, message, evidence, Vec::new(), start),
                completed: true,
                abort: false,
            };
        }

        let error_message = outcome.error_message();
        let analysis = analyze_failure(&error_message);
        evidence.log_excerpt = Some(excerpt(&error_message));
        let missing = if analysis.element_missing {
            step_missing_requirements(step, &error_message)
        } else {
            Vec::new()
        };
        let abort = analysis.status.halts_flow(options.stop_on_failure);

        StepOutcome {
            result: step_result(step, analysis.status, analysis.message, evidence, missing, start),
            completed: false,
            abort,
        }
    }
}

/// Capture name unique across the flows of one document
fn screenshot_name(flow: &TestFlow, step: &FlowStep) -> String {
    format!("flow-{}-step-{}", flow.number, step.number)
}

fn step_result(
    step: &FlowStep,
    status: CheckStatus,
    message: String,
    evidence: Evidence,
    missing_requirements: Vec<MissingRequirement>,
    start: Instant,
) -> FlowStepResult {
    FlowStepResult {
        step_number: step.number,
        description: step.description.clone(),
        status,
        message,
        evidence: evidence.into_option(),
        missing_requirements,
        elapsed_ms: start.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::parse_flow_step;
    use crate::testing::{FakeScreenshots, Script, ScriptedExecutor};

    fn flow(steps: &[&str]) -> TestFlow {
        TestFlow {
            number: 1,
            name: "Onboarding".to_string(),
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, text)| parse_flow_step(i as u32 + 1, text))
                .collect(),
        }
    }

    fn runner(executor: ScriptedExecutor) -> (FlowRunner, Arc<ScriptedExecutor>, Arc<FakeScreenshots>) {
        let executor = Arc::new(executor);
        let screenshots = Arc::new(FakeScreenshots::default());
        let runner = FlowRunner::new(
            executor.clone(),
            screenshots.clone(),
            Mapper::default(),
            ExecutionConfig::default(),
        );
        (runner, executor, screenshots)
    }

    #[tokio::test]
    async fn test_all_steps_pass() {
        let (runner, executor, _) = runner(ScriptedExecutor::passing());
        let f = flow(&["Tap \"Continue\"", "Verify \"Welcome\" is shown"]);
        let result = runner.execute_test_flow(&f, FlowOptions::default()).await;
        assert!(result.success);
        assert_eq!(result.completed_steps, 2);
        assert_eq!(result.aborted_at, None);
        assert_eq!(executor.calls(), vec!["flow-step-1", "flow-step-2"]);
    }

    #[tokio::test]
    async fn test_blocked_step_aborts_without_stop_on_failure() {
        let (runner, executor, _) = runner(ScriptedExecutor::passing().script(
            "flow-step-1",
            Script::Fail("Element not found: Continue".to_string()),
        ));
        let f = flow(&["Tap \"Continue\"", "Verify \"Welcome\" is shown"]);
        let result = runner.execute_test_flow(&f, FlowOptions::default()).await;

        assert!(!result.success);
        assert_eq!(result.completed_steps, 0);
        assert_eq!(result.aborted_at, Some(1));
        assert_eq!(result.step_results.len(), 1);
        let step = &result.step_results[0];
        assert_eq!(step.status, CheckStatus::Blocked);
        assert_eq!(step.missing_requirements.len(), 1);
        assert_eq!(step.missing_requirements[0].owner, "flow-step-1");
        assert_eq!(executor.calls(), vec!["flow-step-1"]);
    }

    #[tokio::test]
    async fn test_plain_failure_continues_by_default() {
        let (runner, _, _) = runner(ScriptedExecutor::passing().script(
            "flow-step-1",
            Script::Fail("Expected 'Welcome' but saw 'Error'".to_string()),
        ));
        let f = flow(&["Tap \"Continue\"", "Verify \"Welcome\" is shown"]);
        let result = runner.execute_test_flow(&f, FlowOptions::default()).await;
        assert_eq!(result.step_results.len(), 2);
        assert_eq!(result.step_results[0].status, CheckStatus::Fail);
        assert_eq!(result.completed_steps, 1);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_stop_on_failure_halts_at_fail() {
        let (runner, _, _) = runner(ScriptedExecutor::passing().script(
            "flow-step-1",
            Script::Fail("Timed out after 15000 ms".to_string()),
        ));
        let f = flow(&["Tap \"Continue\"", "Verify \"Welcome\" is shown"]);
        let options = FlowOptions {
            stop_on_failure: true,
            ..Default::default()
        };
        let result = runner.execute_test_flow(&f, options).await;
        assert_eq!(result.step_results.len(), 1);
        assert!(result.step_results[0].message.starts_with("Timeout waiting for element"));
    }

    #[tokio::test]
    async fn test_unmappable_step_is_skipped() {
        let (runner, executor, _) = runner(ScriptedExecutor::passing());
        let f = flow(&["Log in as the demo user", "Tap \"Continue\""]);

        let result = runner.execute_test_flow(&f, FlowOptions::default()).await;
        assert_eq!(result.step_results[0].status, CheckStatus::Skip);
        assert_eq!(result.completed_steps, 1);
        assert!(!result.success);
        assert_eq!(executor.calls(), vec!["flow-step-2"]);

        let options = FlowOptions {
            stop_on_failure: true,
            ..Default::default()
        };
        let result = runner.execute_test_flow(&f, options).await;
        assert_eq!(result.step_results.len(), 1);
        assert_eq!(result.aborted_at, Some(1));
    }

    #[tokio::test]
    async fn test_executor_error_is_recorded() {
        let (runner, _, _) = runner(ScriptedExecutor::broken("executor unreachable"));
        let f = flow(&["Tap \"Continue\"", "Verify \"Welcome\" is shown"]);
        let result = runner.execute_test_flow(&f, FlowOptions::default()).await;
        assert_eq!(result.step_results.len(), 2);
        assert!(result.step_results.iter().all(|s| s.status == CheckStatus::Error));
    }

    #[tokio::test]
    async fn test_screenshot_each_step() {
        let (runner, _, screenshots) = runner(ScriptedExecutor::passing());
        let f = flow(&["Tap \"Continue\"", "Wait 1 second"]);
        let options = FlowOptions {
            screenshot_each_step: true,
            ..Default::default()
        };
        let result = runner.execute_test_flow(&f, options).await;
        assert!(result.success);
        assert_eq!(screenshots.captured(), vec!["flow-1-step-1", "flow-1-step-2"]);
        assert!(result.step_results[1].evidence.is_some());
    }

    #[tokio::test]
    async fn test_step_screenshots_stay_distinct_across_flows() {
        let (runner, _, _) = runner(ScriptedExecutor::passing());
        let first = flow(&["Tap \"Continue\""]);
        let mut second = flow(&["Tap \"Done\""]);
        second.number = 2;
        second.name = "Checkout".to_string();
        let options = FlowOptions {
            screenshot_each_step: true,
            ..Default::default()
        };

        let a = runner.execute_test_flow(&first, options).await;
        let b = runner.execute_test_flow(&second, options).await;
        let shots = |r: &FlowResult| r.step_results[0].evidence.clone().unwrap().screenshots;

        assert_ne!(shots(&a), shots(&b));
        assert_eq!(shots(&b), vec![std::path::PathBuf::from("/tmp/uatkit-shots/flow-2-step-1.png")]);
    }
}
