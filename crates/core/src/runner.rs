//! Batch runner that drives a parsed document through the pipeline

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::checker::Checker;
use crate::config::ExecutionConfig;
use crate::error::{AcceptanceError, AcceptanceResult};
use crate::flow::{FlowOptions, FlowRunner};
use crate::mapper::Mapper;
use crate::model::{ParsedCriteria, TestFlow};
use crate::ports::{ScreenshotCapture, SessionGate, UiActionExecutor};
use crate::report::{build_report, AcceptanceReport, ReportInput, RunMetadata};

/// Which parts of a document to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Section names to run; empty means all
    pub sections: Vec<String>,
    /// Flow names or numbers to run; empty means all
    pub flows: Vec<String>,
    pub include_flows: bool,
    pub flow: FlowOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            flows: Vec::new(),
            include_flows: true,
            flow: FlowOptions::default(),
        }
    }
}

impl RunOptions {
    pub fn wants_section(&self, name: &str) -> bool {
        self.sections.is_empty() || self.sections.iter().any(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn wants_flow(&self, flow: &TestFlow) -> bool {
        if !self.include_flows {
            return false;
        }
        self.flows.is_empty()
            || self
                .flows
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&flow.name) || f.trim() == flow.number.to_string())
    }
}

/// Runs every selected criterion, then every selected flow, one at a time
pub struct AcceptanceRunner {
    gate: Arc<dyn SessionGate>,
    mapper: Mapper,
    checker: Checker,
    flow_runner: FlowRunner,
    session_id: String,
}

impl AcceptanceRunner {
    pub fn new(
        gate: Arc<dyn SessionGate>,
        executor: Arc<dyn UiActionExecutor>,
        screenshots: Arc<dyn ScreenshotCapture>,
        mapper: Mapper,
        config: ExecutionConfig,
    ) -> Self {
        let mapper = mapper.with_default_wait(config.default_wait_ms);
        Self {
            gate,
            checker: Checker::new(executor.clone(), screenshots.clone(), config.clone()),
            flow_runner: FlowRunner::new(executor, screenshots, mapper.clone(), config),
            mapper,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Execute the document and assemble a report.
    ///
    /// The readiness gate is consulted once up front; an unready session is
    /// the only error. Individual check failures end up in the report.
    pub async fn run(&self, parsed: &ParsedCriteria, options: &RunOptions) -> AcceptanceResult<AcceptanceReport> {
        if !self.gate.is_ready().await {
            return Err(AcceptanceError::SessionNotReady(self.gate.describe()));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        info!("Session {}: running '{}'", self.session_id, parsed.title);

        let mut criterion_results = Vec::new();
        for criterion in parsed.all_criteria() {
            if !options.wants_section(&criterion.section) {
                debug!("Skipping {} (section filtered out)", criterion.id);
                continue;
            }
            let check = self.mapper.map_criterion_to_check(criterion);
            criterion_results.push(self.checker.execute_criterion_check(criterion, &check).await);
        }

        let mut flow_results = Vec::new();
        for flow in parsed.flows.iter().filter(|f| options.wants_flow(f)) {
            flow_results.push(self.flow_runner.execute_test_flow(flow, options.flow).await);
        }

        let report = build_report(ReportInput {
            title: parsed.title.clone(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            criterion_results,
            flow_results,
            metadata: RunMetadata::new(self.session_id.clone(), parsed.source_path.clone(), options.clone()),
        });

        let s = &report.summary;
        info!(
            "Results: {} passed, {} failed, {} blocked, {} skipped, {} errors ({} ms)",
            s.passed, s.failed, s.blocked, s.skipped, s.errors, report.duration_ms
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_criteria;
    use crate::result::CheckStatus;
    use crate::testing::{FakeScreenshots, ScriptedExecutor};

    const DOC: &str = "\
# Checkout

## Cart
- [ ] Submit button is visible
- [ ] Background color is #00FF00

## Payment
- [ ] Cancel button is visible

## Test Flows

### Flow 1: Pay
1. Tap \"Pay now\"

### Flow 2: Abandon
1. Tap \"Cancel\"
";

    struct Closed;

    #[async_trait::async_trait]
    impl SessionGate for Closed {
        async fn is_ready(&self) -> bool {
            false
        }

        fn describe(&self) -> String {
            "no device attached".to_string()
        }
    }

    fn runner(gate: Arc<dyn SessionGate>) -> (AcceptanceRunner, Arc<ScriptedExecutor>) {
        let executor = Arc::new(ScriptedExecutor::passing());
        let runner = AcceptanceRunner::new(
            gate,
            executor.clone(),
            Arc::new(FakeScreenshots::default()),
            Mapper::default(),
            ExecutionConfig::default(),
        )
        .with_session_id("fixed");
        (runner, executor)
    }

    #[tokio::test]
    async fn test_runs_criteria_then_flows_in_order() {
        let (runner, executor) = runner(Arc::new(crate::ports::AlwaysReady));
        let parsed = parse_criteria(DOC);
        let report = runner.run(&parsed, &RunOptions::default()).await.unwrap();

        assert_eq!(
            executor.calls(),
            vec!["cart-1", "payment-1", "flow-step-1", "flow-step-1"]
        );
        assert_eq!(report.summary.total, 5);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.metadata.session_id, "fixed");
        assert_eq!(report.flows.len(), 2);
    }

    #[tokio::test]
    async fn test_unready_session_is_rejected_before_execution() {
        let (runner, executor) = runner(Arc::new(Closed));
        let err = runner.run(&parse_criteria(DOC), &RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, AcceptanceError::SessionNotReady(ref m) if m == "no device attached"));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_filters() {
        let (runner, executor) = runner(Arc::new(crate::ports::AlwaysReady));
        let options = RunOptions {
            sections: vec!["payment".to_string()],
            flows: vec!["2".to_string()],
            ..Default::default()
        };
        let report = runner.run(&parse_criteria(DOC), &options).await.unwrap();
        assert_eq!(executor.calls(), vec!["payment-1", "flow-step-1"]);
        assert_eq!(report.flows[0].flow_name, "Abandon");

        let options = RunOptions {
            include_flows: false,
            ..Default::default()
        };
        let report = runner.run(&parse_criteria(DOC), &options).await.unwrap();
        assert!(report.flows.is_empty());
        assert!(report
            .criterion_results()
            .all(|r| r.status == CheckStatus::Pass || r.status == CheckStatus::Skip));
    }
}
