//! Run Command
//!
//! Executes criteria and flows through the configured driver programs and
//! writes the report.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use uatkit_core::{
    save_report, AcceptanceError, AcceptanceReport, AcceptanceResult, AcceptanceRunner, AlwaysReady, CommandExecutor,
    CommandGate, CommandScreenshotter, CriterionResult, FsReportSink, Mapper, ParsedCriteria, RunOptions, Screenshot,
    ScreenshotCapture, SessionGate,
};

use super::{document_label, load_documents};
use crate::config::UatConfig;
use crate::output::{
    print_error, print_heading, print_info, print_list, print_success, print_value, print_warning, status_label,
    truncate, OutputFormat, TableDisplay,
};

#[derive(Args)]
pub struct RunArgs {
    /// Criteria document or directory of documents
    pub path: PathBuf,

    /// Only run criteria in this section (repeatable)
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Only run this flow, by name or number (repeatable)
    #[arg(long = "flow")]
    pub flows: Vec<String>,

    /// Skip test flows
    #[arg(long)]
    pub no_flows: bool,

    /// Abort a flow at its first failing step
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Capture a screenshot after every flow step
    #[arg(long)]
    pub screenshot_each_step: bool,

    /// Do not write report files
    #[arg(long)]
    pub no_save: bool,
}

impl RunArgs {
    fn options(&self, config: &UatConfig) -> RunOptions {
        let mut flow = config.flows.options();
        flow.stop_on_failure |= self.stop_on_failure;
        flow.screenshot_each_step |= self.screenshot_each_step;
        RunOptions {
            sections: self.sections.clone(),
            flows: self.flows.clone(),
            include_flows: !self.no_flows,
            flow,
        }
    }
}

/// Stand-in when no screenshot program is configured
struct NoScreenshots;

#[async_trait]
impl ScreenshotCapture for NoScreenshots {
    async fn capture(&self, _name: &str) -> AcceptanceResult<Screenshot> {
        Err(AcceptanceError::Screenshot(
            "no screenshot program configured ([screenshot].program)".to_string(),
        ))
    }
}

#[derive(Serialize)]
pub struct ResultRow {
    pub id: String,
    pub status: String,
    pub check: String,
    pub confidence: f64,
    pub message: String,
}

impl From<&CriterionResult> for ResultRow {
    fn from(result: &CriterionResult) -> Self {
        Self {
            id: result.criterion_id.clone(),
            status: format!("{} {}", result.status.icon(), result.status),
            check: result.check_kind.clone(),
            confidence: result.confidence,
            message: result.message.clone(),
        }
    }
}

impl TableDisplay for ResultRow {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Status", "Check", "Confidence", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.status.clone(),
            self.check.clone(),
            format!("{:.2}", self.confidence),
            truncate(&self.message, 70),
        ]
    }
}

/// Runner for one document. Reports and screenshots are scoped to
/// `session_id` so documents in one invocation never share files.
fn build_runner(config: &UatConfig, session_id: &str) -> Result<AcceptanceRunner> {
    let program = config.executor.program.clone().context(
        "No UI driver configured; set [executor].program in uatkit.toml (see `uatkit config`)",
    )?;
    let executor = Arc::new(CommandExecutor::new(program, config.executor.args.clone()));

    let screenshots: Arc<dyn ScreenshotCapture> = match &config.screenshot.program {
        Some(program) => Arc::new(CommandScreenshotter::new(
            program.clone(),
            config.screenshot.args.clone(),
            config.screenshot.dir.join(session_id),
        )),
        None => Arc::new(NoScreenshots),
    };

    let gate: Arc<dyn SessionGate> = match &config.readiness.program {
        Some(program) => Arc::new(
            CommandGate::new(program.clone(), config.readiness.args.clone()).with_timeout(config.readiness.timeout()),
        ),
        None => Arc::new(AlwaysReady),
    };

    Ok(AcceptanceRunner::new(
        gate,
        executor,
        screenshots,
        Mapper::new(config.confidence.clone()),
        config.executor.timing.clone(),
    )
    .with_session_id(session_id))
}

/// Run one document in its own session and persist its report
async fn run_document(
    doc: &ParsedCriteria,
    config: &UatConfig,
    options: &RunOptions,
    save: bool,
) -> Result<AcceptanceReport> {
    let session_id = Uuid::new_v4().to_string();
    let runner = build_runner(config, &session_id)?;

    let report = match runner.run(doc, options).await {
        Ok(report) => report,
        Err(AcceptanceError::SessionNotReady(reason)) => {
            print_error(&format!("UI session not ready: {}", reason));
            anyhow::bail!("UI session not ready");
        }
        Err(e) => return Err(e.into()),
    };

    if !save {
        return Ok(report);
    }
    let sink = FsReportSink::new(&config.output_dir, runner.session_id());
    save_report(&sink, &report).context("Failed to write report")
}

fn print_report(report: &AcceptanceReport, format: OutputFormat) {
    let rows: Vec<ResultRow> = report.criterion_results().map(ResultRow::from).collect();
    if !rows.is_empty() {
        print_list(&rows, format);
    }

    for flow in &report.flows {
        let line = format!(
            "Flow {}: {} ({}/{} steps)",
            flow.flow_number, flow.flow_name, flow.completed_steps, flow.total_steps
        );
        if flow.success {
            print_success(&line);
        } else {
            print_warning(&line);
            for step in &flow.step_results {
                println!("    {}. {} {}", step.step_number, status_label(step.status), step.message);
            }
        }
    }

    if !report.missing_requirements.is_empty() {
        print_heading("Missing test hooks");
        for req in &report.missing_requirements {
            println!("  {}=\"{}\" for {} ({})", req.kind, req.suggested_value, req.element, req.owner);
        }
    }

    let s = &report.summary;
    println!();
    println!(
        "{} {} passed, {} failed, {} blocked, {} skipped, {} errors; pass rate {:.1}% of {} testable",
        "Summary:".bold(),
        s.passed.to_string().green(),
        s.failed.to_string().red(),
        s.blocked.to_string().yellow(),
        s.skipped,
        s.errors,
        s.pass_rate,
        s.testable
    );
}

/// Returns whether any result failed, was blocked, or errored
pub async fn execute(args: RunArgs, config: &UatConfig, format: OutputFormat) -> Result<bool> {
    let documents = load_documents(&args.path)?;
    let options = args.options(config);

    let mut reports = Vec::with_capacity(documents.len());
    for doc in &documents {
        if !format.is_structured() {
            print_heading(&document_label(doc));
        }

        let report = run_document(doc, config, &options, !args.no_save).await?;

        if !format.is_structured() {
            print_report(&report, format);
            if let Some(path) = &report.artifacts.markdown {
                print_info(&format!("Report written to {}", path.display()));
            }
        }
        reports.push(report);
    }

    if format.is_structured() {
        print_value(&reports, format);
    }

    Ok(reports.iter().any(|r| r.summary.has_failures()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use uatkit_core::parse_criteria;

    fn config(output_dir: &std::path::Path) -> UatConfig {
        let mut config = UatConfig::default();
        config.output_dir = output_dir.to_path_buf();
        config.executor.program = Some("true".to_string());
        config.executor.timing.capture_evidence = false;
        config
    }

    #[tokio::test]
    async fn test_each_document_gets_its_own_report() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let options = RunOptions::default();

        let a = parse_criteria("# Doc A\n\n## Main\n- [ ] Login button is visible\n");
        let b = parse_criteria("# Doc B\n\n## Main\n- [ ] Submit button is visible\n");
        let report_a = run_document(&a, &config, &options, true).await.unwrap();
        let report_b = run_document(&b, &config, &options, true).await.unwrap();

        assert_ne!(report_a.metadata.session_id, report_b.metadata.session_id);
        let md_a = report_a.artifacts.markdown.clone().unwrap();
        let md_b = report_b.artifacts.markdown.clone().unwrap();
        assert_ne!(md_a, md_b);
        assert!(std::fs::read_to_string(&md_a).unwrap().contains("# Acceptance Report: Doc A"));
        assert!(std::fs::read_to_string(&md_b).unwrap().contains("# Acceptance Report: Doc B"));
    }

    #[tokio::test]
    async fn test_missing_driver_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        config.executor.program = None;

        let doc = parse_criteria("# Doc\n\n## Main\n- [ ] Login button is visible\n");
        let err = run_document(&doc, &config, &RunOptions::default(), false).await.unwrap_err();
        assert!(err.to_string().contains("No UI driver configured"));
    }
}
