//! Report aggregation
//!
//! [`build_report`] is pure: it folds criterion and flow results into one
//! immutable [`AcceptanceReport`]. Persisting goes through a [`ReportSink`]
//! and yields a new report carrying the artifact paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

use crate::error::AcceptanceResult;
use crate::markdown::render_markdown;
use crate::ports::{ArtifactPaths, ReportSink};
use crate::result::{CheckStatus, CriterionResult, FlowResult, MissingRequirement, RequirementKind};
use crate::runner::RunOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub blocked: usize,
    pub errors: usize,
    /// Everything that was not skipped
    pub testable: usize,
    /// passed / testable, as a percentage with one decimal
    pub pass_rate: f64,
    /// testable / total, as a percentage with one decimal
    pub testable_rate: f64,
}

impl ReportSummary {
    /// Any result that should fail a CI run
    pub fn has_failures(&self) -> bool {
        self.failed + self.blocked + self.errors > 0
    }
}

/// Tally statuses into a summary
pub fn calculate_summary<I>(statuses: I) -> ReportSummary
where
    I: IntoIterator<Item = CheckStatus>,
{
    let mut summary = ReportSummary::default();
    for status in statuses {
        summary.total += 1;
        match status {
            CheckStatus::Pass => summary.passed += 1,
            CheckStatus::Fail => summary.failed += 1,
            CheckStatus::Skip => summary.skipped += 1,
            CheckStatus::Blocked => summary.blocked += 1,
            CheckStatus::Error => summary.errors += 1,
        }
    }
    summary.testable = summary.total - summary.skipped;
    summary.pass_rate = percentage(summary.passed, summary.testable);
    summary.testable_rate = percentage(summary.testable, summary.total);
    summary
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let pct = part as f64 / whole as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Keep the first requirement per (kind, suggested value)
pub fn deduplicate_missing_requirements(requirements: &[MissingRequirement]) -> Vec<MissingRequirement> {
    let mut seen: HashSet<(RequirementKind, &str)> = HashSet::new();
    requirements
        .iter()
        .filter(|r| seen.insert((r.kind, r.suggested_value.as_str())))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub name: String,
    pub summary: ReportSummary,
    pub results: Vec<CriterionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub session_id: String,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    pub tool_version: String,
    pub options: RunOptions,
}

impl RunMetadata {
    pub fn new(session_id: impl Into<String>, source_path: Option<PathBuf>, options: RunOptions) -> Self {
        Self {
            session_id: session_id.into(),
            source_path,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            options,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceReport {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub summary: ReportSummary,
    pub sections: Vec<SectionResult>,
    pub flows: Vec<FlowResult>,
    pub missing_requirements: Vec<MissingRequirement>,
    #[serde(default)]
    pub artifacts: ArtifactPaths,
    pub metadata: RunMetadata,
}

impl AcceptanceReport {
    pub fn criterion_results(&self) -> impl Iterator<Item = &CriterionResult> {
        self.sections.iter().flat_map(|s| s.results.iter())
    }
}

/// Everything [`build_report`] needs
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub criterion_results: Vec<CriterionResult>,
    pub flow_results: Vec<FlowResult>,
    pub metadata: RunMetadata,
}

/// Assemble a report. Sections keep the order in which their first result
/// appears; the overall summary covers every criterion and every flow step.
pub fn build_report(input: ReportInput) -> AcceptanceReport {
    let mut sections: Vec<SectionResult> = Vec::new();
    for result in input.criterion_results {
        match sections.iter_mut().find(|s| s.name == result.section) {
            Some(section) => section.results.push(result),
            None => sections.push(SectionResult {
                name: result.section.clone(),
                summary: ReportSummary::default(),
                results: vec![result],
            }),
        }
    }
    for section in &mut sections {
        section.summary = calculate_summary(section.results.iter().map(|r| r.status));
    }

    let summary = calculate_summary(
        sections
            .iter()
            .flat_map(|s| s.results.iter().map(|r| r.status))
            .chain(
                input
                    .flow_results
                    .iter()
                    .flat_map(|f| f.step_results.iter().map(|s| s.status)),
            ),
    );

    let all_requirements: Vec<MissingRequirement> = sections
        .iter()
        .flat_map(|s| s.results.iter())
        .flat_map(|r| r.missing_requirements.iter().cloned())
        .chain(
            input
                .flow_results
                .iter()
                .flat_map(|f| f.step_results.iter())
                .flat_map(|s| s.missing_requirements.iter().cloned()),
        )
        .collect();

    AcceptanceReport {
        title: input.title,
        timestamp: input.started_at,
        duration_ms: input.duration_ms,
        summary,
        sections,
        flows: input.flow_results,
        missing_requirements: deduplicate_missing_requirements(&all_requirements),
        artifacts: ArtifactPaths::default(),
        metadata: input.metadata,
    }
}

/// Copy of `report` with artifact paths attached
pub fn with_artifacts(report: &AcceptanceReport, artifacts: ArtifactPaths) -> AcceptanceReport {
    AcceptanceReport {
        artifacts,
        ..report.clone()
    }
}

/// Persist markdown and pretty JSON through `sink`
pub fn save_report(sink: &dyn ReportSink, report: &AcceptanceReport) -> AcceptanceResult<AcceptanceReport> {
    let markdown = render_markdown(report);
    let json = serde_json::to_string_pretty(report)?;
    let artifacts = sink.persist(&markdown, &json)?;

    if let Some(path) = &artifacts.markdown {
        info!("Markdown report: {}", path.display());
    }
    if let Some(path) = &artifacts.json {
        info!("JSON report: {}", path.display());
    }

    Ok(with_artifacts(report, artifacts))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::CriterionType;
    use crate::result::FlowStepResult;
    use std::sync::Mutex;

    pub(crate) fn criterion_result(id: &str, section: &str, status: CheckStatus) -> CriterionResult {
        CriterionResult {
            criterion_id: id.to_string(),
            description: format!("{} description", id),
            section: section.to_string(),
            subsection: None,
            criterion_type: CriterionType::ElementVisible,
            check_kind: "ui-action".to_string(),
            confidence: 0.6,
            status,
            message: status.to_string(),
            evidence: None,
            missing_requirements: Vec::new(),
            elapsed_ms: 3,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn requirement(kind: RequirementKind, value: &str, owner: &str) -> MissingRequirement {
        MissingRequirement {
            kind,
            element: format!("{} element", value),
            suggested_value: value.to_string(),
            reason: "not found".to_string(),
            owner: owner.to_string(),
        }
    }

    pub(crate) fn input(criteria: Vec<CriterionResult>, flows: Vec<FlowResult>) -> ReportInput {
        ReportInput {
            title: "Login".to_string(),
            started_at: Utc::now(),
            duration_ms: 42,
            criterion_results: criteria,
            flow_results: flows,
            metadata: RunMetadata::new("session-1", None, RunOptions::default()),
        }
    }

    fn flow_with(statuses: &[CheckStatus]) -> FlowResult {
        FlowResult {
            flow_name: "Sign in".to_string(),
            flow_number: 1,
            success: false,
            total_steps: statuses.len(),
            completed_steps: 0,
            aborted_at: None,
            step_results: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| FlowStepResult {
                    step_number: i as u32 + 1,
                    description: "Tap \"Continue\"".to_string(),
                    status: *status,
                    message: String::new(),
                    evidence: None,
                    missing_requirements: Vec::new(),
                    elapsed_ms: 1,
                    timestamp: Utc::now(),
                })
                .collect(),
            duration_ms: 2,
        }
    }

    #[test]
    fn test_summary_rates() {
        let summary = calculate_summary([
            CheckStatus::Pass,
            CheckStatus::Pass,
            CheckStatus::Fail,
            CheckStatus::Skip,
        ]);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.testable, 3);
        assert_eq!(summary.pass_rate, 66.7);
        assert_eq!(summary.testable_rate, 75.0);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_summary_empty_and_all_skipped() {
        let empty = calculate_summary(Vec::<CheckStatus>::new());
        assert_eq!(empty.pass_rate, 0.0);
        assert_eq!(empty.testable_rate, 0.0);

        let skipped = calculate_summary([CheckStatus::Skip, CheckStatus::Skip]);
        assert_eq!(skipped.testable, 0);
        assert_eq!(skipped.pass_rate, 0.0);
        assert!(!skipped.has_failures());
    }

    #[test]
    fn test_dedup_keeps_first_and_is_idempotent() {
        let reqs = vec![
            requirement(RequirementKind::TestId, "login", "visual-1"),
            requirement(RequirementKind::TestId, "login", "visual-2"),
            requirement(RequirementKind::AccessibilityLabel, "login", "visual-1"),
        ];
        let once = deduplicate_missing_requirements(&reqs);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].owner, "visual-1");
        assert_eq!(deduplicate_missing_requirements(&once), once);
    }

    #[test]
    fn test_build_report_groups_and_sums() {
        let mut blocked = criterion_result("visual-2", "Visual", CheckStatus::Blocked);
        blocked.missing_requirements = vec![requirement(RequirementKind::TestId, "login", "visual-2")];
        let report = build_report(input(
            vec![
                criterion_result("visual-1", "Visual", CheckStatus::Pass),
                criterion_result("nav-1", "Navigation", CheckStatus::Skip),
                blocked,
            ],
            vec![flow_with(&[CheckStatus::Pass, CheckStatus::Fail])],
        ));

        assert_eq!(
            report.sections.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            ["Visual", "Navigation"]
        );
        assert_eq!(report.sections[0].summary.total, 2);
        assert_eq!(report.summary.total, 5);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.blocked, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.missing_requirements.len(), 1);
        assert_eq!(report.artifacts, ArtifactPaths::default());
    }

    #[test]
    fn test_with_artifacts_returns_new_value() {
        let report = build_report(input(vec![criterion_result("visual-1", "Visual", CheckStatus::Pass)], vec![]));
        let paths = ArtifactPaths {
            markdown: Some(PathBuf::from("out/report.md")),
            json: Some(PathBuf::from("out/report.json")),
        };
        let patched = with_artifacts(&report, paths.clone());
        assert_eq!(patched.artifacts, paths);
        assert_eq!(report.artifacts, ArtifactPaths::default());
        assert_eq!(patched.summary, report.summary);
    }

    #[derive(Default)]
    struct MemorySink {
        written: Mutex<Option<(String, String)>>,
    }

    impl ReportSink for MemorySink {
        fn persist(&self, markdown: &str, json: &str) -> AcceptanceResult<ArtifactPaths> {
            *self.written.lock().unwrap() = Some((markdown.to_string(), json.to_string()));
            Ok(ArtifactPaths {
                markdown: Some(PathBuf::from("mem/acceptance-report.md")),
                json: Some(PathBuf::from("mem/acceptance-report.json")),
            })
        }
    }

    #[test]
    fn test_save_report_persists_both_formats() {
        let sink = MemorySink::default();
        let report = build_report(input(vec![criterion_result("visual-1", "Visual", CheckStatus::Pass)], vec![]));
        let saved = save_report(&sink, &report).unwrap();

        assert!(saved.artifacts.markdown.is_some());
        let (markdown, json) = sink.written.lock().unwrap().clone().unwrap();
        assert!(markdown.starts_with("# Acceptance Report: Login"));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["passed"], 1);
        assert_eq!(parsed["metadata"]["session_id"], "session-1");
    }
}
