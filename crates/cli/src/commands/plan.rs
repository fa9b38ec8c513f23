//! Plan Command
//!
//! Dry run: which check each criterion and flow step would become, and
//! which test hooks are missing, without touching a device.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use uatkit_core::{build_plan, MappedCheck, Mapper, MissingRequirement, TestPlan};

use super::{document_label, load_documents};
use crate::config::UatConfig;
use crate::output::{print_heading, print_info, print_list, print_value, print_warning, truncate, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct PlanArgs {
    /// Criteria document or directory of documents
    pub path: PathBuf,
}

#[derive(Serialize)]
pub struct PlanRow {
    pub id: String,
    pub criterion_type: String,
    pub check: String,
    pub confidence: f64,
    pub detail: String,
}

impl TableDisplay for PlanRow {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Type", "Check", "Confidence", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.criterion_type.clone(),
            self.check.clone(),
            format!("{:.2}", self.confidence),
            truncate(&self.detail, 60),
        ]
    }
}

#[derive(Serialize)]
pub struct GapRow {
    pub kind: String,
    pub suggested_value: String,
    pub owner: String,
    pub element: String,
}

impl From<&MissingRequirement> for GapRow {
    fn from(req: &MissingRequirement) -> Self {
        Self {
            kind: req.kind.to_string(),
            suggested_value: req.suggested_value.clone(),
            owner: req.owner.clone(),
            element: req.element.clone(),
        }
    }
}

impl TableDisplay for GapRow {
    fn headers() -> Vec<&'static str> {
        vec!["Add", "Value", "For", "Element"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.kind.clone(),
            self.suggested_value.clone(),
            self.owner.clone(),
            truncate(&self.element, 50),
        ]
    }
}

/// What a mapped check would do, in a few words
fn check_detail(check: &MappedCheck) -> String {
    match check {
        MappedCheck::UiAction { actions, .. } => actions
            .iter()
            .map(|a| a.label())
            .collect::<Vec<_>>()
            .join(" → "),
        MappedCheck::Visual { .. } => "full-screen screenshot".to_string(),
        MappedCheck::ScreenshotAnalysis { color_hex, target, .. } => {
            format!("screenshot, {} color {}", target, color_hex)
        }
        MappedCheck::Manual { reason } => reason.clone(),
    }
}

pub async fn execute(args: PlanArgs, config: &UatConfig, format: OutputFormat) -> Result<()> {
    let documents = load_documents(&args.path)?;
    let mapper = Mapper::new(config.confidence.clone()).with_default_wait(config.executor.timing.default_wait_ms);
    let plans: Vec<TestPlan> = documents.iter().map(|doc| build_plan(doc, &mapper)).collect();

    if format.is_structured() {
        print_value(&plans, format);
        return Ok(());
    }

    for (doc, plan) in documents.iter().zip(&plans) {
        print_heading(&document_label(doc));

        let rows: Vec<PlanRow> = plan
            .entries
            .iter()
            .map(|e| PlanRow {
                id: e.criterion_id.clone(),
                criterion_type: e.criterion_type.to_string(),
                check: e.check.kind().to_string(),
                confidence: e.check.confidence(),
                detail: check_detail(&e.check),
            })
            .collect();
        print_list(&rows, format);

        let steps: Vec<PlanRow> = plan
            .flows
            .iter()
            .flat_map(|flow| {
                flow.steps.iter().map(move |step| PlanRow {
                    id: format!("flow {}.{}", flow.number, step.number),
                    criterion_type: step.action.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
                    check: step.check.kind().to_string(),
                    confidence: step.check.confidence(),
                    detail: check_detail(&step.check),
                })
            })
            .collect();
        if !steps.is_empty() {
            print_heading("Test flows");
            print_list(&steps, format);
        }

        print_info(&format!(
            "{} of {} criteria automatable, mean confidence {:.2}",
            plan.automatable(),
            plan.entries.len(),
            plan.mean_confidence()
        ));

        if !plan.gaps.is_empty() {
            print_warning(&format!("{} test hook(s) missing", plan.gaps.len()));
            let gaps: Vec<GapRow> = plan.gaps.iter().map(GapRow::from).collect();
            print_list(&gaps, format);
        }
    }

    Ok(())
}
