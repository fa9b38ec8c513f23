//! Parse Command
//!
//! Shows how a criteria document was read: sections, classified criteria
//! and test flows.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::{document_label, load_documents};
use crate::output::{print_heading, print_info, print_list, print_value, truncate, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ParseArgs {
    /// Criteria document or directory of documents
    pub path: PathBuf,
}

#[derive(Serialize)]
pub struct CriterionRow {
    pub id: String,
    pub criterion_type: String,
    pub description: String,
    pub selector: Option<String>,
    pub line: usize,
    pub checked: bool,
}

impl TableDisplay for CriterionRow {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Type", "Description", "Selector", "Line", "Done"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.criterion_type.clone(),
            truncate(&self.description, 60),
            self.selector.clone().unwrap_or_else(|| "-".to_string()),
            self.line.to_string(),
            if self.checked { "x".to_string() } else { String::new() },
        ]
    }
}

#[derive(Serialize)]
pub struct StepRow {
    pub flow: String,
    pub step: u32,
    pub action: Option<String>,
    pub selector: Option<String>,
    pub expected: Option<String>,
}

impl TableDisplay for StepRow {
    fn headers() -> Vec<&'static str> {
        vec!["Flow", "Step", "Action", "Selector", "Expected"]
    }

    fn row(&self) -> Vec<String> {
        let dash = || "-".to_string();
        vec![
            self.flow.clone(),
            self.step.to_string(),
            self.action.clone().unwrap_or_else(dash),
            self.selector.clone().unwrap_or_else(dash),
            self.expected.as_deref().map(|e| truncate(e, 40)).unwrap_or_else(dash),
        ]
    }
}

pub async fn execute(args: ParseArgs, format: OutputFormat) -> Result<()> {
    let documents = load_documents(&args.path)?;

    if format.is_structured() {
        print_value(&documents, format);
        return Ok(());
    }

    for doc in &documents {
        print_heading(&document_label(doc));
        print_info(&format!(
            "{} section(s), {} criteria, {} flow(s)",
            doc.sections.len(),
            doc.total_criteria,
            doc.flows.len()
        ));

        let criteria: Vec<CriterionRow> = doc
            .all_criteria()
            .map(|c| CriterionRow {
                id: c.id.clone(),
                criterion_type: c.criterion_type.to_string(),
                description: c.description.clone(),
                selector: c.config.selector.as_ref().map(|s| s.to_string()),
                line: c.line,
                checked: c.checked,
            })
            .collect();
        print_list(&criteria, format);

        let steps: Vec<StepRow> = doc
            .flows
            .iter()
            .flat_map(|flow| {
                flow.steps.iter().map(move |step| StepRow {
                    flow: format!("{}: {}", flow.number, flow.name),
                    step: step.number,
                    action: step.action.map(|a| a.to_string()),
                    selector: step.selector.as_ref().map(|s| s.to_string()),
                    expected: step.expected.clone(),
                })
            })
            .collect();
        if !steps.is_empty() {
            print_heading("Test flows");
            print_list(&steps, format);
        }
    }

    Ok(())
}
