//! CLI Commands

pub mod config;
pub mod parse;
pub mod plan;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use uatkit_core::{discover_documents, parse_criteria_file, ParsedCriteria};

/// Parse one document, or every `.md` file under a directory
pub fn load_documents(path: &Path) -> Result<Vec<ParsedCriteria>> {
    let files = if path.is_dir() {
        let files = discover_documents(path)
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        if files.is_empty() {
            anyhow::bail!("No markdown documents found under {}", path.display());
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    files
        .iter()
        .map(|file| {
            debug!("Parsing {}", file.display());
            parse_criteria_file(file).with_context(|| format!("Failed to parse {}", file.display()))
        })
        .collect()
}

/// Label for a document in multi-document output
pub fn document_label(doc: &ParsedCriteria) -> String {
    match &doc.source_path {
        Some(path) => format!("{} ({})", doc.title, path.display()),
        None => doc.title.clone(),
    }
}
