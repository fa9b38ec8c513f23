//! Markdown acceptance-criteria parsing
//!
//! The grammar is deliberately forgiving: anything that does not match a
//! known construct is skipped, never rejected.
//!
//! ```text
//! # Title                         first H1 wins
//! ## Overview / Prerequisites     reserved, not criteria sections
//! ## Section
//! ### Subsection
//! - [ ] criterion                 attached to subsection, else section
//! ## Test Flows
//! ### Flow 1: Name
//! 1. step
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::classifier::{classify_criterion_type, extract_check_config, parse_flow_step};
use crate::error::{AcceptanceError, AcceptanceResult};
use crate::model::{AcceptanceCriterion, CriteriaSection, CriteriaSubsection, ParsedCriteria, TestFlow};
use crate::selector::slugify;

/// H2 names (case-insensitive substrings) that never hold criteria
pub const RESERVED_SECTIONS: &[&str] = &[
    "overview",
    "prerequisites",
    "test flows",
    "test flows summary",
    "sign-off",
];

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("valid regex"));
static CHECKBOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+]\s+\[([ xX])\]\s+(.+?)\s*$").expect("valid regex"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s+)?(.+?)\s*$").expect("valid regex")
});
static FLOW_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^flow\s+(\d+)\b\s*(?:[:\-–—]\s*)?(.*)$").expect("valid regex")
});
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)[.)]\s+(.+?)\s*$").expect("valid regex"));

fn heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let text = caps.get(2)?.as_str();
    Some((level, text))
}

fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_SECTIONS.iter().any(|reserved| lower.contains(reserved))
}

fn is_flows_block(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("test flows") && !lower.contains("summary")
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MetaBlock {
    Overview,
    Prerequisites,
    Other,
}

/// Assigns `slug(section)[-slug(subsection)]-n`, counting per prefix so
/// repeated section names still get distinct ids.
#[derive(Default)]
struct IdAllocator {
    counters: HashMap<String, usize>,
}

impl IdAllocator {
    fn next(&mut self, section: &str, subsection: Option<&str>) -> String {
        let mut prefix = non_empty_slug(section, "section");
        if let Some(sub) = subsection {
            prefix.push('-');
            prefix.push_str(&non_empty_slug(sub, "subsection"));
        }
        let counter = self.counters.entry(prefix.clone()).or_insert(0);
        *counter += 1;
        format!("{}-{}", prefix, counter)
    }
}

fn non_empty_slug(text: &str, fallback: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Parse an acceptance-criteria document held in memory.
pub fn parse_criteria(markdown: &str) -> ParsedCriteria {
    let mut title: Option<String> = None;
    let mut overview: Vec<String> = Vec::new();
    let mut prerequisites: Vec<String> = Vec::new();
    let mut sections: Vec<CriteriaSection> = Vec::new();
    let mut ids = IdAllocator::default();

    // Set while inside a reserved H2
    let mut meta: Option<MetaBlock> = None;
    let mut in_section = false;
    let mut in_subsection = false;

    for (index, line) in markdown.lines().enumerate() {
        let line_number = index + 1;

        if let Some((level, text)) = heading(line) {
            match level {
                1 => {
                    if title.is_none() {
                        title = Some(text.to_string());
                    }
                }
                2 => {
                    in_subsection = false;
                    if is_reserved(text) {
                        in_section = false;
                        let lower = text.to_lowercase();
                        meta = Some(if lower.contains("overview") {
                            MetaBlock::Overview
                        } else if lower.contains("prerequisites") {
                            MetaBlock::Prerequisites
                        } else {
                            MetaBlock::Other
                        });
                    } else {
                        meta = None;
                        in_section = true;
                        sections.push(CriteriaSection::new(text));
                    }
                }
                3 => {
                    if in_section && !FLOW_HEADER.is_match(text) {
                        if let Some(section) = sections.last_mut() {
                            section.subsections.push(CriteriaSubsection {
                                name: text.to_string(),
                                criteria: Vec::new(),
                            });
                            in_subsection = true;
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        match meta {
            Some(MetaBlock::Overview) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    overview.push(trimmed.to_string());
                }
                continue;
            }
            Some(MetaBlock::Prerequisites) => {
                if let Some(caps) = LIST_ITEM.captures(line) {
                    prerequisites.push(caps[1].to_string());
                }
                continue;
            }
            Some(MetaBlock::Other) => continue,
            None => {}
        }

        let Some(caps) = CHECKBOX.captures(line) else {
            continue;
        };
        if !in_section {
            continue;
        }
        let Some(section) = sections.last_mut() else {
            continue;
        };

        let description = caps[2].to_string();
        let checked = !caps[1].trim().is_empty();
        let subsection_name = if in_subsection {
            section.subsections.last().map(|s| s.name.clone())
        } else {
            None
        };
        let criterion = AcceptanceCriterion {
            id: ids.next(&section.name, subsection_name.as_deref()),
            section: section.name.clone(),
            subsection: subsection_name.clone(),
            criterion_type: classify_criterion_type(&description),
            config: extract_check_config(&description),
            description,
            line: line_number,
            checked,
        };

        match (subsection_name, section.subsections.last_mut()) {
            (Some(_), Some(subsection)) => subsection.criteria.push(criterion),
            _ => section.criteria.push(criterion),
        }
    }

    let flows = extract_flows(markdown);
    let total_criteria = sections.iter().map(CriteriaSection::criteria_count).sum();
    let title = title.unwrap_or_else(|| "Untitled".to_string());

    debug!(
        "Parsed '{}': {} section(s), {} criteria, {} flow(s)",
        title,
        sections.len(),
        total_criteria,
        flows.len()
    );

    ParsedCriteria {
        title,
        overview: if overview.is_empty() {
            None
        } else {
            Some(overview.join(" "))
        },
        prerequisites,
        sections,
        flows,
        total_criteria,
        source_path: None,
        raw: markdown.to_string(),
    }
}

/// Pull `### Flow <n>: <name>` blocks and their numbered steps out of the
/// `## Test Flows` section.
pub fn extract_flows(markdown: &str) -> Vec<TestFlow> {
    let mut flows: Vec<TestFlow> = Vec::new();
    let mut in_block = false;
    let mut in_flow = false;

    for line in markdown.lines() {
        if let Some((level, text)) = heading(line) {
            match level {
                1 | 2 => {
                    in_block = level == 2 && is_flows_block(text);
                    in_flow = false;
                }
                3 if in_block => {
                    in_flow = false;
                    if let Some(caps) = FLOW_HEADER.captures(text) {
                        let number: u32 = caps[1].parse().unwrap_or(flows.len() as u32 + 1);
                        let name = caps[2].trim();
                        flows.push(TestFlow {
                            number,
                            name: if name.is_empty() {
                                format!("Flow {}", number)
                            } else {
                                name.to_string()
                            },
                            steps: Vec::new(),
                        });
                        in_flow = true;
                    }
                }
                _ => {}
            }
            continue;
        }

        if !in_flow {
            continue;
        }
        if let (Some(caps), Some(flow)) = (NUMBERED.captures(line), flows.last_mut()) {
            let number: u32 = caps[1].parse().unwrap_or(flow.steps.len() as u32 + 1);
            flow.steps.push(parse_flow_step(number, &caps[2]));
        }
    }

    flows
}

/// Read and parse a document from disk.
///
/// A source that cannot be read for any reason (missing, permissions, a
/// directory, not UTF-8) is reported as [`AcceptanceError::SourceNotFound`].
pub fn parse_criteria_file(path: &Path) -> AcceptanceResult<ParsedCriteria> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        debug!("Cannot read {}: {}", path.display(), e);
        AcceptanceError::SourceNotFound(path.to_path_buf())
    })?;
    let mut parsed = parse_criteria(&content);
    parsed.source_path = Some(path.to_path_buf());
    Ok(parsed)
}

/// All markdown documents under `dir`, sorted by path.
pub fn discover_documents(dir: &Path) -> AcceptanceResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(AcceptanceError::SourceNotFound(dir.to_path_buf()));
    }

    let mut documents: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("md"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    documents.sort();

    Ok(documents)
}
