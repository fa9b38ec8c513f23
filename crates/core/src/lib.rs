//! uatkit acceptance-criteria pipeline
//!
//! This crate turns markdown acceptance criteria into executable checks for a
//! live mobile app session:
//! - Parses criteria documents into sections, criteria and test flows
//! - Classifies each criterion and infers element selectors with a confidence
//! - Maps criteria and flow steps to UI actions, screenshot checks or manual work
//! - Runs checks through pluggable collaborators and classifies failures
//! - Aggregates results into a report with missing test-hook suggestions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Acceptance Pipeline (Rust)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  parse_criteria(markdown) -> ParsedCriteria                 │
//! │    ├── sections -> subsections -> AcceptanceCriterion       │
//! │    │     └── classify_criterion_type / extract_check_config │
//! │    └── flows -> FlowStep (action, selector, expected)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Mapper (ConfidenceTable)                                   │
//! │    ├── map_criterion_to_check -> MappedCheck                │
//! │    └── map_flow_step -> MappedCheck                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AcceptanceRunner                                           │
//! │    ├── SessionGate::is_ready()            (once)            │
//! │    ├── Checker -> CriterionResult         (per criterion)   │
//! │    ├── FlowRunner -> FlowResult           (per flow)        │
//! │    └── build_report -> AcceptanceReport                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Ports: UiActionExecutor, ScreenshotCapture, ReportSink     │
//! │    └── process: CommandExecutor, CommandScreenshotter, ...  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod check;
pub mod checker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod flow;
pub mod mapper;
pub mod markdown;
pub mod model;
pub mod parser;
pub mod plan;
pub mod ports;
pub mod process;
pub mod report;
pub mod result;
pub mod runner;
pub mod selector;
pub mod sink;

#[cfg(test)]
mod testing;

pub use check::{MappedCheck, UiAction, VisualCompare};
pub use checker::{analyze_failure, generate_missing_requirements, Checker, FailureAnalysis};
pub use classifier::{classify_criterion_type, extract_check_config, parse_flow_step, CLASSIFICATION_RULES};
pub use config::{ConfidenceTable, ExecutionConfig};
pub use error::{AcceptanceError, AcceptanceResult};
pub use flow::{FlowOptions, FlowRunner};
pub use mapper::Mapper;
pub use markdown::render_markdown;
pub use model::{
    AcceptanceCriterion, CheckConfig, CriteriaSection, CriteriaSubsection, CriterionType, ElementSelector,
    FlowStep, ParsedCriteria, SelectorStrategy, StepAction, TestFlow,
};
pub use parser::{discover_documents, extract_flows, parse_criteria, parse_criteria_file};
pub use plan::{build_plan, TestPlan};
pub use ports::{
    AlwaysReady, ArtifactPaths, ExecutionOutcome, ReportSink, Screenshot, ScreenshotCapture, SessionGate,
    UiActionExecutor,
};
pub use process::{CommandExecutor, CommandGate, CommandScreenshotter};
pub use report::{
    build_report, calculate_summary, deduplicate_missing_requirements, save_report, with_artifacts,
    AcceptanceReport, ReportInput, ReportSummary, RunMetadata, SectionResult,
};
pub use result::{CheckStatus, CriterionResult, Evidence, FlowResult, FlowStepResult, MissingRequirement, RequirementKind};
pub use runner::{AcceptanceRunner, RunOptions};
pub use selector::{infer_selector_from_description, infer_test_id};
pub use sink::FsReportSink;
