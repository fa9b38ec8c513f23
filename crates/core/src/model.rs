//! Parsed acceptance-criteria document types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A fully parsed acceptance-criteria document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedCriteria {
    pub title: String,

    #[serde(default)]
    pub overview: Option<String>,

    #[serde(default)]
    pub prerequisites: Vec<String>,

    pub sections: Vec<CriteriaSection>,

    #[serde(default)]
    pub flows: Vec<TestFlow>,

    /// Sum of direct and subsection criteria across all sections
    pub total_criteria: usize,

    /// Path the document was read from, when parsed from disk
    #[serde(default)]
    pub source_path: Option<PathBuf>,

    #[serde(skip)]
    pub raw: String,
}

impl ParsedCriteria {
    /// All criteria in document order
    pub fn all_criteria(&self) -> impl Iterator<Item = &AcceptanceCriterion> {
        self.sections.iter().flat_map(CriteriaSection::all_criteria)
    }

    /// Look up a flow by name (case-insensitive)
    pub fn flow(&self, name: &str) -> Option<&TestFlow> {
        self.flows.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaSection {
    pub name: String,
    #[serde(default)]
    pub subsections: Vec<CriteriaSubsection>,
    #[serde(default)]
    pub criteria: Vec<AcceptanceCriterion>,
}

impl CriteriaSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subsections: Vec::new(),
            criteria: Vec::new(),
        }
    }

    /// Direct criteria first, then each subsection's criteria
    pub fn all_criteria(&self) -> impl Iterator<Item = &AcceptanceCriterion> {
        self.criteria
            .iter()
            .chain(self.subsections.iter().flat_map(|s| s.criteria.iter()))
    }

    pub fn criteria_count(&self) -> usize {
        self.criteria.len() + self.subsections.iter().map(|s| s.criteria.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaSubsection {
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<AcceptanceCriterion>,
}

/// One human-authored testable statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    /// slug(section)[-slug(subsection)]-ordinal
    pub id: String,
    pub section: String,
    #[serde(default)]
    pub subsection: Option<String>,
    pub description: String,
    pub criterion_type: CriterionType,
    pub config: CheckConfig,
    /// 1-based line in the source document
    pub line: usize,
    /// Whether the checkbox was ticked (`- [x]`)
    #[serde(default)]
    pub checked: bool,
}

/// Semantic category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    ElementVisible,
    ElementText,
    ElementColor,
    Interaction,
    Modal,
    Navigation,
    Scroll,
    StateChange,
    Layout,
    Manual,
}

impl CriterionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionType::ElementVisible => "element_visible",
            CriterionType::ElementText => "element_text",
            CriterionType::ElementColor => "element_color",
            CriterionType::Interaction => "interaction",
            CriterionType::Modal => "modal",
            CriterionType::Navigation => "navigation",
            CriterionType::Scroll => "scroll",
            CriterionType::StateChange => "state_change",
            CriterionType::Layout => "layout",
            CriterionType::Manual => "manual",
        }
    }
}

impl std::fmt::Display for CriterionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to locate a UI element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSelector {
    pub by: SelectorStrategy,
    pub value: String,
    /// Heuristic estimate in [0, 1]
    pub confidence: f64,
}

impl ElementSelector {
    pub fn new(by: SelectorStrategy, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            by,
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn by_id(value: impl Into<String>, confidence: f64) -> Self {
        Self::new(SelectorStrategy::Id, value, confidence)
    }

    pub fn by_text(value: impl Into<String>, confidence: f64) -> Self {
        Self::new(SelectorStrategy::Text, value, confidence)
    }

    pub fn by_label(value: impl Into<String>, confidence: f64) -> Self {
        Self::new(SelectorStrategy::Label, value, confidence)
    }
}

impl std::fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.by, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStrategy {
    Id,
    Text,
    Label,
}

impl std::fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorStrategy::Id => write!(f, "id"),
            SelectorStrategy::Text => write!(f, "text"),
            SelectorStrategy::Label => write!(f, "label"),
        }
    }
}

/// Parameters extracted from a criterion description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub selector: Option<ElementSelector>,
    #[serde(default)]
    pub expected_text: Option<String>,
    #[serde(default)]
    pub text_match: TextMatch,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub color_target: Option<ColorTarget>,
    #[serde(default)]
    pub interaction: Option<InteractionKind>,
    #[serde(default)]
    pub swipe_direction: Option<SwipeDirection>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    Exact,
    #[default]
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTarget {
    Background,
    Text,
    Border,
    Icon,
}

impl std::fmt::Display for ColorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorTarget::Background => write!(f, "background"),
            ColorTarget::Text => write!(f, "text"),
            ColorTarget::Border => write!(f, "border"),
            ColorTarget::Icon => write!(f, "icon"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Tap,
    LongPress,
    Swipe,
    Scroll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl std::fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwipeDirection::Up => write!(f, "up"),
            SwipeDirection::Down => write!(f, "down"),
            SwipeDirection::Left => write!(f, "left"),
            SwipeDirection::Right => write!(f, "right"),
        }
    }
}

/// A named user journey of ordered steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFlow {
    pub number: u32,
    pub name: String,
    pub steps: Vec<FlowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    pub number: u32,
    pub description: String,
    #[serde(default)]
    pub action: Option<StepAction>,
    #[serde(default)]
    pub selector: Option<ElementSelector>,
    #[serde(default)]
    pub expected: Option<String>,
}

impl FlowStep {
    /// Owner id used for missing requirements raised by this step
    pub fn owner_id(&self) -> String {
        format!("flow-step-{}", self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Tap,
    Type,
    Swipe,
    Verify,
    Wait,
    Navigate,
    Login,
    Observe,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepAction::Tap => "tap",
            StepAction::Type => "type",
            StepAction::Swipe => "swipe",
            StepAction::Verify => "verify",
            StepAction::Wait => "wait",
            StepAction::Navigate => "navigate",
            StepAction::Login => "login",
            StepAction::Observe => "observe",
        };
        f.write_str(s)
    }
}
