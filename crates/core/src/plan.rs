//! Dry-run planning: classification and mapping without a device
//!
//! A plan shows which check each criterion and flow step would run, how
//! confident the mapping is, and which test hooks are missing before
//! anything is executed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::check::MappedCheck;
use crate::mapper::Mapper;
use crate::model::{
    AcceptanceCriterion, CriterionType, ElementSelector, FlowStep, ParsedCriteria, SelectorStrategy, StepAction,
};
use crate::report::deduplicate_missing_requirements;
use crate::result::{MissingRequirement, RequirementKind};
use crate::selector::infer_test_id;

static OUTCOME_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:opens?|closes?|shows?|hides?|reveals?|toggles?|expands?|collapses?|dismiss(?:es)?|displays?)\b.*$")
        .expect("valid regex")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub criterion_id: String,
    pub section: String,
    pub description: String,
    pub criterion_type: CriterionType,
    pub check: MappedCheck,
    #[serde(default)]
    pub selector: Option<ElementSelector>,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepPlan {
    pub number: u32,
    pub description: String,
    #[serde(default)]
    pub action: Option<StepAction>,
    pub check: MappedCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPlan {
    pub number: u32,
    pub name: String,
    pub steps: Vec<StepPlan>,
}

impl FlowPlan {
    /// Every step maps to a concrete UI action
    pub fn fully_automatable(&self) -> bool {
        self.steps.iter().all(|s| !s.check.is_manual())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    pub title: String,
    pub entries: Vec<PlanEntry>,
    pub flows: Vec<FlowPlan>,
    /// Hooks to add before running, deduplicated
    pub gaps: Vec<MissingRequirement>,
}

impl TestPlan {
    pub fn automatable(&self) -> usize {
        self.entries.iter().filter(|e| !e.check.is_manual()).count()
    }

    pub fn manual(&self) -> usize {
        self.entries.len() - self.automatable()
    }

    /// Mean confidence over automatable entries; 0 when there are none
    pub fn mean_confidence(&self) -> f64 {
        let automatable: Vec<f64> = self
            .entries
            .iter()
            .filter(|e| !e.check.is_manual())
            .map(|e| e.check.confidence())
            .collect();
        if automatable.is_empty() {
            0.0
        } else {
            automatable.iter().sum::<f64>() / automatable.len() as f64
        }
    }
}

pub fn build_plan(parsed: &ParsedCriteria, mapper: &Mapper) -> TestPlan {
    let mut gaps = Vec::new();

    let entries: Vec<PlanEntry> = parsed
        .all_criteria()
        .map(|criterion| {
            let check = mapper.map_criterion_to_check(criterion);
            gaps.extend(criterion_gaps(criterion, &check));
            PlanEntry {
                criterion_id: criterion.id.clone(),
                section: criterion.section.clone(),
                description: criterion.description.clone(),
                criterion_type: criterion.criterion_type,
                check,
                selector: criterion.config.selector.clone(),
                line: criterion.line,
            }
        })
        .collect();

    let flows = parsed
        .flows
        .iter()
        .map(|flow| FlowPlan {
            number: flow.number,
            name: flow.name.clone(),
            steps: flow
                .steps
                .iter()
                .map(|step| {
                    let check = mapper.map_flow_step(step);
                    gaps.extend(step_gap(step, &check));
                    StepPlan {
                        number: step.number,
                        description: step.description.clone(),
                        action: step.action,
                        check,
                    }
                })
                .collect(),
        })
        .collect();

    TestPlan {
        title: parsed.title.clone(),
        entries,
        flows,
        gaps: deduplicate_missing_requirements(&gaps),
    }
}

fn needs_selector(criterion_type: CriterionType) -> bool {
    matches!(
        criterion_type,
        CriterionType::ElementVisible
            | CriterionType::Interaction
            | CriterionType::Modal
            | CriterionType::Navigation
            | CriterionType::Scroll
    )
}

/// Hooks a criterion is already known to lack, before any execution
fn criterion_gaps(criterion: &AcceptanceCriterion, check: &MappedCheck) -> Vec<MissingRequirement> {
    let mut gaps = Vec::new();

    if check.is_manual() && needs_selector(criterion.criterion_type) && criterion.config.selector.is_none() {
        let suggested = infer_test_id(&criterion.description);
        gaps.push(MissingRequirement {
            kind: RequirementKind::TestId,
            element: criterion.description.clone(),
            reason: format!("No selector can be inferred; add testID=\"{}\" to make it checkable", suggested),
            suggested_value: suggested,
            owner: criterion.id.clone(),
        });
    }

    let label_selector = criterion
        .config
        .selector
        .as_ref()
        .filter(|s| s.by == SelectorStrategy::Label);
    if let (Some(selector), CriterionType::Interaction | CriterionType::Modal) =
        (label_selector, criterion.criterion_type)
    {
        gaps.push(MissingRequirement {
            kind: RequirementKind::AccessibilityHint,
            element: selector.value.clone(),
            suggested_value: accessibility_hint(&criterion.description),
            reason: format!(
                "\"{}\" is only identified by its label; an accessibilityHint describes what activating it does",
                selector.value
            ),
            owner: criterion.id.clone(),
        });
    }

    gaps
}

fn step_gap(step: &FlowStep, check: &MappedCheck) -> Option<MissingRequirement> {
    let wants_selector = matches!(step.action, Some(StepAction::Tap | StepAction::Verify));
    if !(check.is_manual() && wants_selector && step.selector.is_none()) {
        return None;
    }
    let suggested = infer_test_id(&step.description);
    Some(MissingRequirement {
        kind: RequirementKind::TestId,
        element: step.description.clone(),
        reason: format!("Step names no locatable element; add testID=\"{}\" and reference it", suggested),
        suggested_value: suggested,
        owner: step.owner_id(),
    })
}

/// "Tapping the avatar opens the profile sheet" -> "Opens the profile sheet"
fn accessibility_hint(description: &str) -> String {
    let clause = OUTCOME_CLAUSE
        .find(description)
        .map(|m| m.as_str())
        .unwrap_or(description)
        .trim()
        .trim_end_matches('.');
    let mut chars = clause.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_criteria;

    const DOC: &str = "\
# Profile

## Header
- [ ] Avatar is visible
- [ ] Tapping the avatar opens the profile sheet
- [ ] A spinner is visible
- [ ] Background color is #FFFFFF

## Test Flows

### Flow 1: Edit
1. Tap \"Edit\"
2. Tap somewhere empty
3. Observe the animation
";

    #[test]
    fn test_plan_counts() {
        let plan = build_plan(&parse_criteria(DOC), &Mapper::default());
        assert_eq!(plan.entries.len(), 4);
        assert_eq!(plan.automatable(), 3);
        assert_eq!(plan.manual(), 1);
        assert_eq!(plan.flows.len(), 1);
        assert!(!plan.flows[0].fully_automatable());
    }

    #[test]
    fn test_plan_gaps() {
        let plan = build_plan(&parse_criteria(DOC), &Mapper::default());
        let kinds: Vec<(RequirementKind, &str)> = plan
            .gaps
            .iter()
            .map(|g| (g.kind, g.owner.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (RequirementKind::AccessibilityHint, "header-2"),
                (RequirementKind::TestId, "header-3"),
                (RequirementKind::TestId, "flow-step-2"),
            ]
        );
        assert_eq!(plan.gaps[0].suggested_value, "Opens the profile sheet");
        assert_eq!(plan.gaps[1].suggested_value, "spinner");
    }

    #[test]
    fn test_mean_confidence_empty() {
        let plan = build_plan(&parse_criteria("# Empty\n"), &Mapper::default());
        assert_eq!(plan.mean_confidence(), 0.0);
    }
}
