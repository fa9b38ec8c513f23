//! Tunable constants for mapping and execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::CriterionType;

/// Confidence factors applied when a criterion is mapped to a check.
///
/// Selector-driven checks multiply the selector's confidence by the factor
/// for their type; `color` and `layout` are fixed values because those
/// checks do not depend on a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTable {
    pub element_visible: f64,
    pub element_text: f64,
    /// Used instead of a selector confidence when only the literal text is known
    pub text_only: f64,
    pub interaction: f64,
    pub modal: f64,
    pub navigation: f64,
    pub scroll: f64,
    pub element_color: f64,
    pub layout: f64,
    /// Flow steps that need no selector (wait, swipe without a target)
    pub flow_unanchored: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            element_visible: 1.0,
            element_text: 1.0,
            text_only: 0.5,
            interaction: 0.9,
            modal: 0.8,
            navigation: 0.7,
            scroll: 0.6,
            element_color: 0.6,
            layout: 0.5,
            flow_unanchored: 0.8,
        }
    }
}

impl ConfidenceTable {
    /// Factor for a criterion type; `0.0` for types that always map to manual
    pub fn for_type(&self, criterion_type: CriterionType) -> f64 {
        match criterion_type {
            CriterionType::ElementVisible => self.element_visible,
            CriterionType::ElementText => self.element_text,
            CriterionType::ElementColor => self.element_color,
            CriterionType::Interaction => self.interaction,
            CriterionType::Modal => self.modal,
            CriterionType::Navigation => self.navigation,
            CriterionType::Scroll => self.scroll,
            CriterionType::Layout => self.layout,
            CriterionType::StateChange | CriterionType::Manual => 0.0,
        }
    }

    /// `base * factor(type)`, clamped to [0, 1]
    pub fn scaled(&self, criterion_type: CriterionType, base: f64) -> f64 {
        clamp_confidence(base * self.for_type(criterion_type))
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Timeouts and evidence policy for the execution phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout for a single criterion check
    pub criterion_timeout_ms: u64,

    /// Timeout for a single flow step
    pub flow_step_timeout_ms: u64,

    /// Wait used by `Wait` steps that carry no duration
    pub default_wait_ms: u64,

    /// Capture a screenshot after every passing criterion
    pub capture_evidence: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            criterion_timeout_ms: 30_000,
            flow_step_timeout_ms: 15_000,
            default_wait_ms: 1_000,
            capture_evidence: false,
        }
    }
}

impl ExecutionConfig {
    pub fn criterion_timeout(&self) -> Duration {
        Duration::from_millis(self.criterion_timeout_ms)
    }

    pub fn flow_step_timeout(&self) -> Duration {
        Duration::from_millis(self.flow_step_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_defaults() {
        let table = ConfidenceTable::default();
        assert_eq!(table.for_type(CriterionType::Interaction), 0.9);
        assert_eq!(table.for_type(CriterionType::Modal), 0.8);
        assert_eq!(table.for_type(CriterionType::Navigation), 0.7);
        assert_eq!(table.for_type(CriterionType::Scroll), 0.6);
        assert_eq!(table.for_type(CriterionType::Manual), 0.0);
    }

    #[test]
    fn test_scaled_is_clamped() {
        let table = ConfidenceTable {
            interaction: 3.0,
            ..Default::default()
        };
        assert_eq!(table.scaled(CriterionType::Interaction, 0.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn test_partial_table_deserializes_with_defaults() {
        let table: ConfidenceTable = serde_json::from_str(r#"{"modal": 0.5}"#).unwrap();
        assert_eq!(table.modal, 0.5);
        assert_eq!(table.navigation, 0.7);
    }
}
