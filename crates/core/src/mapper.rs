//! Mapping classified criteria and flow steps to executable checks

use once_cell::sync::Lazy;
use regex::Regex;

use crate::check::{MappedCheck, UiAction, VisualCompare};
use crate::classifier::{duration_ms, swipe_direction};
use crate::config::{clamp_confidence, ConfidenceTable};
use crate::model::{
    AcceptanceCriterion, ColorTarget, CriterionType, ElementSelector, FlowStep, InteractionKind,
    StepAction, SwipeDirection,
};
use crate::selector::first_quoted_literal;

/// Number directly after the wait verb, with the word that follows it
static WAIT_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:wait|pause)\s+(?:for\s+)?(\d+(?:\.\d+)?)\s*([a-z]+)?").expect("valid regex")
});

fn is_wait_unit(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "ms" | "millisecond" | "milliseconds" | "s" | "sec" | "secs" | "second" | "seconds"
    )
}

/// Leading duration of a wait step. A following word that is not a known
/// unit makes the number something other than a duration.
fn leading_wait_ms(text: &str) -> Option<u64> {
    let caps = WAIT_DURATION.captures(text)?;
    match caps.get(2).map(|m| m.as_str()) {
        Some(unit) if !is_wait_unit(unit) => None,
        unit => duration_ms(&caps[1], unit),
    }
}

/// Turns criteria and flow steps into [`MappedCheck`]s
#[derive(Debug, Clone)]
pub struct Mapper {
    confidence: ConfidenceTable,
    default_wait_ms: u64,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(ConfidenceTable::default())
    }
}

impl Mapper {
    pub fn new(confidence: ConfidenceTable) -> Self {
        Self {
            confidence,
            default_wait_ms: 1_000,
        }
    }

    /// Duration for `Wait` steps that do not state one
    pub fn with_default_wait(mut self, ms: u64) -> Self {
        self.default_wait_ms = ms;
        self
    }

    /// Map a classified criterion to a check, falling back to manual when
    /// the description lacks what the check needs.
    pub fn map_criterion_to_check(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        match criterion.criterion_type {
            CriterionType::ElementVisible => self.map_visibility(criterion),
            CriterionType::ElementText => self.map_text(criterion),
            CriterionType::ElementColor => self.map_color(criterion),
            CriterionType::Interaction => self.map_interaction(criterion),
            CriterionType::Modal => self.map_modal(criterion),
            CriterionType::Navigation => self.map_navigation(criterion),
            CriterionType::Scroll => self.map_scroll(criterion),
            CriterionType::StateChange => self.map_state_change(criterion),
            CriterionType::Layout => self.map_layout(criterion),
            CriterionType::Manual => {
                MappedCheck::manual("Criterion could not be classified for automation")
            }
        }
    }

    fn map_visibility(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let Some(selector) = criterion.config.selector.clone() else {
            return no_selector("visibility");
        };
        let confidence = self.confidence.scaled(CriterionType::ElementVisible, selector.confidence);
        self.ui_action(criterion, vec![UiAction::AssertVisible { selector }], confidence)
    }

    fn map_text(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let config = &criterion.config;
        let Some(text) = config.expected_text.clone() else {
            return MappedCheck::manual("No expected text found in the description");
        };
        match config.selector.clone() {
            Some(selector) => {
                let confidence = self.confidence.scaled(CriterionType::ElementText, selector.confidence);
                let action = UiAction::AssertText {
                    selector,
                    text,
                    mode: config.text_match,
                };
                self.ui_action(criterion, vec![action], confidence)
            }
            None => {
                let confidence = clamp_confidence(self.confidence.text_only);
                let selector = ElementSelector::by_text(text, confidence);
                self.ui_action(criterion, vec![UiAction::AssertVisible { selector }], confidence)
            }
        }
    }

    fn map_color(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let config = &criterion.config;
        let Some(color_hex) = config.color_hex.clone() else {
            return MappedCheck::manual("No hex color found in the description");
        };
        MappedCheck::ScreenshotAnalysis {
            name: criterion.id.clone(),
            color_hex,
            target: config.color_target.unwrap_or(ColorTarget::Background),
            selector: config.selector.clone(),
            confidence: clamp_confidence(self.confidence.element_color),
        }
    }

    fn map_interaction(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let config = &criterion.config;
        let Some(selector) = config.selector.clone() else {
            return no_selector("interaction");
        };
        let confidence = self.confidence.scaled(CriterionType::Interaction, selector.confidence);
        let action = match config.interaction.unwrap_or(InteractionKind::Tap) {
            InteractionKind::Tap => UiAction::TapOn { selector },
            InteractionKind::LongPress => UiAction::LongPressOn { selector },
            InteractionKind::Swipe => UiAction::Swipe {
                direction: config.swipe_direction.unwrap_or_default(),
                selector: Some(selector),
            },
            InteractionKind::Scroll => UiAction::ScrollUntilVisible {
                direction: config.swipe_direction.unwrap_or(SwipeDirection::Down),
                selector,
            },
        };
        self.ui_action(criterion, vec![action], confidence)
    }

    fn map_modal(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let Some(selector) = criterion.config.selector.clone() else {
            return no_selector("modal trigger");
        };
        let confidence = self.confidence.scaled(CriterionType::Modal, selector.confidence);
        self.ui_action(criterion, vec![UiAction::TapOn { selector }], confidence)
    }

    fn map_navigation(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let Some(selector) = criterion.config.selector.clone() else {
            return no_selector("navigation trigger");
        };
        let confidence = self.confidence.scaled(CriterionType::Navigation, selector.confidence);
        self.ui_action(criterion, vec![UiAction::TapOn { selector }], confidence)
    }

    fn map_scroll(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        let config = &criterion.config;
        let Some(selector) = config.selector.clone() else {
            return no_selector("scroll target");
        };
        let confidence = self.confidence.scaled(CriterionType::Scroll, selector.confidence);
        let action = UiAction::ScrollUntilVisible {
            direction: config.swipe_direction.unwrap_or(SwipeDirection::Down),
            selector,
        };
        self.ui_action(criterion, vec![action], confidence)
    }

    fn map_state_change(&self, _criterion: &AcceptanceCriterion) -> MappedCheck {
        MappedCheck::manual("State changes need a triggering action; describe them as a test flow")
    }

    fn map_layout(&self, criterion: &AcceptanceCriterion) -> MappedCheck {
        MappedCheck::Visual {
            name: criterion.id.clone(),
            compare: VisualCompare::default(),
            confidence: clamp_confidence(self.confidence.layout),
        }
    }

    fn ui_action(&self, criterion: &AcceptanceCriterion, actions: Vec<UiAction>, confidence: f64) -> MappedCheck {
        MappedCheck::UiAction {
            name: criterion.id.clone(),
            actions,
            confidence: clamp_confidence(confidence),
        }
    }

    /// Map one flow step. Steps whose action has no concrete UI operation
    /// come back as [`MappedCheck::Manual`].
    pub fn map_flow_step(&self, step: &FlowStep) -> MappedCheck {
        let name = step.owner_id();
        let Some(action) = step.action else {
            return MappedCheck::manual("Step has no recognizable action");
        };

        let (actions, confidence) = match action {
            StepAction::Tap | StepAction::Verify => {
                let Some(selector) = step.selector.clone() else {
                    return MappedCheck::manual(format!(
                        "No element selector could be inferred for '{}' step",
                        action
                    ));
                };
                let confidence = selector.confidence;
                let ui = if action == StepAction::Tap {
                    UiAction::TapOn { selector }
                } else {
                    UiAction::AssertVisible { selector }
                };
                (vec![ui], confidence)
            }
            StepAction::Type => {
                let Some(text) = first_quoted_literal(&step.description) else {
                    return MappedCheck::manual("No quoted text to type");
                };
                let confidence = step
                    .selector
                    .as_ref()
                    .map(|s| s.confidence)
                    .unwrap_or(self.confidence.text_only);
                let actions = vec![
                    UiAction::Focus {
                        selector: step.selector.clone(),
                    },
                    UiAction::ClearText,
                    UiAction::InputText { text },
                ];
                (actions, confidence)
            }
            StepAction::Wait => {
                let ms = leading_wait_ms(&step.description).unwrap_or(self.default_wait_ms);
                (vec![UiAction::Wait { ms }], self.confidence.flow_unanchored)
            }
            StepAction::Swipe => {
                let direction = swipe_direction(&step.description).unwrap_or_default();
                let confidence = step
                    .selector
                    .as_ref()
                    .map(|s| s.confidence)
                    .unwrap_or(self.confidence.flow_unanchored);
                let ui = UiAction::Swipe {
                    direction,
                    selector: step.selector.clone(),
                };
                (vec![ui], confidence)
            }
            StepAction::Navigate | StepAction::Login | StepAction::Observe => {
                return MappedCheck::manual(format!("'{}' steps have no executable UI action", action));
            }
        };

        MappedCheck::UiAction {
            name,
            actions,
            confidence: clamp_confidence(confidence),
        }
    }
}

fn no_selector(what: &str) -> MappedCheck {
    MappedCheck::manual(format!("No element selector could be inferred for {} check", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify_criterion_type, extract_check_config, parse_flow_step};
    use crate::model::SelectorStrategy;

    fn criterion(description: &str) -> AcceptanceCriterion {
        AcceptanceCriterion {
            id: "visual-1".to_string(),
            section: "Visual".to_string(),
            subsection: None,
            description: description.to_string(),
            criterion_type: classify_criterion_type(description),
            config: extract_check_config(description),
            line: 1,
            checked: false,
        }
    }

    fn mapper() -> Mapper {
        Mapper::new(ConfidenceTable::default())
    }

    #[test]
    fn test_visibility_uses_selector_confidence() {
        let check = mapper().map_criterion_to_check(&criterion("Login button is visible"));
        match check {
            MappedCheck::UiAction { actions, confidence, .. } => {
                assert_eq!(confidence, 0.6);
                assert!(matches!(&actions[0], UiAction::AssertVisible { selector } if selector.value == "Login"));
            }
            other => panic!("expected ui action, got {:?}", other),
        }
    }

    #[test]
    fn test_visibility_without_selector_is_manual() {
        let check = mapper().map_criterion_to_check(&criterion("A spinner is visible"));
        assert!(check.is_manual());
        assert_eq!(check.confidence(), 0.0);
    }

    #[test]
    fn test_text_only_check() {
        let check = mapper().map_criterion_to_check(&criterion("'Welcome back' is displayed"));
        match check {
            MappedCheck::UiAction { actions, confidence, .. } => {
                assert_eq!(confidence, 0.5);
                match &actions[0] {
                    UiAction::AssertVisible { selector } => {
                        assert_eq!(selector.by, SelectorStrategy::Text);
                        assert_eq!(selector.value, "Welcome back");
                    }
                    other => panic!("unexpected action {:?}", other),
                }
            }
            other => panic!("expected ui action, got {:?}", other),
        }
    }

    #[test]
    fn test_text_with_selector() {
        let c = criterion("Element with testID=greeting shows 'Hello, Sam'");
        assert_eq!(c.criterion_type, CriterionType::ElementText);
        match mapper().map_criterion_to_check(&c) {
            MappedCheck::UiAction { actions, confidence, .. } => {
                assert_eq!(confidence, 1.0);
                assert!(matches!(&actions[0], UiAction::AssertText { text, .. } if text == "Hello, Sam"));
            }
            other => panic!("expected ui action, got {:?}", other),
        }
    }

    #[test]
    fn test_interaction_multiplier() {
        let c = criterion("Tapping the \"Menu\" button opens the drawer");
        assert_eq!(c.criterion_type, CriterionType::Interaction);
        let check = mapper().map_criterion_to_check(&c);
        assert!((check.confidence() - 0.63).abs() < 1e-9);
    }

    #[test]
    fn test_navigation_multiplier() {
        let mut c = criterion("Tab 'Settings' label opens the settings screen");
        c.criterion_type = CriterionType::Navigation;
        let check = mapper().map_criterion_to_check(&c);
        assert!((check.confidence() - 0.49).abs() < 1e-9);
    }

    #[test]
    fn test_color_is_screenshot_analysis() {
        let check = mapper().map_criterion_to_check(&criterion("Background color is #FF0000"));
        match check {
            MappedCheck::ScreenshotAnalysis { color_hex, target, confidence, .. } => {
                assert_eq!(color_hex, "#FF0000");
                assert_eq!(target, ColorTarget::Background);
                assert_eq!(confidence, 0.6);
            }
            other => panic!("expected screenshot analysis, got {:?}", other),
        }
    }

    #[test]
    fn test_layout_is_full_screen_visual() {
        let check = mapper().map_criterion_to_check(&criterion("Cards are aligned in a grid"));
        match check {
            MappedCheck::Visual { compare, confidence, .. } => {
                assert!(compare.selector.is_none());
                assert_eq!(confidence, 0.5);
            }
            other => panic!("expected visual, got {:?}", other),
        }
    }

    #[test]
    fn test_state_change_and_manual_types() {
        let check = mapper().map_criterion_to_check(&criterion("Counter changes when the + button is tapped"));
        assert!(check.is_manual());
        let check = mapper().map_criterion_to_check(&criterion("Feels delightful"));
        assert!(check.is_manual());
    }

    #[test]
    fn test_injected_table_changes_confidence() {
        let table = ConfidenceTable {
            interaction: 0.5,
            ..Default::default()
        };
        let c = criterion("Tapping the \"Menu\" button opens the drawer");
        let check = Mapper::new(table).map_criterion_to_check(&c);
        assert!((check.confidence() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_flow_tap_and_verify() {
        let m = mapper();
        let tap = m.map_flow_step(&parse_flow_step(1, "Tap \"Continue\""));
        assert!(matches!(&tap, MappedCheck::UiAction { actions, .. } if matches!(actions[0], UiAction::TapOn { .. })));
        let verify = m.map_flow_step(&parse_flow_step(2, "Verify \"Welcome\" is shown"));
        assert!(matches!(&verify, MappedCheck::UiAction { actions, .. } if matches!(actions[0], UiAction::AssertVisible { .. })));
    }

    #[test]
    fn test_flow_type_produces_three_actions() {
        let check = mapper().map_flow_step(&parse_flow_step(3, "Type \"jane@example.com\" into the email field"));
        match check {
            MappedCheck::UiAction { actions, .. } => {
                assert_eq!(actions.len(), 3);
                assert!(matches!(&actions[0], UiAction::Focus { selector: Some(s) } if s.value == "Email"));
                assert_eq!(actions[1], UiAction::ClearText);
                assert_eq!(actions[2], UiAction::InputText { text: "jane@example.com".to_string() });
            }
            other => panic!("expected ui action, got {:?}", other),
        }
    }

    #[test]
    fn test_flow_wait_units() {
        let m = mapper();
        let wait = |text: &str| match m.map_flow_step(&parse_flow_step(1, text)) {
            MappedCheck::UiAction { actions, .. } => actions[0].clone(),
            other => panic!("expected ui action, got {:?}", other),
        };
        assert_eq!(wait("Wait 2 seconds"), UiAction::Wait { ms: 2000 });
        assert_eq!(wait("Wait 250ms for the animation"), UiAction::Wait { ms: 250 });
        assert_eq!(wait("Wait 3"), UiAction::Wait { ms: 3000 });
        assert_eq!(wait("Wait for the feed to load"), UiAction::Wait { ms: 1000 });
        assert_eq!(wait("Pause for 1.5 s"), UiAction::Wait { ms: 1500 });
    }

    #[test]
    fn test_flow_wait_ignores_numbers_that_are_not_durations() {
        let m = mapper();
        let wait = |text: &str| match m.map_flow_step(&parse_flow_step(1, text)) {
            MappedCheck::UiAction { actions, .. } => actions[0].clone(),
            other => panic!("expected ui action, got {:?}", other),
        };
        assert_eq!(wait("Wait for step 3 to load"), UiAction::Wait { ms: 1000 });
        assert_eq!(wait("Wait 2 minutes"), UiAction::Wait { ms: 1000 });
        assert_eq!(wait("Wait until 5 items show"), UiAction::Wait { ms: 1000 });
    }

    #[test]
    fn test_flow_swipe_defaults_up() {
        let m = mapper();
        let check = m.map_flow_step(&parse_flow_step(1, "Swipe through the onboarding cards"));
        assert!(matches!(&check, MappedCheck::UiAction { actions, .. }
            if actions[0] == UiAction::Swipe { direction: SwipeDirection::Up, selector: None }));
        let check = m.map_flow_step(&parse_flow_step(1, "Swipe left on the first card"));
        assert!(matches!(&check, MappedCheck::UiAction { actions, .. }
            if matches!(actions[0], UiAction::Swipe { direction: SwipeDirection::Left, .. })));
    }

    #[test]
    fn test_flow_unmappable_steps() {
        let m = mapper();
        assert!(m.map_flow_step(&parse_flow_step(1, "Log in as the demo user")).is_manual());
        assert!(m.map_flow_step(&parse_flow_step(1, "The app restarts")).is_manual());
        assert!(m.map_flow_step(&parse_flow_step(1, "Tap somewhere empty")).is_manual());
        assert!(m.map_flow_step(&parse_flow_step(1, "Type your name")).is_manual());
    }
}
