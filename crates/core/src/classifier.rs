//! Heuristic classification of criterion descriptions and flow steps
//!
//! Classification is an ordered cascade: the first rule whose predicate
//! matches decides the type. Several later categories share vocabulary with
//! earlier ones ("scroll" appears in both interaction and scroll rules,
//! "shows" in navigation and visibility), so the order of
//! [`CLASSIFICATION_RULES`] is part of the contract.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    CheckConfig, ColorTarget, CriterionType, ElementSelector, FlowStep, InteractionKind, StepAction,
    SwipeDirection, TextMatch,
};
use crate::selector::{first_quoted_literal, infer_selector_from_description, quoted_literals};

/// One entry of the classification cascade
pub struct ClassificationRule {
    pub name: &'static str,
    pub criterion_type: CriterionType,
    predicate: fn(&str) -> bool,
}

impl ClassificationRule {
    pub fn matches(&self, description: &str) -> bool {
        (self.predicate)(description)
    }
}

/// Evaluated top to bottom; first match wins.
pub static CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule { name: "color", criterion_type: CriterionType::ElementColor, predicate: is_color },
    ClassificationRule { name: "interaction", criterion_type: CriterionType::Interaction, predicate: is_interaction },
    ClassificationRule { name: "modal", criterion_type: CriterionType::Modal, predicate: is_modal },
    ClassificationRule { name: "navigation", criterion_type: CriterionType::Navigation, predicate: is_navigation },
    ClassificationRule { name: "scroll", criterion_type: CriterionType::Scroll, predicate: is_scroll },
    ClassificationRule { name: "state_change", criterion_type: CriterionType::StateChange, predicate: is_state_change },
    ClassificationRule { name: "text", criterion_type: CriterionType::ElementText, predicate: is_text_content },
    ClassificationRule { name: "layout", criterion_type: CriterionType::Layout, predicate: is_layout },
    ClassificationRule { name: "visibility", criterion_type: CriterionType::ElementVisible, predicate: is_visibility },
];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| re(r"#(?:[0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b"));
static COLOR_PHRASE: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bcolou?r\s+(?:is|should\s+be)\b"));

static GESTURE_VERB: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:tap|taps|tapping|tapped|click\w*|press\w*|swip\w*|scroll\w*)\b"));
static REVEAL_VERB: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:opens?|closes?|shows?|hides?|toggles?|expands?|collapses?|dismiss\w*|reveals?)\b")
});
static TAPPABLE: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bis\s+(?:tappable|clickable|pressable)\b"));

static MODAL_NOUN: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:modal|drawer|bottom\s+sheet|sheet|dialog|popup|pop-up|overlay)s?\b")
});
static MODAL_VERB: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:open\w*|clos\w*|appear\w*|dismiss\w*|slides?)\b"));

static SCREEN_NOUN: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(?:screen|page|route|view)s?\b"));
static NAVIGATE_VERB: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:shows?|showing|opens?|opening|navigat\w*|redirect\w*|goes\s+to|leads?\s+to)\b")
});

static SCROLL_NOUN: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(?:scroll\w*|carousel)\b"));
static SCROLL_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:smooth\w*|horizontal\w*|vertical\w*|is|are)\b"));

static CHANGE_VERB: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:updates?|updated|changes?|changed|becomes?)\b"));
static WHEN: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bwhen\b"));

static TEXT_MARKER: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:text|is\s+displayed|displays?|shows?|reads|says)\b"));

static LAYOUT_TERMS: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:align\w*|cent(?:er|re)d?|spacing|spaced|padding|margins?|position\w*|layout|grid|columns?|above|below|next\s+to|side\s+by\s+side|stacked)\b")
});

static VISIBLE_TERMS: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:displayed|visible|shown|rendered|appears?|present)\b"));
static GENERIC_PRESENCE: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(?:shows?|has|have|contains?|includes?)\b"));

static EXACT_DISPLAYED: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)["“']([^"”']+)["”']\s+(?:text\s+)?(?:is|are)\s+(?:displayed|shown|visible|rendered)"#)
});
static SHOWS_QUOTED: Lazy<Regex> = Lazy::new(|| {
    re(r#"(?i)\b(?:shows?|displays?|reads?|says?|contains?)\s+(?:the\s+)?(?:text\s+|message\s+|label\s+|title\s+)?["“']([^"”']+)["”']"#)
});

static LONG_PRESS: Lazy<Regex> = Lazy::new(|| re(r"(?i)\blong[\s-]?press"));
static SWIPE: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bswip\w*"));
static SCROLL: Lazy<Regex> = Lazy::new(|| re(r"(?i)\bscroll\w*"));
static TAP: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(?:tap\w*|click\w*|press\w*)"));
static DIRECTION: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(up|down|left|right)\b"));
static WITHIN: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\bwithin\s+(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)\b")
});

static STEP_VERB: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)^\s*(tap|click|press|select|choose|type|enter|input|fill|swipe|scroll|verify|check|confirm|assert|ensure|see|expect|wait|pause|navigate|go\s+to|open|launch|log\s*in|sign\s*in|observe|notice|look|watch)\b")
});
static EXPECTED_SPLIT: Lazy<Regex> = Lazy::new(|| re(r"(?i)\s*(?:→|->|\bexpected:)\s*"));

fn is_color(d: &str) -> bool {
    HEX_COLOR.is_match(d) || COLOR_PHRASE.is_match(d)
}

fn is_interaction(d: &str) -> bool {
    (GESTURE_VERB.is_match(d) && REVEAL_VERB.is_match(d)) || TAPPABLE.is_match(d)
}

fn is_modal(d: &str) -> bool {
    MODAL_NOUN.is_match(d) && MODAL_VERB.is_match(d)
}

fn is_navigation(d: &str) -> bool {
    SCREEN_NOUN.is_match(d) && NAVIGATE_VERB.is_match(d)
}

fn is_scroll(d: &str) -> bool {
    SCROLL_NOUN.is_match(d) && SCROLL_QUALIFIER.is_match(d)
}

fn is_state_change(d: &str) -> bool {
    CHANGE_VERB.is_match(d) && WHEN.is_match(d)
}

fn is_text_content(d: &str) -> bool {
    !quoted_literals(d).is_empty() && TEXT_MARKER.is_match(d)
}

fn is_layout(d: &str) -> bool {
    LAYOUT_TERMS.is_match(d)
}

fn is_visibility(d: &str) -> bool {
    VISIBLE_TERMS.is_match(d) || GENERIC_PRESENCE.is_match(d)
}

/// The first rule in [`CLASSIFICATION_RULES`] matching `description`
pub fn matching_rule(description: &str) -> Option<&'static ClassificationRule> {
    CLASSIFICATION_RULES.iter().find(|rule| rule.matches(description))
}

/// Assign a semantic type; `Manual` when no rule matches.
pub fn classify_criterion_type(description: &str) -> CriterionType {
    matching_rule(description)
        .map(|rule| rule.criterion_type)
        .unwrap_or(CriterionType::Manual)
}

/// Pull out everything a check might need from a description.
///
/// Each field is extracted independently of the classified type.
pub fn extract_check_config(description: &str) -> CheckConfig {
    let mut config = CheckConfig {
        selector: infer_selector_from_description(description),
        ..Default::default()
    };

    if let Some(m) = HEX_COLOR.find(description) {
        config.color_hex = Some(m.as_str().to_uppercase());
        config.color_target = Some(color_target(description));
    }

    if let Some(caps) = EXACT_DISPLAYED.captures(description) {
        config.expected_text = Some(caps[1].trim().to_string());
        config.text_match = TextMatch::Exact;
    } else if let Some(caps) = SHOWS_QUOTED.captures(description) {
        config.expected_text = Some(caps[1].trim().to_string());
        config.text_match = TextMatch::Contains;
    }

    config.interaction = interaction_kind(description);
    if matches!(config.interaction, Some(InteractionKind::Swipe | InteractionKind::Scroll)) {
        config.swipe_direction = swipe_direction(description);
    }

    if let Some(caps) = WITHIN.captures(description) {
        config.timeout_ms = duration_ms(&caps[1], Some(&caps[2]));
    }

    config
}

fn color_target(description: &str) -> ColorTarget {
    let lower = description.to_lowercase();
    if lower.contains("background") || lower.contains("bg ") {
        ColorTarget::Background
    } else if lower.contains("border") || lower.contains("outline") {
        ColorTarget::Border
    } else if lower.contains("icon") {
        ColorTarget::Icon
    } else if lower.contains("text") || lower.contains("font") || lower.contains("label") {
        ColorTarget::Text
    } else {
        ColorTarget::Background
    }
}

fn interaction_kind(description: &str) -> Option<InteractionKind> {
    if LONG_PRESS.is_match(description) {
        Some(InteractionKind::LongPress)
    } else if SWIPE.is_match(description) {
        Some(InteractionKind::Swipe)
    } else if SCROLL.is_match(description) {
        Some(InteractionKind::Scroll)
    } else if TAP.is_match(description) {
        Some(InteractionKind::Tap)
    } else {
        None
    }
}

/// Direction keyword in `text`, if any
pub fn swipe_direction(text: &str) -> Option<SwipeDirection> {
    DIRECTION.captures(text).map(|caps| match caps[1].to_lowercase().as_str() {
        "down" => SwipeDirection::Down,
        "left" => SwipeDirection::Left,
        "right" => SwipeDirection::Right,
        _ => SwipeDirection::Up,
    })
}

/// Convert an amount and unit token to milliseconds. No unit means seconds.
pub(crate) fn duration_ms(amount: &str, unit: Option<&str>) -> Option<u64> {
    let value: f64 = amount.parse().ok()?;
    let millis = match unit.map(str::to_lowercase).as_deref() {
        Some(u) if u.starts_with("ms") || u.starts_with("milli") => value,
        _ => value * 1000.0,
    };
    Some(millis.round() as u64)
}

/// Parse one numbered flow line into a step.
pub fn parse_flow_step(number: u32, text: &str) -> FlowStep {
    let description = text.trim().to_string();
    let mut parts = EXPECTED_SPLIT.splitn(&description, 2);
    let action_text = parts.next().unwrap_or_default().trim().to_string();
    let expected = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let action = parse_step_action(&action_text);
    let selector = infer_selector_from_description(&action_text).or_else(|| {
        if action == Some(StepAction::Type) {
            None
        } else {
            first_quoted_literal(&action_text)
                .map(|text| ElementSelector::by_text(text, 0.5))
        }
    });

    FlowStep {
        number,
        description,
        action,
        selector,
        expected,
    }
}

/// Map the leading verb of a step to an action
pub fn parse_step_action(text: &str) -> Option<StepAction> {
    let caps = STEP_VERB.captures(text)?;
    let verb: String = caps[1]
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let action = match verb.as_str() {
        "tap" | "click" | "press" | "select" | "choose" => StepAction::Tap,
        "type" | "enter" | "input" | "fill" => StepAction::Type,
        "swipe" | "scroll" => StepAction::Swipe,
        "verify" | "check" | "confirm" | "assert" | "ensure" | "see" | "expect" => StepAction::Verify,
        "wait" | "pause" => StepAction::Wait,
        "navigate" | "go to" | "open" | "launch" => StepAction::Navigate,
        "observe" | "notice" | "look" | "watch" => StepAction::Observe,
        _ => StepAction::Login,
    };
    Some(action)
}
