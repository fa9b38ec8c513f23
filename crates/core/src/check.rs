//! Executable check descriptions produced by the mapper

use serde::{Deserialize, Serialize};

use crate::model::{ColorTarget, ElementSelector, SwipeDirection, TextMatch};

/// A single UI action handed to the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    /// Tap an element
    TapOn { selector: ElementSelector },

    /// Long-press an element
    LongPressOn { selector: ElementSelector },

    /// Assert an element is on screen
    AssertVisible { selector: ElementSelector },

    /// Assert an element's text
    AssertText {
        selector: ElementSelector,
        text: String,
        #[serde(default)]
        mode: TextMatch,
    },

    /// Focus an input; `None` keeps the currently focused field
    Focus {
        #[serde(default)]
        selector: Option<ElementSelector>,
    },

    /// Clear the focused input
    ClearText,

    /// Type into the focused input
    InputText { text: String },

    /// Swipe, optionally starting on an element
    Swipe {
        direction: SwipeDirection,
        #[serde(default)]
        selector: Option<ElementSelector>,
    },

    /// Scroll until the element is visible
    ScrollUntilVisible {
        direction: SwipeDirection,
        selector: ElementSelector,
    },

    /// Sleep for a fixed time
    Wait { ms: u64 },
}

impl UiAction {
    /// Short label for logs and step names
    pub fn label(&self) -> String {
        match self {
            UiAction::TapOn { selector } => format!("tap:{}", selector),
            UiAction::LongPressOn { selector } => format!("long_press:{}", selector),
            UiAction::AssertVisible { selector } => format!("assert_visible:{}", selector),
            UiAction::AssertText { selector, .. } => format!("assert_text:{}", selector),
            UiAction::Focus { selector: Some(selector) } => format!("focus:{}", selector),
            UiAction::Focus { selector: None } => "focus".to_string(),
            UiAction::ClearText => "clear_text".to_string(),
            UiAction::InputText { text } => format!("input:{}", text.chars().take(30).collect::<String>()),
            UiAction::Swipe { direction, .. } => format!("swipe:{}", direction),
            UiAction::ScrollUntilVisible { selector, .. } => format!("scroll_to:{}", selector),
            UiAction::Wait { ms } => format!("wait:{}ms", ms),
        }
    }
}

/// Region compared by a visual check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualCompare {
    /// `None` compares the full screen
    #[serde(default)]
    pub selector: Option<ElementSelector>,

    /// Allowed pixel difference (0.0 - 100.0 percent)
    pub threshold: f64,
}

impl Default for VisualCompare {
    fn default() -> Self {
        Self {
            selector: None,
            threshold: 0.5,
        }
    }
}

/// What to run for one criterion or flow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappedCheck {
    /// Drive the app through the UI-action executor
    UiAction {
        name: String,
        actions: Vec<UiAction>,
        confidence: f64,
    },

    /// Compare a screenshot against a baseline
    Visual {
        name: String,
        compare: VisualCompare,
        confidence: f64,
    },

    /// Capture a screenshot and inspect a color
    ScreenshotAnalysis {
        name: String,
        color_hex: String,
        target: ColorTarget,
        #[serde(default)]
        selector: Option<ElementSelector>,
        confidence: f64,
    },

    /// Cannot be automated; a human has to look
    Manual { reason: String },
}

impl MappedCheck {
    pub fn manual(reason: impl Into<String>) -> Self {
        MappedCheck::Manual {
            reason: reason.into(),
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            MappedCheck::UiAction { confidence, .. }
            | MappedCheck::Visual { confidence, .. }
            | MappedCheck::ScreenshotAnalysis { confidence, .. } => *confidence,
            MappedCheck::Manual { .. } => 0.0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MappedCheck::UiAction { .. } => "ui-action",
            MappedCheck::Visual { .. } => "visual",
            MappedCheck::ScreenshotAnalysis { .. } => "screenshot-analysis",
            MappedCheck::Manual { .. } => "manual",
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, MappedCheck::Manual { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_has_zero_confidence() {
        let check = MappedCheck::manual("no selector");
        assert_eq!(check.confidence(), 0.0);
        assert_eq!(check.kind(), "manual");
        assert!(check.is_manual());
    }

    #[test]
    fn test_action_serializes_tagged() {
        let action = UiAction::TapOn {
            selector: ElementSelector::by_id("submit", 1.0),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "tap_on");
        assert_eq!(json["selector"]["by"], "id");
    }
}
