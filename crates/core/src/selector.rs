//! Selector and stable-id inference from free-text descriptions

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::ElementSelector;

/// Longest stable id suggested by [`infer_test_id`]
pub const MAX_TEST_ID_LEN: usize = 40;

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]+)"|“([^”]+)”|(?:^|[^\w])'([^']+)'(?:[^\w]|$)"#).expect("valid regex")
});

static TEST_ID_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\btest[-_ ]?id\s*[=:]\s*["“']?([A-Za-z0-9_.\-]+)"#).expect("valid regex")
});

static A11Y_LABEL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:accessibility[-_ ]?label|a11y[-_ ]?label)\s*[=:]?\s*["“']([^"”']+)["”']"#)
        .expect("valid regex")
});

static QUOTED_UI_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["“']([^"”']+)["”']\s+(?:button|text|link|label|tab|option)\b"#).expect("valid regex")
});

static BUTTON_WITH_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bbutton\s+(?:with|labell?ed)\s+(?:the\s+)?(?:text|label|title)?\s*["“']([^"”']+)["”']"#)
        .expect("valid regex")
});

static INPUT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(email|password|username|user\s+name|search|phone|name)\s+(?:input|field|text\s?box|text\s?field)\b")
        .expect("valid regex")
});

/// Well-known elements that carry a conventional visible text or label.
static COMMON_ELEMENTS: Lazy<Vec<(Regex, ElementSelector)>> = Lazy::new(|| {
    let entry = |pattern: &str, selector: ElementSelector| {
        (Regex::new(pattern).expect("valid regex"), selector)
    };
    vec![
        entry(r"(?i)\b(?:log\s?in|sign\s?in)\s+button\b", ElementSelector::by_text("Login", 0.6)),
        entry(r"(?i)\bsubmit\s+button\b", ElementSelector::by_text("Submit", 0.6)),
        entry(r"(?i)\bcancel\s+button\b", ElementSelector::by_text("Cancel", 0.6)),
        entry(r"(?i)\bavatar\b", ElementSelector::by_label("Avatar", 0.5)),
        entry(r"(?i)\blogo\b", ElementSelector::by_label("Logo", 0.4)),
    ]
});

static TRAILING_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s+(?:is|are|should|must|will|can|shows?|displays?|has|have|contains?|appears?|opens?|closes?|updates?|changes?|becomes?|when|on\s+tap)\b.*$",
    )
    .expect("valid regex")
});

static LEADING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:the|a|an)\s+").expect("valid regex"));

static TRAILING_UI_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:button|text|link|label|tab|option|icon|field|input|image)$").expect("valid regex")
});

/// All quoted literals in `text`, in order of appearance.
///
/// Accepts straight double quotes, curly double quotes, and single quotes
/// that are not part of a word (so `user's` is not a quote).
pub fn quoted_literals(text: &str) -> Vec<String> {
    QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn first_quoted_literal(text: &str) -> Option<String> {
    quoted_literals(text).into_iter().next()
}

/// Infer how to locate the element a description talks about.
///
/// Precedence is fixed and the first match wins:
/// 1. explicit `testID=...` (1.0)
/// 2. explicit accessibility label (0.95)
/// 3. quoted text followed by a UI noun (0.7)
/// 4. `button with text '...'` (0.75)
/// 5. common elements (0.4 - 0.6)
pub fn infer_selector_from_description(description: &str) -> Option<ElementSelector> {
    if let Some(caps) = TEST_ID_REF.captures(description) {
        return Some(ElementSelector::by_id(&caps[1], 1.0));
    }
    if let Some(caps) = A11Y_LABEL_REF.captures(description) {
        return Some(ElementSelector::by_label(caps[1].trim(), 0.95));
    }
    if let Some(caps) = QUOTED_UI_NOUN.captures(description) {
        return Some(ElementSelector::by_text(caps[1].trim(), 0.7));
    }
    if let Some(caps) = BUTTON_WITH_TEXT.captures(description) {
        return Some(ElementSelector::by_text(caps[1].trim(), 0.75));
    }
    common_element(description)
}

fn common_element(description: &str) -> Option<ElementSelector> {
    for (pattern, selector) in COMMON_ELEMENTS.iter().take(3) {
        if pattern.is_match(description) {
            return Some(selector.clone());
        }
    }
    if let Some(caps) = INPUT_FIELD.captures(description) {
        return Some(ElementSelector::by_label(capitalize(&caps[1]), 0.5));
    }
    COMMON_ELEMENTS
        .iter()
        .skip(3)
        .find(|(pattern, _)| pattern.is_match(description))
        .map(|(_, selector)| selector.clone())
}

/// Suggest a stable test id for the element a description refers to.
///
/// `"The Login button is visible"` becomes `"login"`.
pub fn infer_test_id(description: &str) -> String {
    let trimmed = description.trim().trim_end_matches('.');
    let phrase = TRAILING_STATE.replace(trimmed, "");
    let phrase = LEADING_ARTICLE.replace(phrase.trim(), "");
    let phrase: String = phrase.chars().filter(|c| !matches!(c, '"' | '\'' | '“' | '”')).collect();
    let phrase = TRAILING_UI_NOUN.replace(phrase.trim(), "");

    let mut id = slugify(&phrase);
    if id.len() > MAX_TEST_ID_LEN {
        id.truncate(MAX_TEST_ID_LEN);
        id = id.trim_end_matches('-').to_string();
    }
    if id.is_empty() {
        "element".to_string()
    } else {
        id
    }
}

/// Lowercase kebab-case: runs of non-alphanumerics collapse into one dash.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn capitalize(word: &str) -> String {
    let word = word.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectorStrategy;

    #[test]
    fn test_explicit_test_id_wins() {
        let sel = infer_selector_from_description("Element with testID=\"profile-card\" is visible").unwrap();
        assert_eq!(sel.by, SelectorStrategy::Id);
        assert_eq!(sel.value, "profile-card");
        assert_eq!(sel.confidence, 1.0);
    }

    #[test]
    fn test_accessibility_label_reference() {
        let sel = infer_selector_from_description("Icon with accessibilityLabel \"Close menu\" is shown").unwrap();
        assert_eq!(sel.by, SelectorStrategy::Label);
        assert_eq!(sel.value, "Close menu");
        assert_eq!(sel.confidence, 0.95);
    }

    #[test]
    fn test_quoted_text_before_ui_noun() {
        let sel = infer_selector_from_description("The \"Get Started\" button is visible").unwrap();
        assert_eq!(sel.by, SelectorStrategy::Text);
        assert_eq!(sel.value, "Get Started");
        assert_eq!(sel.confidence, 0.7);
    }

    #[test]
    fn test_button_with_text() {
        let sel = infer_selector_from_description("A button with text 'Save draft' appears").unwrap();
        assert_eq!(sel.value, "Save draft");
        assert_eq!(sel.confidence, 0.75);
    }

    #[test]
    fn test_common_elements() {
        let login = infer_selector_from_description("Login button is visible").unwrap();
        assert_eq!(login.by, SelectorStrategy::Text);
        assert_eq!(login.value, "Login");
        assert_eq!(login.confidence, 0.6);

        let email = infer_selector_from_description("Email input field is shown").unwrap();
        assert_eq!(email.by, SelectorStrategy::Label);
        assert_eq!(email.value, "Email");
        assert_eq!(email.confidence, 0.5);

        let logo = infer_selector_from_description("App logo is rendered at the top").unwrap();
        assert_eq!(logo.confidence, 0.4);
    }

    #[test]
    fn test_no_selector() {
        assert!(infer_selector_from_description("Everything feels fast").is_none());
    }

    #[test]
    fn test_quoted_literals_skip_apostrophes() {
        assert_eq!(quoted_literals("The user's \"Profile\" tab"), vec!["Profile"]);
        assert_eq!(quoted_literals("Shows 'Welcome back' banner"), vec!["Welcome back"]);
    }

    #[test]
    fn test_infer_test_id() {
        assert_eq!(infer_test_id("Login button is visible"), "login");
        assert_eq!(infer_test_id("The profile header should be displayed."), "profile-header");
        assert_eq!(infer_test_id("An \"Add to cart\" link appears"), "add-to-cart");
        assert_eq!(infer_test_id("  \"\" "), "element");
    }

    #[test]
    fn test_infer_test_id_truncates() {
        let id = infer_test_id("Very long descriptive name of the quarterly revenue breakdown chart is visible");
        assert!(id.len() <= MAX_TEST_ID_LEN);
        assert!(!id.ends_with('-'));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Home Screen / Header"), "home-screen-header");
        assert_eq!(slugify("  "), "");
    }
}
