//! Element selectors and the shorthand builders used by tests.
//!
//! A [`Selector`] is a declarative predicate over [`UIElement`]s. The
//! shorthand builders ([`element_by_id`], [`element_by_text`],
//! [`button_by_title`], [`element_by_class`]) combine the identity predicate
//! with [`Selector::SufficientlyVisible`] and [`Selector::Interactable`], so
//! a test only ever addresses elements a user could actually touch. The
//! `raw_*` builders skip those filters; they are meant for scroll containers
//! and for search targets that may start off-screen.
//!
//! Identity strings support glob wildcards (`*` any run of characters, `?`
//! exactly one character). Without wildcards they match exactly.
//!
//! # Example
//!
//! ```
//! use greyline_core::selector::{element_by_id, Selector};
//!
//! let login = element_by_id("login-button");
//! assert_eq!(
//!     login.to_string(),
//!     "id `login-button` + sufficiently visible + interactable"
//! );
//!
//! // Narrow an ambiguous lookup explicitly.
//! let first_row = Selector::Class("Cell".to_string()).first();
//! assert_eq!(first_row.to_string(), "class `Cell` [index 0]");
//! ```

use std::fmt;

use crate::element::{ElementTrait, UIElement};

/// Accessibility label of the navigation bar back button.
pub const BACK_BUTTON_LABEL: &str = "@Back";

/// A predicate describing which element(s) to target.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Match by accessibility identifier.
    AccessibilityId(String),
    /// Match by displayed text (label or value).
    Text(String),
    /// Match a button by its title.
    ButtonTitle(String),
    /// Match by accessibility label only.
    Label(String),
    /// Match by element type (e.g., "Button", "ScrollView").
    Class(String),
    /// Match elements carrying an accessibility trait.
    Trait(ElementTrait),
    /// Match elements with at least 75% of their area on screen.
    SufficientlyVisible,
    /// Match elements that are visible, hittable and enabled.
    Interactable,
    /// Match the application's key window.
    KeyWindow,
    /// Match elements satisfying every inner selector.
    AllOf(Vec<Selector>),
    /// Narrow the matches of the inner selector to the one at `index`.
    ///
    /// Narrowing is applied by [`ElementQuery::resolve`](crate::query::ElementQuery::resolve)
    /// at the top level of a lookup. Nested inside [`Selector::AllOf`] it acts
    /// as its inner predicate.
    AtIndex(Box<Selector>, usize),
}

impl Selector {
    /// Returns true if `element` satisfies this predicate.
    pub fn matches(&self, element: &UIElement) -> bool {
        match self {
            Selector::AccessibilityId(id) => element
                .identifier
                .as_deref()
                .is_some_and(|value| glob_match(id, value)),
            Selector::Text(text) => [&element.label, &element.value]
                .into_iter()
                .flatten()
                .any(|value| glob_match(text, value)),
            Selector::ButtonTitle(title) => {
                let is_button = element.element_type.as_deref() == Some("Button")
                    || element.has_trait(ElementTrait::Button);
                is_button
                    && element
                        .label
                        .as_deref()
                        .is_some_and(|value| glob_match(title, value))
            }
            Selector::Label(label) => element
                .label
                .as_deref()
                .is_some_and(|value| glob_match(label, value)),
            Selector::Class(class) => element.element_type.as_deref() == Some(class.as_str()),
            Selector::Trait(element_trait) => element.has_trait(*element_trait),
            Selector::SufficientlyVisible => element.is_sufficiently_visible(),
            Selector::Interactable => element.is_interactable(),
            Selector::KeyWindow => element.key_window,
            Selector::AllOf(selectors) => selectors.iter().all(|s| s.matches(element)),
            Selector::AtIndex(inner, _) => inner.matches(element),
        }
    }

    /// Combines this selector with another one (logical AND).
    ///
    /// Nested [`Selector::AllOf`] lists are flattened.
    #[must_use]
    pub fn and(self, other: Selector) -> Selector {
        let mut parts = match self {
            Selector::AllOf(parts) => parts,
            single => vec![single],
        };
        match other {
            Selector::AllOf(more) => parts.extend(more),
            single => parts.push(single),
        }
        Selector::AllOf(parts)
    }

    /// Narrows the lookup to the match at `index` (document order).
    #[must_use]
    pub fn at_index(self, index: usize) -> Selector {
        match self {
            Selector::AtIndex(inner, _) => Selector::AtIndex(inner, index),
            other => Selector::AtIndex(Box::new(other), index),
        }
    }

    /// Narrows the lookup to the first match.
    #[must_use]
    pub fn first(self) -> Selector {
        self.at_index(0)
    }

    /// Returns the selector without its top-level index narrowing, and the index.
    pub fn split_index(&self) -> (&Selector, Option<usize>) {
        match self {
            Selector::AtIndex(inner, index) => (inner.as_ref(), Some(*index)),
            other => (other, None),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::AccessibilityId(id) => write!(f, "id `{}`", id),
            Selector::Text(text) => write!(f, "text `{}`", text),
            Selector::ButtonTitle(title) => write!(f, "button `{}`", title),
            Selector::Label(label) => write!(f, "label `{}`", label),
            Selector::Class(class) => write!(f, "class `{}`", class),
            Selector::Trait(element_trait) => write!(f, "trait {:?}", element_trait),
            Selector::SufficientlyVisible => f.write_str("sufficiently visible"),
            Selector::Interactable => f.write_str("interactable"),
            Selector::KeyWindow => f.write_str("key window"),
            Selector::AllOf(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Selector::AtIndex(inner, index) => write!(f, "{} [index {}]", inner, index),
        }
    }
}

fn with_default_filters(identity: Selector) -> Selector {
    Selector::AllOf(vec![
        identity,
        Selector::SufficientlyVisible,
        Selector::Interactable,
    ])
}

/// Visible, interactable element with the given accessibility id.
pub fn element_by_id(id: impl Into<String>) -> Selector {
    with_default_filters(Selector::AccessibilityId(id.into()))
}

/// Visible, interactable element showing the given text.
pub fn element_by_text(text: impl Into<String>) -> Selector {
    with_default_filters(Selector::Text(text.into()))
}

/// Visible, interactable button with the given title.
pub fn button_by_title(title: impl Into<String>) -> Selector {
    with_default_filters(Selector::ButtonTitle(title.into()))
}

/// Visible, interactable element of the given type.
pub fn element_by_class(class: impl Into<String>) -> Selector {
    with_default_filters(Selector::Class(class.into()))
}

/// Element with the given accessibility id, whether on screen or not.
pub fn raw_by_id(id: impl Into<String>) -> Selector {
    Selector::AccessibilityId(id.into())
}

/// Element showing the given text, whether on screen or not.
pub fn raw_by_text(text: impl Into<String>) -> Selector {
    Selector::Text(text.into())
}

/// The navigation bar back button.
pub fn back_button_selector() -> Selector {
    Selector::AllOf(vec![
        Selector::Label(BACK_BUTTON_LABEL.to_string()),
        Selector::Trait(ElementTrait::Button),
    ])
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches a string against a glob pattern with `*` (any chars) and `?` (single char).
///
/// When the pattern has no wildcards, falls back to exact equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    // row[j] = pattern[..i] matches text[..j], rolled over i
    let mut row = vec![false; txt.len() + 1];
    row[0] = true;

    for &p in &pat {
        let mut next = vec![false; txt.len() + 1];
        if p == '*' {
            next[0] = row[0];
        }
        for j in 1..=txt.len() {
            next[j] = match p {
                '*' => row[j] || next[j - 1],
                '?' => row[j - 1],
                c => row[j - 1] && c == txt[j - 1],
            };
        }
        row = next;
    }

    row[txt.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementFrame;

    fn on_screen() -> Option<ElementFrame> {
        Some(ElementFrame { x: 0.0, y: 0.0, width: 100.0, height: 44.0 })
    }

    fn button(id: &str, label: &str) -> UIElement {
        UIElement {
            identifier: Some(id.to_string()),
            label: Some(label.to_string()),
            element_type: Some("Button".to_string()),
            frame: on_screen(),
            ..Default::default()
        }
    }

    #[test]
    fn element_by_id_applies_default_filters() {
        let selector = element_by_id("save");
        assert!(selector.matches(&button("save", "Save")));

        let hidden = UIElement { visible_fraction: Some(0.2), ..button("save", "Save") };
        assert!(!selector.matches(&hidden));

        let blocked = UIElement { hittable: Some(false), ..button("save", "Save") };
        assert!(!selector.matches(&blocked));
    }

    #[test]
    fn raw_selector_ignores_visibility() {
        let offscreen = UIElement { visible_fraction: Some(0.0), ..button("row-42", "Row 42") };
        assert!(raw_by_id("row-42").matches(&offscreen));
        assert!(!element_by_id("row-42").matches(&offscreen));
    }

    #[test]
    fn text_matches_label_or_value() {
        let field = UIElement {
            value: Some("hello@example.com".to_string()),
            frame: on_screen(),
            ..Default::default()
        };
        assert!(element_by_text("hello@*").matches(&field));
        assert!(element_by_text("Save").matches(&button("save", "Save")));
        assert!(!element_by_text("Cancel").matches(&button("save", "Save")));
    }

    #[test]
    fn button_title_requires_button_kind() {
        let text = UIElement {
            label: Some("Save".to_string()),
            element_type: Some("StaticText".to_string()),
            frame: on_screen(),
            ..Default::default()
        };
        assert!(!button_by_title("Save").matches(&text));

        let trait_button = UIElement { traits: vec![ElementTrait::Button], ..text };
        assert!(button_by_title("Save").matches(&trait_button));
    }

    #[test]
    fn class_matches_element_type() {
        assert!(element_by_class("Button").matches(&button("a", "A")));
        assert!(!element_by_class("Switch").matches(&button("a", "A")));
    }

    #[test]
    fn back_button_matches_label_and_trait() {
        let back = UIElement {
            label: Some(BACK_BUTTON_LABEL.to_string()),
            traits: vec![ElementTrait::Button],
            ..Default::default()
        };
        assert!(back_button_selector().matches(&back));

        let plain = UIElement { traits: vec![], ..back };
        assert!(!back_button_selector().matches(&plain));
    }

    #[test]
    fn and_flattens_composites() {
        let selector = raw_by_id("a").and(Selector::KeyWindow).and(element_by_text("b"));
        match selector {
            Selector::AllOf(parts) => assert_eq!(parts.len(), 5),
            other => panic!("expected AllOf, got {:?}", other),
        }
    }

    #[test]
    fn at_index_replaces_previous_index() {
        let selector = raw_by_id("cell").first().at_index(3);
        assert_eq!(selector.split_index().1, Some(3));
        assert_eq!(selector.split_index().0, &raw_by_id("cell"));
        assert_eq!(raw_by_id("cell").split_index().1, None);
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(
            back_button_selector().to_string(),
            "label `@Back` + trait Button"
        );
        assert_eq!(raw_by_text("Done").to_string(), "text `Done`");
    }

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("hello", "hello"));
        assert!(!glob_match("hello", "world"));
    }

    #[test]
    fn test_glob_match_star() {
        assert!(glob_match("Log*", "Log In"));
        assert!(glob_match("Log*", "Log"));
        assert!(!glob_match("Log*", "Blog"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_glob_match_question_mark() {
        assert!(glob_match("Item ?", "Item 1"));
        assert!(!glob_match("Item ?", "Item 12"));
    }

    #[test]
    fn test_glob_match_combined() {
        assert!(glob_match("Tab ?*", "Tab 1 Selected"));
        assert!(glob_match("Tab ?*", "Tab 1"));
        assert!(!glob_match("Tab ?*", "Tab "));
    }
}
