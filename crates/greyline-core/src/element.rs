//! Accessibility element snapshots.
//!
//! This module defines the data structures representing UI elements from
//! an accessibility hierarchy. A [`UIElement`] is a point-in-time snapshot:
//! the hierarchy may change between two lookups, so snapshots are never
//! cached across polls.

use serde::{Deserialize, Serialize};

/// Minimum visible fraction for an element to count as sufficiently visible.
pub const SUFFICIENT_VISIBILITY: f64 = 0.75;

/// Represents a UI element from the accessibility hierarchy.
///
/// Elements form a tree structure via the `children` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    /// The unique accessibility identifier for this element (AXUniqueId).
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label (AXLabel), typically the user-visible text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value of the element (AXValue), e.g., text field contents.
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The type of UI element (e.g., "Button", "TextField", "ScrollView").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// The element's frame in screen coordinates.
    #[serde(default)]
    pub frame: Option<ElementFrame>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,

    /// The accessibility role of this element.
    #[serde(default)]
    pub role: Option<String>,

    /// Whether the element can receive touches at its hit point.
    #[serde(default)]
    pub hittable: Option<bool>,

    /// Whether the element accepts user interaction.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Fraction of the element's area currently on screen (0.0 to 1.0).
    #[serde(rename = "visibleFraction", default)]
    pub visible_fraction: Option<f64>,

    /// Accessibility traits reported for the element.
    #[serde(default)]
    pub traits: Vec<ElementTrait>,

    /// Set on the application's key window.
    #[serde(rename = "keyWindow", default)]
    pub key_window: bool,
}

impl UIElement {
    /// Fraction of the element that is visible.
    ///
    /// Backends that do not report a fraction are approximated from the
    /// frame: an element with a positive area counts as fully visible.
    pub fn visibility(&self) -> f64 {
        match self.visible_fraction {
            Some(fraction) => fraction.clamp(0.0, 1.0),
            None if self.frame.as_ref().is_some_and(ElementFrame::has_area) => 1.0,
            None => 0.0,
        }
    }

    /// Returns true if at least [`SUFFICIENT_VISIBILITY`] of the element is on screen.
    pub fn is_sufficiently_visible(&self) -> bool {
        self.visibility() >= SUFFICIENT_VISIBILITY
    }

    /// Returns true if the element is visible and accepts touches.
    pub fn is_interactable(&self) -> bool {
        self.is_sufficiently_visible()
            && self.hittable != Some(false)
            && self.enabled != Some(false)
            && !self.traits.contains(&ElementTrait::NotEnabled)
    }

    /// Returns true if the element carries the given trait.
    pub fn has_trait(&self, element_trait: ElementTrait) -> bool {
        self.traits.contains(&element_trait)
    }

    /// Short human-readable summary used in logs and CLI output.
    pub fn summary(&self) -> String {
        let kind = self.element_type.as_deref().unwrap_or("Element");
        match (&self.identifier, &self.label) {
            (Some(id), Some(label)) => format!("{} '{}' ({})", kind, id, label),
            (Some(id), None) => format!("{} '{}'", kind, id),
            (None, Some(label)) => format!("{} ({})", kind, label),
            (None, None) => kind.to_string(),
        }
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in screen points, with the origin at the top-left
/// corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    /// The x-coordinate of the element's top-left corner.
    pub x: f64,
    /// The y-coordinate of the element's top-left corner.
    pub y: f64,
    /// The width of the element in points.
    pub width: f64,
    /// The height of the element in points.
    pub height: f64,
}

impl ElementFrame {
    /// Returns true if the frame covers a non-empty area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Accessibility traits an element may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementTrait {
    Button,
    Link,
    Header,
    SearchField,
    Image,
    Selected,
    StaticText,
    Adjustable,
    NotEnabled,
    /// Any trait this crate does not model.
    #[serde(other)]
    Other,
}
