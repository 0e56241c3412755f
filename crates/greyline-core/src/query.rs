//! Element query trait for backend-agnostic UI lookups.
//!
//! This module defines the [`ElementQuery`] trait, the capability the rest of
//! the crate is built on: resolve a [`Selector`] against the current view
//! hierarchy, check what was found, and apply an [`Action`] to it. The
//! matching engine and gesture synthesis live behind this trait, so the
//! waiter and gesture helpers work with any backend: a live device agent,
//! a snapshot file, or a scripted test double.
//!
//! Lookups are never cached. Every call observes the hierarchy as it is now.

use std::fmt;

use thiserror::Error;

use crate::element::UIElement;
use crate::selector::Selector;

/// Default scroll distance in points.
pub const DEFAULT_SCROLL_AMOUNT: f64 = 300.0;

/// Errors that can occur while querying or acting on elements.
///
/// Every variant carries the selector description so failures read on their
/// own in a test report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The selector matched zero elements.
    #[error("No element matches {selector}")]
    NoMatch {
        /// Description of the selector.
        selector: String,
    },

    /// The selector matched several elements where exactly one was required.
    #[error("{count} elements match {selector}, expected exactly one")]
    AmbiguousMatch {
        /// Description of the selector.
        selector: String,
        /// How many elements matched.
        count: usize,
    },

    /// The element exists but is not sufficiently visible.
    #[error("Element {element} is not visible")]
    NotVisible {
        /// Summary of the element.
        element: String,
    },

    /// The element is still on screen while waiting for it to go away.
    #[error("Element {element} is still visible")]
    StillVisible {
        /// Summary of the element.
        element: String,
    },

    /// The element exists but cannot receive touches.
    #[error("Element {element} is not interactable")]
    NotInteractable {
        /// Summary of the element.
        element: String,
    },

    /// The element could not accept the action.
    #[error("Action {action} failed on {element}: {reason}")]
    ActionFailed {
        /// The action that was attempted.
        action: String,
        /// Summary of the element.
        element: String,
        /// Why the backend rejected the action.
        reason: String,
    },

    /// A scroll search gave up before the target became interactable.
    #[error("Element {selector} not found after {attempts} scroll attempts")]
    ElementNotFoundAfterSearch {
        /// Description of the search target.
        selector: String,
        /// Number of scrolls performed.
        attempts: u32,
    },

    /// The backend could not produce a hierarchy snapshot.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl QueryError {
    /// Returns true for [`QueryError::NoMatch`].
    pub fn is_no_match(&self) -> bool {
        matches!(self, QueryError::NoMatch { .. })
    }
}

/// Scroll direction, named after where the content moves into view.
///
/// `Down` reveals content below (the finger moves up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Content edge of a scroll view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }
}

/// Where a scroll gesture starts, as fractions of the element's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPoint {
    /// Horizontal position, 0.0 (left edge) to 1.0 (right edge).
    pub x: f64,
    /// Vertical position, 0.0 (top edge) to 1.0 (bottom edge).
    pub y: f64,
}

impl StartPoint {
    /// Creates a start point, clamping both fractions into `0.0..=1.0`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// The center of the element.
    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

impl Default for StartPoint {
    fn default() -> Self {
        Self::center()
    }
}

/// A gesture applied to a resolved element.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Single tap at the element's hit point.
    Tap,
    /// Scroll the element's content by `amount` points.
    Scroll {
        direction: Direction,
        amount: f64,
        start_point: StartPoint,
    },
    /// Scroll until the given content edge is reached.
    ScrollToEdge(Edge),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tap => f.write_str("tap"),
            Action::Scroll { direction, amount, .. } => {
                write!(f, "scroll {} {}", direction.as_str(), amount)
            }
            Action::ScrollToEdge(edge) => write!(f, "scroll to {}", edge.as_str()),
        }
    }
}

/// Reference to an element produced by resolving a selector.
///
/// A handle is only meaningful for the hierarchy it was resolved from;
/// callers that poll re-resolve instead of holding on to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    path: Vec<usize>,
    element: UIElement,
}

impl ElementHandle {
    /// Creates a handle from the element's child-index path and its snapshot.
    pub fn new(path: Vec<usize>, element: UIElement) -> Self {
        Self { path, element }
    }

    /// Child indices leading from the hierarchy roots to the element.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// The element snapshot taken at resolution time.
    pub fn element(&self) -> &UIElement {
        &self.element
    }
}

/// Trait for resolving selectors and acting on the resulting elements.
///
/// Implementors provide [`resolve_all`](ElementQuery::resolve_all) and
/// [`perform`](ElementQuery::perform). Uniqueness checks and the default
/// visibility and interactability assertions are provided on top and read
/// the handle's snapshot; backends with a live view of the element can
/// override them.
pub trait ElementQuery {
    /// Returns every element matching `selector`, in document order.
    ///
    /// A top-level [`Selector::AtIndex`] is not narrowed here; see
    /// [`resolve`](ElementQuery::resolve).
    fn resolve_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, QueryError>;

    /// Applies `action` to the element behind `handle`.
    fn perform(&self, handle: &ElementHandle, action: &Action) -> Result<(), QueryError>;

    /// Resolves `selector` to exactly one element.
    ///
    /// Fails with [`QueryError::NoMatch`] when nothing matches and with
    /// [`QueryError::AmbiguousMatch`] when several elements match. Narrowing
    /// to one of several matches is opt-in through [`Selector::at_index`].
    fn resolve(&self, selector: &Selector) -> Result<ElementHandle, QueryError> {
        let (inner, index) = selector.split_index();
        let mut matches = self.resolve_all(inner)?;
        match index {
            Some(index) if index < matches.len() => Ok(matches.swap_remove(index)),
            Some(_) => Err(QueryError::NoMatch {
                selector: selector.to_string(),
            }),
            None => match matches.len() {
                0 => Err(QueryError::NoMatch {
                    selector: selector.to_string(),
                }),
                1 => Ok(matches.remove(0)),
                count => Err(QueryError::AmbiguousMatch {
                    selector: selector.to_string(),
                    count,
                }),
            },
        }
    }

    /// Fails with [`QueryError::NotVisible`] unless the element is sufficiently visible.
    fn assert_visible(&self, handle: &ElementHandle) -> Result<(), QueryError> {
        if handle.element().is_sufficiently_visible() {
            Ok(())
        } else {
            Err(QueryError::NotVisible {
                element: handle.element().summary(),
            })
        }
    }

    /// Fails with [`QueryError::NotInteractable`] unless the element accepts touches.
    fn assert_interactable(&self, handle: &ElementHandle) -> Result<(), QueryError> {
        if handle.element().is_interactable() {
            Ok(())
        } else {
            Err(QueryError::NotInteractable {
                element: handle.element().summary(),
            })
        }
    }
}

impl<Q: ElementQuery + ?Sized> ElementQuery for &Q {
    fn resolve_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, QueryError> {
        (**self).resolve_all(selector)
    }

    fn perform(&self, handle: &ElementHandle, action: &Action) -> Result<(), QueryError> {
        (**self).perform(handle, action)
    }

    fn resolve(&self, selector: &Selector) -> Result<ElementHandle, QueryError> {
        (**self).resolve(selector)
    }

    fn assert_visible(&self, handle: &ElementHandle) -> Result<(), QueryError> {
        (**self).assert_visible(handle)
    }

    fn assert_interactable(&self, handle: &ElementHandle) -> Result<(), QueryError> {
        (**self).assert_interactable(handle)
    }
}
