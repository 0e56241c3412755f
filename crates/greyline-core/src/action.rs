//! Action records for test diagnostics.
//!
//! Every operation performed through a [`Screen`](crate::screen::Screen) is
//! recorded as an [`ActionLog`] entry. When a test fails, the log shows what
//! happened before the failure and how long each step took.
//!
//! # Example
//!
//! ```
//! use greyline_core::action::{ActionType, ActionResult, ActionLog};
//!
//! let action = ActionType::Tap {
//!     selector: "id `login-button`".to_string(),
//! };
//!
//! let log = ActionLog::new(action, ActionResult::Success, Some(12));
//! println!("Action {} at {}", log.id, log.timestamp);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The result of executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionResult {
    /// The action completed successfully.
    Success,

    /// The action failed with the given error message.
    Failure(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success)
    }
}

/// Operations recorded by a screen.
///
/// Selectors are stored as their display form so entries stay readable
/// once serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Tap an element.
    Tap {
        /// The element selector.
        selector: String,
    },

    /// Scroll a container by a fixed amount.
    Scroll {
        /// The scroll container selector.
        container: String,
        /// Direction: "up", "down", "left", or "right".
        direction: String,
        /// Distance in points.
        amount: f64,
    },

    /// Scroll a container to one of its content edges.
    ScrollToEdge {
        /// The scroll container selector.
        container: String,
        /// Edge: "top", "bottom", "left", or "right".
        edge: String,
    },

    /// Scroll a container until a target element becomes interactable.
    Search {
        /// The search target selector.
        target: String,
        /// The scroll container selector.
        container: String,
        /// Direction: "up", "down", "left", or "right".
        direction: String,
    },

    /// Wait for an element to appear.
    WaitUntilAppears {
        /// The element selector.
        selector: String,
        /// Maximum time to wait in milliseconds.
        timeout_ms: u64,
    },

    /// Wait for an element to disappear.
    WaitUntilGone {
        /// The element selector.
        selector: String,
        /// Maximum time to wait in milliseconds.
        timeout_ms: u64,
    },

    /// Check that the key window is on screen.
    AssertKeyWindowVisible,
}

impl ActionType {
    /// Returns a short, static name for this action type suitable for use in
    /// tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Tap { .. } => "tap",
            ActionType::Scroll { .. } => "scroll",
            ActionType::ScrollToEdge { .. } => "scroll_to_edge",
            ActionType::Search { .. } => "search",
            ActionType::WaitUntilAppears { .. } => "wait_until_appears",
            ActionType::WaitUntilGone { .. } => "wait_until_gone",
            ActionType::AssertKeyWindowVisible => "assert_key_window_visible",
        }
    }
}

/// A logged action with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the action finished.
    pub timestamp: DateTime<Utc>,

    /// The action that was performed.
    pub action: ActionType,

    /// The result of the action.
    pub result: ActionResult,

    /// How long the action took in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActionLog {
    /// Creates a new action log entry with a fresh id and the current time.
    pub fn new(action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
            duration_ms,
        }
    }
}
