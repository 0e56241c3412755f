//! Test-facing facade over an [`ElementQuery`].
//!
//! A [`Screen`] bundles an element query backend, a [`Clock`] and the wait
//! and scroll settings, and exposes the operations UI tests are written
//! against: taps, scrolls, scroll-view searches, appear/disappear waits and
//! the key-window precondition. Every operation is recorded in an action
//! log (see [`Screen::action_log`]).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use greyline_core::clock::ManualClock;
//! use greyline_core::element::{ElementFrame, UIElement};
//! use greyline_core::screen::Screen;
//! use greyline_core::tree::{StaticTree, TreeQuery};
//!
//! let window = UIElement {
//!     key_window: true,
//!     frame: Some(ElementFrame { x: 0.0, y: 0.0, width: 390.0, height: 844.0 }),
//!     ..Default::default()
//! };
//! let screen = Screen::with_clock(TreeQuery::new(StaticTree::new(vec![window])), ManualClock::new());
//!
//! screen.assert_key_window_visible().unwrap();
//!
//! // Nothing with this id exists, so it is already gone.
//! let outcome = screen.wait_until_gone_by_id("spinner", Duration::from_secs(10));
//! assert!(outcome.satisfied);
//! assert_eq!(screen.action_log().len(), 2);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, info_span};

use crate::action::{ActionLog, ActionResult, ActionType};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, GreylineConfig, DEFAULT_MAX_SCROLL_ATTEMPTS};
use crate::query::{
    Action, Direction, ElementHandle, ElementQuery, Edge, QueryError, StartPoint,
    DEFAULT_SCROLL_AMOUNT,
};
use crate::selector::{element_by_id, element_by_text, Selector};
use crate::wait::{
    duration_millis, until_appears, until_gone, ConditionWaiter, WaitOptions, WaitOutcome,
    WaitTimeout,
};

/// Maximum number of action log entries to retain.
const MAX_ACTION_LOG_SIZE: usize = 1000;

/// Entry point for UI test interactions.
pub struct Screen<Q, C = SystemClock> {
    query: Q,
    waiter: ConditionWaiter<C>,
    wait_options: WaitOptions,
    scroll_amount: f64,
    max_scroll_attempts: u32,
    log: RefCell<VecDeque<ActionLog>>,
}

impl<Q: ElementQuery> Screen<Q, SystemClock> {
    /// Creates a screen using the wall clock and built-in defaults.
    pub fn new(query: Q) -> Self {
        Self::with_clock(query, SystemClock)
    }
}

impl<Q: ElementQuery, C: Clock> Screen<Q, C> {
    /// Creates a screen with an explicit clock and built-in defaults.
    pub fn with_clock(query: Q, clock: C) -> Self {
        Self {
            query,
            waiter: ConditionWaiter::new(clock),
            wait_options: WaitOptions::default(),
            scroll_amount: DEFAULT_SCROLL_AMOUNT,
            max_scroll_attempts: DEFAULT_MAX_SCROLL_ATTEMPTS,
            log: RefCell::new(VecDeque::new()),
        }
    }

    /// Applies the wait and scroll settings from `config`.
    pub fn configured(mut self, config: &GreylineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.wait_options = config.wait_options()?;
        self.scroll_amount = config.scroll_amount;
        self.max_scroll_attempts = config.max_scroll_attempts;
        Ok(self)
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn clock(&self) -> &C {
        self.waiter.clock()
    }

    /// The timeout used when a test does not pick one.
    pub fn default_timeout(&self) -> Duration {
        self.wait_options.timeout()
    }

    /// Snapshot of the recorded actions, oldest first.
    pub fn action_log(&self) -> Vec<ActionLog> {
        self.log.borrow().iter().cloned().collect()
    }

    /// Removes and returns the recorded actions.
    pub fn take_action_log(&self) -> Vec<ActionLog> {
        self.log.borrow_mut().drain(..).collect()
    }

    // -----------------------------------------------------------------------
    // Lookups and actions
    // -----------------------------------------------------------------------

    /// Resolves `selector` to exactly one element.
    pub fn element(&self, selector: &Selector) -> Result<ElementHandle, QueryError> {
        self.query.resolve(selector)
    }

    /// Taps the element matching `selector`.
    pub fn tap(&self, selector: &Selector) -> Result<(), QueryError> {
        self.record(
            ActionType::Tap {
                selector: selector.to_string(),
            },
            || {
                let handle = self.query.resolve(selector)?;
                self.query.perform(&handle, &Action::Tap)
            },
        )
    }

    /// Taps the visible, interactable element with accessibility id `id`.
    pub fn tap_id(&self, id: &str) -> Result<(), QueryError> {
        self.tap(&element_by_id(id))
    }

    /// Taps the visible, interactable element showing `text`.
    pub fn tap_text(&self, text: &str) -> Result<(), QueryError> {
        self.tap(&element_by_text(text))
    }

    /// Scrolls the container down by `amount` points, starting at its center.
    pub fn scroll_down(&self, container: &Selector, amount: f64) -> Result<(), QueryError> {
        self.scroll(container, Direction::Down, amount)
    }

    /// Scrolls the container up by `amount` points, starting at its center.
    pub fn scroll_up(&self, container: &Selector, amount: f64) -> Result<(), QueryError> {
        self.scroll(container, Direction::Up, amount)
    }

    /// Scrolls the container in `direction` by `amount` points.
    pub fn scroll(&self, container: &Selector, direction: Direction, amount: f64) -> Result<(), QueryError> {
        self.record(
            ActionType::Scroll {
                container: container.to_string(),
                direction: direction.as_str().to_string(),
                amount,
            },
            || {
                let handle = self.query.resolve(container)?;
                self.query.perform(
                    &handle,
                    &Action::Scroll {
                        direction,
                        amount,
                        start_point: StartPoint::center(),
                    },
                )
            },
        )
    }

    /// Scrolls the container until its top content edge is reached.
    pub fn scroll_to_top(&self, container: &Selector) -> Result<(), QueryError> {
        self.scroll_to_edge(container, Edge::Top)
    }

    /// Scrolls the container until its bottom content edge is reached.
    pub fn scroll_to_bottom(&self, container: &Selector) -> Result<(), QueryError> {
        self.scroll_to_edge(container, Edge::Bottom)
    }

    fn scroll_to_edge(&self, container: &Selector, edge: Edge) -> Result<(), QueryError> {
        self.record(
            ActionType::ScrollToEdge {
                container: container.to_string(),
                edge: edge.as_str().to_string(),
            },
            || {
                let handle = self.query.resolve(container)?;
                self.query.perform(&handle, &Action::ScrollToEdge(edge))
            },
        )
    }

    // -----------------------------------------------------------------------
    // Scroll-view search
    // -----------------------------------------------------------------------

    /// Scrolls `container` until `target` resolves to an interactable element.
    ///
    /// `target` should be a raw selector (see [`raw_by_id`](crate::selector::raw_by_id)):
    /// the element usually starts off-screen, so a visibility filter would
    /// hide it from the lookup. The search is bounded by the configured
    /// number of scroll attempts rather than by time. It fails with
    /// [`QueryError::ElementNotFoundAfterSearch`] when the attempts run out
    /// or when the container refuses to scroll further.
    pub fn search_in_scroll_view(
        &self,
        target: &Selector,
        container: &Selector,
        direction: Direction,
        amount: f64,
        start_point: StartPoint,
    ) -> Result<ElementHandle, QueryError> {
        self.record(
            ActionType::Search {
                target: target.to_string(),
                container: container.to_string(),
                direction: direction.as_str().to_string(),
            },
            || {
                let scroll = Action::Scroll {
                    direction,
                    amount,
                    start_point,
                };
                self.search(target, container, &scroll)
            },
        )
    }

    fn search(&self, target: &Selector, container: &Selector, scroll: &Action) -> Result<ElementHandle, QueryError> {
        let mut attempts = 0;
        loop {
            match self.query.resolve(target) {
                Ok(handle) if self.query.assert_interactable(&handle).is_ok() => {
                    debug!(attempts, "search target found");
                    return Ok(handle);
                }
                Ok(_) => {}
                Err(e) if e.is_no_match() => {}
                Err(e) => return Err(e),
            }

            if attempts >= self.max_scroll_attempts {
                return Err(QueryError::ElementNotFoundAfterSearch {
                    selector: target.to_string(),
                    attempts,
                });
            }

            let handle = self.query.resolve(container)?;
            match self.query.perform(&handle, scroll) {
                Ok(()) => attempts += 1,
                Err(QueryError::ActionFailed { reason, .. }) => {
                    debug!(attempts, %reason, "container stopped scrolling");
                    return Err(QueryError::ElementNotFoundAfterSearch {
                        selector: target.to_string(),
                        attempts,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Searches downward (content moves up) from the container's center.
    pub fn search_downward(&self, target: &Selector, container: &Selector) -> Result<ElementHandle, QueryError> {
        self.search_in_scroll_view(target, container, Direction::Down, self.scroll_amount, StartPoint::center())
    }

    /// Searches upward from the container's center.
    pub fn search_upward(&self, target: &Selector, container: &Selector) -> Result<ElementHandle, QueryError> {
        self.search_in_scroll_view(target, container, Direction::Up, self.scroll_amount, StartPoint::center())
    }

    /// Searches to the left from the container's center.
    pub fn search_left(&self, target: &Selector, container: &Selector) -> Result<ElementHandle, QueryError> {
        self.search_in_scroll_view(target, container, Direction::Left, self.scroll_amount, StartPoint::center())
    }

    /// Searches to the right (content moves left) from the container's center.
    pub fn search_right(&self, target: &Selector, container: &Selector) -> Result<ElementHandle, QueryError> {
        self.search_in_scroll_view(target, container, Direction::Right, self.scroll_amount, StartPoint::center())
    }

    // -----------------------------------------------------------------------
    // Waits
    // -----------------------------------------------------------------------

    /// Waits until `selector` no longer resolves to a visible element.
    pub fn wait_until_gone(&self, selector: &Selector, timeout: Duration) -> WaitOutcome {
        self.wait_gone_named(selector, timeout, format!("element matching {} to disappear", selector))
    }

    /// Waits until `selector` resolves to a visible element.
    pub fn wait_until_appears(&self, selector: &Selector, timeout: Duration) -> WaitOutcome {
        self.wait_appears_named(selector, timeout, format!("element matching {} to appear", selector))
    }

    /// Waits until the element with accessibility id `id` is gone.
    pub fn wait_until_gone_by_id(&self, id: &str, timeout: Duration) -> WaitOutcome {
        self.wait_gone_named(&element_by_id(id), timeout, format!("element with id `{}` to disappear", id))
    }

    /// Waits until the element showing `text` is gone.
    pub fn wait_until_gone_by_text(&self, text: &str, timeout: Duration) -> WaitOutcome {
        self.wait_gone_named(&element_by_text(text), timeout, format!("element with text `{}` to disappear", text))
    }

    /// Waits until the element with accessibility id `id` appears.
    pub fn wait_until_appears_by_id(&self, id: &str, timeout: Duration) -> WaitOutcome {
        self.wait_appears_named(&element_by_id(id), timeout, format!("element with id `{}` to appear", id))
    }

    /// Waits until the element showing `text` appears.
    pub fn wait_until_appears_by_text(&self, text: &str, timeout: Duration) -> WaitOutcome {
        self.wait_appears_named(&element_by_text(text), timeout, format!("element with text `{}` to appear", text))
    }

    /// Like [`wait_until_gone`](Self::wait_until_gone), failing with [`WaitTimeout`].
    pub fn expect_gone(&self, selector: &Selector, timeout: Duration) -> Result<Duration, WaitTimeout> {
        self.wait_until_gone(selector, timeout).into_result()
    }

    /// Like [`wait_until_appears`](Self::wait_until_appears), failing with [`WaitTimeout`].
    pub fn expect_appears(&self, selector: &Selector, timeout: Duration) -> Result<Duration, WaitTimeout> {
        self.wait_until_appears(selector, timeout).into_result()
    }

    fn wait_gone_named(&self, selector: &Selector, timeout: Duration, name: String) -> WaitOutcome {
        let action = ActionType::WaitUntilGone {
            selector: selector.to_string(),
            timeout_ms: duration_millis(timeout),
        };
        let options = self.wait_options.retimed(timeout);
        self.record_wait(action, || {
            self.waiter.wait(until_gone(&self.query, selector, name), &options)
        })
    }

    fn wait_appears_named(&self, selector: &Selector, timeout: Duration, name: String) -> WaitOutcome {
        let action = ActionType::WaitUntilAppears {
            selector: selector.to_string(),
            timeout_ms: duration_millis(timeout),
        };
        let options = self.wait_options.retimed(timeout);
        self.record_wait(action, || {
            self.waiter.wait(until_appears(&self.query, selector, name), &options)
        })
    }

    // -----------------------------------------------------------------------
    // Preconditions
    // -----------------------------------------------------------------------

    /// Checks that the application's key window is on screen.
    ///
    /// Meant to run once at the start of a test session.
    pub fn assert_key_window_visible(&self) -> Result<(), QueryError> {
        self.record(ActionType::AssertKeyWindowVisible, || {
            let handle = self.query.resolve(&Selector::KeyWindow)?;
            self.query.assert_visible(&handle)
        })
    }

    // -----------------------------------------------------------------------
    // Action log
    // -----------------------------------------------------------------------

    fn record<T, E: Display>(&self, action: ActionType, op: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let span = info_span!("screen_action", action = action.name());
        let _guard = span.enter();
        let start = self.clock().now();
        let result = op();
        let elapsed = self.clock().now().saturating_duration_since(start);
        let logged = match &result {
            Ok(_) => ActionResult::Success,
            Err(e) => ActionResult::Failure(e.to_string()),
        };
        debug!(elapsed_ms = duration_millis(elapsed), success = result.is_ok(), "action complete");
        self.push_log(ActionLog::new(action, logged, Some(duration_millis(elapsed))));
        result
    }

    fn record_wait(&self, action: ActionType, op: impl FnOnce() -> WaitOutcome) -> WaitOutcome {
        let span = info_span!("screen_action", action = action.name());
        let _guard = span.enter();
        let outcome = op();
        let logged = match outcome.clone().into_result() {
            Ok(_) => ActionResult::Success,
            Err(e) => ActionResult::Failure(e.to_string()),
        };
        debug!(elapsed_ms = duration_millis(outcome.elapsed), success = outcome.satisfied, "action complete");
        self.push_log(ActionLog::new(action, logged, Some(duration_millis(outcome.elapsed))));
        outcome
    }

    fn push_log(&self, entry: ActionLog) {
        let mut log = self.log.borrow_mut();
        if log.len() >= MAX_ACTION_LOG_SIZE {
            log.pop_front();
        }
        log.push_back(entry);
    }
}
