//! Polling condition waits.
//!
//! [`ConditionWaiter`] evaluates a named [`WaitCondition`] at a fixed poll
//! interval until it holds or the timeout elapses. It never fails by itself:
//! the result is a [`WaitOutcome`] that keeps the last evaluation error for
//! diagnostics, and the caller decides whether an unsatisfied outcome fails
//! the test (see [`WaitOutcome::into_result`]).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use greyline_core::clock::ManualClock;
//! use greyline_core::query::QueryError;
//! use greyline_core::wait::{ConditionWaiter, WaitCondition, WaitOptions};
//!
//! let clock = ManualClock::new();
//! let waiter = ConditionWaiter::new(clock.clone());
//! let options = WaitOptions::new(Duration::from_secs(2), Duration::from_millis(500)).unwrap();
//!
//! let observer = clock.clone();
//! let condition = WaitCondition::new("spinner to stop", move || {
//!     if observer.elapsed() >= Duration::from_millis(300) {
//!         Ok(())
//!     } else {
//!         Err(QueryError::Backend("still spinning".to_string()))
//!     }
//! });
//!
//! let outcome = waiter.wait(condition, &options);
//! assert!(outcome.satisfied);
//! assert_eq!(outcome.elapsed, Duration::from_millis(500));
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, debug_span, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::ConfigError;
use crate::query::{ElementQuery, QueryError};
use crate::selector::Selector;

/// Default timeout for waits (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval (500ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Timeout and poll interval for a wait. Both are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitOptions {
    /// Creates wait options, rejecting zero durations.
    ///
    /// A poll interval at or above the timeout is accepted and degenerates
    /// to a single evaluation followed by one final check at the deadline.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::NonPositiveDuration { field: "timeout" });
        }
        if poll_interval.is_zero() {
            return Err(ConfigError::NonPositiveDuration { field: "poll_interval" });
        }
        Ok(Self { timeout, poll_interval })
    }

    /// Options with the given timeout and the default poll interval.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// The same poll interval with a different timeout.
    ///
    /// A zero timeout is raised to one millisecond, so the condition is
    /// still evaluated at least once.
    pub fn retimed(self, timeout: Duration) -> Self {
        Self {
            timeout: timeout.max(Duration::from_millis(1)),
            ..self
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A named predicate polled by [`ConditionWaiter`].
///
/// `evaluate` returning `Ok(())` means the condition holds; any error means
/// "not yet". It may run any number of times, so it must only observe.
pub struct WaitCondition<F> {
    name: String,
    evaluate: F,
}

impl<F> WaitCondition<F>
where
    F: FnMut() -> Result<(), QueryError>,
{
    pub fn new(name: impl Into<String>, evaluate: F) -> Self {
        Self {
            name: name.into(),
            evaluate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for WaitCondition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitCondition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Result of a single wait.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    /// Name of the condition that was waited for.
    pub condition: String,
    /// Whether the condition held before the timeout.
    pub satisfied: bool,
    /// Time from the first evaluation to the returning one.
    pub elapsed: Duration,
    /// Error from the most recent failed evaluation, if any.
    ///
    /// Always `None` when `satisfied` is true.
    pub last_error: Option<QueryError>,
    /// Number of evaluations performed.
    pub polls: u32,
}

impl WaitOutcome {
    /// Converts an unsatisfied outcome into a [`WaitTimeout`] error.
    ///
    /// Returns the elapsed time on success.
    pub fn into_result(self) -> Result<Duration, WaitTimeout> {
        if self.satisfied {
            Ok(self.elapsed)
        } else {
            Err(WaitTimeout {
                condition: self.condition,
                elapsed: self.elapsed,
                last_error: self.last_error,
            })
        }
    }
}

/// A wait that ran out of time.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Fail to wait for {condition} after {:.1}s{}", .elapsed.as_secs_f64(), last_error_suffix(.last_error))]
pub struct WaitTimeout {
    /// Name of the condition that timed out.
    pub condition: String,
    /// How long the waiter polled.
    pub elapsed: Duration,
    /// Error from the final evaluation.
    pub last_error: Option<QueryError>,
}

fn last_error_suffix(last_error: &Option<QueryError>) -> String {
    match last_error {
        Some(err) => format!(", last error: {}", err),
        None => String::new(),
    }
}

/// Polls conditions against an injected [`Clock`].
#[derive(Debug, Clone, Default)]
pub struct ConditionWaiter<C = SystemClock> {
    clock: C,
}

impl<C: Clock> ConditionWaiter<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Polls `condition` until it holds or `options.timeout()` elapses.
    ///
    /// Returns as soon as an evaluation succeeds, without sleeping after it.
    /// After a failed evaluation the waiter sleeps one poll interval (cut
    /// short at the deadline) and tries again. The last evaluation happens
    /// at or after the deadline, so an unsatisfied outcome always reports
    /// `elapsed >= timeout`.
    pub fn wait<F>(&self, mut condition: WaitCondition<F>, options: &WaitOptions) -> WaitOutcome
    where
        F: FnMut() -> Result<(), QueryError>,
    {
        let span = debug_span!(
            "wait",
            condition = %condition.name,
            timeout_ms = duration_millis(options.timeout)
        );
        let _guard = span.enter();

        let start = self.clock.now();
        let mut polls = 0;
        let mut last_error = None;

        loop {
            polls += 1;
            match (condition.evaluate)() {
                Ok(()) => {
                    let elapsed = self.clock.now().saturating_duration_since(start);
                    debug!(polls, elapsed_ms = duration_millis(elapsed), "condition satisfied");
                    return WaitOutcome {
                        condition: condition.name,
                        satisfied: true,
                        elapsed,
                        last_error: None,
                        polls,
                    };
                }
                Err(e) => {
                    trace!(poll = polls, error = %e, "condition not yet satisfied");
                    last_error = Some(e);
                }
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= options.timeout {
                debug!(polls, elapsed_ms = duration_millis(elapsed), "condition timed out");
                return WaitOutcome {
                    condition: condition.name,
                    satisfied: false,
                    elapsed,
                    last_error,
                    polls,
                };
            }

            self.clock
                .sleep(options.poll_interval.min(options.timeout - elapsed));
        }
    }
}

/// Condition that holds once `selector` no longer resolves to a visible element.
///
/// A selector that matches nothing counts as gone. Other lookup errors, such
/// as several elements matching, count as "not yet".
pub fn until_gone<'a, Q>(
    query: &'a Q,
    selector: &'a Selector,
    name: impl Into<String>,
) -> WaitCondition<impl FnMut() -> Result<(), QueryError> + 'a>
where
    Q: ElementQuery + ?Sized,
{
    WaitCondition::new(name, move || match query.resolve(selector) {
        Err(e) if e.is_no_match() => Ok(()),
        Err(e) => Err(e),
        Ok(handle) => match query.assert_visible(&handle) {
            Ok(()) => Err(QueryError::StillVisible {
                element: handle.element().summary(),
            }),
            Err(_) => Ok(()),
        },
    })
}

/// Condition that holds once `selector` resolves to a visible element.
///
/// A selector that matches nothing yet counts as "not yet".
pub fn until_appears<'a, Q>(
    query: &'a Q,
    selector: &'a Selector,
    name: impl Into<String>,
) -> WaitCondition<impl FnMut() -> Result<(), QueryError> + 'a>
where
    Q: ElementQuery + ?Sized,
{
    WaitCondition::new(name, move || {
        let handle = query.resolve(selector)?;
        query.assert_visible(&handle)
    })
}
