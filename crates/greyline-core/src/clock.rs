//! Time source and sleep capability for polling.
//!
//! The waiter never reads the system clock directly. It asks a [`Clock`],
//! which lets tests drive polling loops in virtual time with
//! [`ManualClock`] while real runs use [`SystemClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source that can block the caller.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock that only moves when slept on or advanced.
///
/// Clones share the same timeline, so a test can hand one clone to the
/// waiter and keep another to script when conditions change.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
    sleeps: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
            sleeps: Rc::new(Cell::new(0)),
        }
    }

    /// Moves the clock forward without counting a sleep.
    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    /// Virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of [`Clock::sleep`] calls observed so far.
    pub fn sleep_count(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
