//! Shared test helpers for greyline-core integration tests.
//!
//! [`ScriptedApp`] is a [`TreeSource`] whose hierarchy reacts to gestures and
//! to virtual time: a scrollable list that only shows a page of rows at once,
//! plus a spinner and a banner that come and go on a schedule driven by a
//! [`ManualClock`].

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::time::Duration;

use greyline_core::clock::ManualClock;
use greyline_core::element::{ElementFrame, ElementTrait, UIElement};
use greyline_core::query::{Action, Direction, Edge, QueryError};
use greyline_core::screen::Screen;
use greyline_core::tree::{element_at, TreeQuery, TreeSource};

// ---------------------------------------------------------------------------
// Scripted application
// ---------------------------------------------------------------------------

pub struct ScriptedApp {
    clock: ManualClock,
    rows: usize,
    page: usize,
    horizontal: bool,
    offset: Cell<usize>,
    scrolls: Cell<u32>,
    taps: RefCell<Vec<String>>,
    spinner_until: Option<Duration>,
    banner_from: Option<Duration>,
    banner_until: Option<Duration>,
}

impl ScriptedApp {
    /// An app with a 20-row list showing 5 rows per page.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            rows: 20,
            page: 5,
            horizontal: false,
            offset: Cell::new(0),
            scrolls: Cell::new(0),
            taps: RefCell::new(Vec::new()),
            spinner_until: None,
            banner_from: None,
            banner_until: None,
        }
    }

    pub fn with_rows(mut self, rows: usize, page: usize) -> Self {
        self.rows = rows;
        self.page = page;
        self
    }

    /// Lays the list out as a carousel that scrolls left and right.
    pub fn horizontal(mut self) -> Self {
        self.horizontal = true;
        self
    }

    /// Starts with the list scrolled so that `offset` is the first row shown.
    pub fn scrolled_to(self, offset: usize) -> Self {
        self.offset.set(offset.min(self.max_offset()));
        self
    }

    /// Shows a spinner until `elapsed` of virtual time has passed.
    pub fn spinner_until(mut self, elapsed: Duration) -> Self {
        self.spinner_until = Some(elapsed);
        self
    }

    /// Shows a banner once `elapsed` of virtual time has passed.
    pub fn banner_from(mut self, elapsed: Duration) -> Self {
        self.banner_from = Some(elapsed);
        self
    }

    /// Hides the banner once `elapsed` of virtual time has passed.
    pub fn banner_until(mut self, elapsed: Duration) -> Self {
        self.banner_until = Some(elapsed);
        self
    }

    fn banner_shown(&self, now: Duration) -> bool {
        if self.banner_from.is_none() && self.banner_until.is_none() {
            return false;
        }
        self.banner_from.map_or(true, |from| now >= from)
            && self.banner_until.map_or(true, |until| now < until)
    }

    /// Successful scroll gestures so far.
    pub fn scrolls(&self) -> u32 {
        self.scrolls.get()
    }

    /// Index of the first row on screen.
    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Identifiers of tapped elements, in order.
    pub fn taps(&self) -> Vec<String> {
        self.taps.borrow().clone()
    }

    fn max_offset(&self) -> usize {
        self.rows.saturating_sub(self.page)
    }

    fn row(&self, index: usize) -> UIElement {
        let offset = self.offset.get();
        let on_screen = index >= offset && index < offset + self.page;
        UIElement {
            identifier: Some(format!("row-{}", index)),
            label: Some(format!("Row {}", index)),
            element_type: Some("Cell".to_string()),
            frame: Some(if self.horizontal {
                frame(120.0 * index as f64, 100.0, 120.0, 300.0)
            } else {
                frame(0.0, 100.0 + 60.0 * index as f64, 390.0, 60.0)
            }),
            visible_fraction: Some(if on_screen { 1.0 } else { 0.0 }),
            ..Default::default()
        }
    }

    fn reject(&self, element: &UIElement, action: &Action, reason: &str) -> QueryError {
        QueryError::ActionFailed {
            action: action.to_string(),
            element: element.summary(),
            reason: reason.to_string(),
        }
    }
}

impl TreeSource for ScriptedApp {
    fn snapshot(&self) -> Result<Vec<UIElement>, QueryError> {
        let now = self.clock.elapsed();

        let mut children = vec![UIElement {
            identifier: Some("feed".to_string()),
            element_type: Some("UITableView".to_string()),
            frame: Some(frame(0.0, 100.0, 390.0, 300.0)),
            children: (0..self.rows).map(|i| self.row(i)).collect(),
            ..Default::default()
        }];
        if self.spinner_until.is_some_and(|until| now < until) {
            children.push(UIElement {
                identifier: Some("spinner".to_string()),
                element_type: Some("ActivityIndicator".to_string()),
                frame: Some(frame(175.0, 400.0, 40.0, 40.0)),
                ..Default::default()
            });
        }
        if self.banner_shown(now) {
            children.push(UIElement {
                identifier: Some("banner".to_string()),
                label: Some("Saved".to_string()),
                frame: Some(frame(0.0, 44.0, 390.0, 56.0)),
                traits: vec![ElementTrait::StaticText],
                ..Default::default()
            });
        }

        Ok(vec![UIElement {
            element_type: Some("Window".to_string()),
            frame: Some(frame(0.0, 0.0, 390.0, 844.0)),
            key_window: true,
            children,
            ..Default::default()
        }])
    }

    fn perform(&self, path: &[usize], element: &UIElement, action: &Action) -> Result<(), QueryError> {
        match action {
            Action::Tap => {
                // Tap whatever is at that path now, not what the lookup saw.
                let roots = self.snapshot()?;
                let current = element_at(&roots, path)
                    .ok_or_else(|| self.reject(element, action, "element no longer exists"))?;
                if !current.is_interactable() {
                    return Err(self.reject(current, action, "element is not interactable"));
                }
                let name = current.identifier.clone().unwrap_or_else(|| current.summary());
                self.taps.borrow_mut().push(name);
                Ok(())
            }
            Action::Scroll { direction, .. } => {
                let offset = self.offset.get();
                let (forward, backward) = if self.horizontal {
                    (Direction::Right, Direction::Left)
                } else {
                    (Direction::Down, Direction::Up)
                };
                let next = if *direction == forward && offset < self.max_offset() {
                    offset + 1
                } else if *direction == backward && offset > 0 {
                    offset - 1
                } else if *direction == forward || *direction == backward {
                    return Err(self.reject(element, action, "reached content edge"));
                } else if self.horizontal {
                    return Err(self.reject(element, action, "not vertically scrollable"));
                } else {
                    return Err(self.reject(element, action, "not horizontally scrollable"));
                };
                self.offset.set(next);
                self.scrolls.set(self.scrolls.get() + 1);
                Ok(())
            }
            Action::ScrollToEdge(edge) => match (self.horizontal, edge) {
                (false, Edge::Top) | (true, Edge::Left) => {
                    self.offset.set(0);
                    Ok(())
                }
                (false, Edge::Bottom) | (true, Edge::Right) => {
                    self.offset.set(self.max_offset());
                    Ok(())
                }
                _ => Err(self.reject(element, action, "edge is not along the scroll axis")),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Screen construction
// ---------------------------------------------------------------------------

pub type ScriptedScreen = Screen<TreeQuery<ScriptedApp>, ManualClock>;

/// Builds a screen over `app` that shares `clock` with it.
pub fn scripted_screen(clock: &ManualClock, app: ScriptedApp) -> ScriptedScreen {
    Screen::with_clock(TreeQuery::new(app), clock.clone())
}

/// The app driving `screen`.
pub fn app(screen: &ScriptedScreen) -> &ScriptedApp {
    screen.query().source()
}

pub fn frame(x: f64, y: f64, width: f64, height: f64) -> ElementFrame {
    ElementFrame { x, y, width, height }
}
