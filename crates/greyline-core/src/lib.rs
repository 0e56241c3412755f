//! # greyline-core
//!
//! Synchronization and element-query toolkit for UI tests.
//!
//! This crate lets a test describe on-screen elements with composable
//! selectors, act on them (tap, scroll, search inside scroll views), and
//! block until they appear or disappear, polling at a fixed interval against
//! an injectable clock.
//!
//! ## Modules
//!
//! - [`element`] - Accessibility element snapshots and visibility rules
//! - [`selector`] - Composable element predicates and the default-filtered builders
//! - [`query`] - The [`ElementQuery`](query::ElementQuery) seam, actions and lookup errors
//! - [`tree`] - An `ElementQuery` over hierarchy snapshots (in memory or JSON on disk)
//! - [`clock`] - Wall and virtual clocks for waits
//! - [`wait`] - The polling [`ConditionWaiter`](wait::ConditionWaiter) and its outcomes
//! - [`screen`] - Test-facing facade combining queries, gestures and waits
//! - [`action`] - Action records for diagnostics
//! - [`config`] - Persistent wait and scroll defaults
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use greyline_core::screen::Screen;
//! use greyline_core::selector::{element_by_class, raw_by_id};
//! use greyline_core::tree::{FileTree, TreeQuery};
//!
//! // An agent keeps this file in sync with the app under test.
//! let screen = Screen::new(TreeQuery::new(FileTree::new("/tmp/hierarchy.json")));
//!
//! screen.assert_key_window_visible().expect("app is not in the foreground");
//! screen
//!     .search_downward(&raw_by_id("settings-row"), &element_by_class("UITableView"))
//!     .expect("settings row not found");
//! screen.tap_id("settings-row").expect("tap failed");
//! screen
//!     .wait_until_gone_by_id("loading-spinner", Duration::from_secs(10))
//!     .into_result()
//!     .expect("still loading");
//! ```

pub mod action;
pub mod clock;
pub mod config;
pub mod element;
pub mod query;
pub mod screen;
pub mod selector;
pub mod tree;
pub mod wait;
