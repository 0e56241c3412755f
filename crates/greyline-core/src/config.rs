//! Persistent configuration for greyline.
//!
//! Stores wait and scroll defaults in `~/.greyline/config.json`. Every field
//! is optional in the file; missing fields take the built-in defaults
//! (10s timeout, 500ms poll interval, 300pt scrolls, 10 scroll attempts).
//!
//! # Example
//!
//! ```no_run
//! use greyline_core::config::GreylineConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = GreylineConfig::load();
//!
//! let options = config.wait_options().expect("invalid wait settings");
//! println!("waiting up to {:?}", options.timeout());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::query::DEFAULT_SCROLL_AMOUNT;
use crate::wait::{duration_millis, WaitOptions, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};

const CONFIG_FILENAME: &str = "config.json";

/// Default bound on scrolls performed by a scroll-view search.
pub const DEFAULT_MAX_SCROLL_ATTEMPTS: u32 = 10;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    NonPositiveDuration {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// The scroll amount was zero, negative or not a number.
    #[error("scroll_amount must be a positive number (got {0})")]
    InvalidScrollAmount(f64),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or produce JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns the greyline home directory (`~/.greyline`).
///
/// Falls back to the current directory when no home directory is known.
pub fn greyline_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".greyline")
}

/// Persistent greyline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreylineConfig {
    /// Default wait timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Interval between condition evaluations in milliseconds.
    pub poll_interval_ms: u64,
    /// Distance of one search or scroll step, in points.
    pub scroll_amount: f64,
    /// Maximum scrolls performed while searching a scroll view.
    pub max_scroll_attempts: u32,
}

impl Default for GreylineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: duration_millis(DEFAULT_TIMEOUT),
            poll_interval_ms: duration_millis(DEFAULT_POLL_INTERVAL),
            scroll_amount: DEFAULT_SCROLL_AMOUNT,
            max_scroll_attempts: DEFAULT_MAX_SCROLL_ATTEMPTS,
        }
    }
}

impl GreylineConfig {
    /// Path of the user config file (`~/.greyline/config.json`).
    pub fn default_path() -> PathBuf {
        greyline_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.greyline/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_or_default(&Self::default_path())
    }

    /// Load config from `path`, falling back to [`Default`] on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path, reporting any failure.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Save config to `~/.greyline/config.json`.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path())
    }

    /// Wait options built from the timeout and poll interval settings.
    pub fn wait_options(&self) -> Result<WaitOptions, ConfigError> {
        WaitOptions::new(
            Duration::from_millis(self.default_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    /// Checks every setting, not only the wait durations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wait_options()?;
        if self.scroll_amount.is_nan() || self.scroll_amount <= 0.0 {
            return Err(ConfigError::InvalidScrollAmount(self.scroll_amount));
        }
        Ok(())
    }
}
