//! Configuration for a Punchcard run
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) yields a working configuration against a local Chrome
//! started with `--remote-debugging-port=9222`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PunchError, Result};
use crate::types::TimeOfDay;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunchcardConfig {
    /// Chrome DevTools Protocol port of the already-authenticated browser
    #[serde(default = "default_debugger_port")]
    pub debugger_port: u16,

    /// Reload the page before every Nth record to counter session decay
    #[serde(default = "default_session_refresh_interval")]
    pub session_refresh_interval: usize,

    /// Attempts per day before recording a failure
    #[serde(default = "default_max_day_attempts")]
    pub max_day_attempts: usize,

    /// End times past this are forced down to avoid the target system's
    /// night-work validation ("HH:MM")
    #[serde(default = "default_end_time_ceiling")]
    pub end_time_ceiling: String,

    /// Seconds to let the page settle after triggering a calculation
    #[serde(default = "default_calculate_settle_secs")]
    pub calculate_settle_secs: u64,

    /// Timeout for full page loads, in seconds
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,

    /// Timeout for individual element lookups, in seconds
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,

    /// Timeout for quick existence probes, in seconds
    #[serde(default = "default_quick_timeout_secs")]
    pub quick_timeout_secs: u64,

    /// Where failure screenshots are written
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Where result CSVs are written
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for PunchcardConfig {
    fn default() -> Self {
        Self {
            debugger_port: default_debugger_port(),
            session_refresh_interval: default_session_refresh_interval(),
            max_day_attempts: default_max_day_attempts(),
            end_time_ceiling: default_end_time_ceiling(),
            calculate_settle_secs: default_calculate_settle_secs(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
            element_timeout_secs: default_element_timeout_secs(),
            quick_timeout_secs: default_quick_timeout_secs(),
            screenshot_dir: default_screenshot_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl PunchcardConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PunchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from a file if it exists, else defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The parsed end-time ceiling
    pub fn ceiling(&self) -> Result<TimeOfDay> {
        self.end_time_ceiling
            .parse()
            .map_err(|_| PunchError::Config(format!("bad end_time_ceiling: {}", self.end_time_ceiling)))
    }
}

// Default value providers

fn default_debugger_port() -> u16 {
    9222
}

fn default_session_refresh_interval() -> usize {
    5
}

fn default_max_day_attempts() -> usize {
    2
}

fn default_end_time_ceiling() -> String {
    "22:00".to_string()
}

fn default_calculate_settle_secs() -> u64 {
    3
}

fn default_page_load_timeout_secs() -> u64 {
    30
}

fn default_element_timeout_secs() -> u64 {
    10
}

fn default_quick_timeout_secs() -> u64 {
    5
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("logs/screenshots")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("logs")
}
