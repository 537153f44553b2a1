//! # punchcard-core
//!
//! Core types for Punchcard, a browser-driven timesheet submission tool.
//!
//! Punchcard replays a tabular schedule of work days into a third-party
//! timesheet web application. The target application's DOM is not a stable
//! contract, so the rest of the workspace treats it as an external system
//! discovered at runtime; this crate holds everything that does *not* depend
//! on a live page:
//!
//! - the domain model ([`WorkDayRecord`], [`SubmissionResult`], [`TimeOfDay`])
//! - the unified error type ([`PunchError`])
//! - runtime configuration ([`PunchcardConfig`])
//! - time-string parsing and normalization helpers ([`time`])

mod config;
mod error;
pub mod time;
mod types;

pub use config::PunchcardConfig;
pub use error::{PunchError, Result};
pub use types::*;
