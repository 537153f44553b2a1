//! Browser automation error types - re-exports the unified PunchError
//!
//! All browser errors use the unified PunchError type:
//! - Browser(String) - session-level failures (connect, navigation, CDP, screenshots)
//! - ElementNotFound(String) - every resolution strategy for a field exhausted
//! - Input(String) - a control rejected or silently dropped a value
//!
//! Error messages should be descriptive and include context about the operation that failed.

pub use punchcard_core::{PunchError, Result};
