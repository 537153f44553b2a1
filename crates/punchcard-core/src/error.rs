//! Unified error types for Punchcard

use thiserror::Error;

/// Unified error type for all Punchcard operations
#[derive(Error, Debug)]
pub enum PunchError {
    // Browser/session errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Input rejected by control: {0}")]
    Input(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    // Schedule/input errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    // Target-application validation errors
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using PunchError
pub type Result<T> = std::result::Result<T, PunchError>;
