//! Submission engine for Punchcard
//!
//! Everything between a validated schedule and a submitted timesheet lives
//! here: the percentage allocation engine, the single-day submission state
//! machine, the batch driver with session refresh and recovery, and the
//! append-only result log.
//!
//! # Architecture
//!
//! - [`allocate`]: pure percentage-to-minutes distribution
//! - [`day`]: the ordered per-day submission sequence
//! - [`batch`]: iteration, retry, recovery and next-day navigation;
//!   owns the browser session for the whole run
//! - [`results`]: append-only outcome log with CSV persistence
//! - [`retry`]: the one bounded-backoff retry combinator everything uses

pub mod allocate;
pub mod batch;
pub mod day;
pub mod results;
pub mod retry;

// Re-export commonly used types
pub use batch::BatchDriver;
pub use day::{DayOutcome, DayRunner, ErrorVerdict};
pub use results::{ResultLog, Summary};
pub use retry::retry_with_backoff;
