//! Schedule ingestion for Punchcard
//!
//! Reads, validates and filters the schedule CSV ([`schedule`]) and
//! generates starter templates ([`template`]). Nothing in this crate
//! touches the browser; a schedule that fails validation never starts a
//! batch.

pub mod schedule;
pub mod template;

// Re-export commonly used types
pub use schedule::Schedule;
pub use template::write_template;
