//! Browser automation layer for Punchcard timesheet submission
//!
//! This crate drives an already-authenticated Chrome over the Chrome
//! DevTools Protocol (CDP). It owns everything that touches the page:
//! session lifecycle, element resolution with fallback strategies, verified
//! input, and page-state cleanup.
//!
//! # Design
//!
//! The timesheet form re-renders after every calculation, so element handles
//! cannot be held across actions. Instead, a [`locator::Locator`] describes
//! how to find an element and is re-resolved inside the page at the moment
//! of each action. Logical fields are named by [`resolver::FieldRole`] and
//! mapped to ordered chains of locators, most specific first.
//!
//! # Example
//!
//! ```no_run
//! use punchcard_browser::resolver::FieldRole;
//! use punchcard_browser::{input, Session};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // chrome --remote-debugging-port=9222, already logged in
//!     let session = Session::connect(9222).await?;
//!     session.wait_for_page_load(Duration::from_secs(30)).await?;
//!
//!     input::set_field_value(
//!         &session,
//!         FieldRole::StartTime,
//!         "9:00",
//!         Duration::from_secs(10),
//!     )
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium started with `--remote-debugging-port`
//! - The timesheet page open and authenticated in that browser

pub mod cleanup;
pub mod dom;
pub mod error;
pub mod input;
pub mod locator;
pub mod resolver;
pub mod session;

// Re-export commonly used types
pub use error::{PunchError, Result};
pub use locator::Locator;
pub use resolver::FieldRole;
pub use session::Session;
