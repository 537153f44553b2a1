//! Element resolution with ordered fallback strategies
//!
//! The target application's form controls carry stable but opaque `name`
//! attributes. The page re-renders freely and sometimes moves the form into
//! an iframe, so each logical field maps to an ordered chain of locator
//! strategies, from the most specific (exact name in the top document) to
//! the most desperate (substring match inside every same-origin iframe).
//! The first candidate that is actually interactable wins.

use crate::dom;
use crate::error::Result;
use crate::locator::Locator;
use crate::session::Session;
use punchcard_core::PunchError;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const RESOLVE_POLL_INTERVAL: Duration = Duration::from_millis(500);

// Field identifiers observed in the deployed timesheet form
const START_TIME_NAME: &str = "KNMTMRNGSTDI";
const END_TIME_NAME: &str = "KNMTMRNGETDI";
const BREAK_START_NAME: &str = "RCSST10_Seq0STDI";
const BREAK_END_NAME: &str = "RCSST10_Seq0ETDI";
const LOCATION_SELECT_NAME: &str = "GI_COMBOBOX38_Seq0S";
const CALCULATE_BUTTON_ID: &str = "btnCalc0";
const NEXT_BUTTON_ID: &str = "btnNext0";
const SUBMIT_BUTTON_ID: &str = "dSubmission0";

/// Selector used both to resolve the error area and to scan error texts
const ERROR_SELECTOR: &str = ".error";

/// The logical form fields Punchcard interacts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    StartTime,
    EndTime,
    BreakStart,
    BreakEnd,
    LocationSelect,
    CalculateButton,
    /// Save-and-proceed button leading to the confirmation screen
    NextButton,
    SubmitButton,
    /// Editable time cell for the Nth project row (zero-based)
    ProjectTimeCell(usize),
    ErrorList,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::StartTime => write!(f, "start time field"),
            FieldRole::EndTime => write!(f, "end time field"),
            FieldRole::BreakStart => write!(f, "break start field"),
            FieldRole::BreakEnd => write!(f, "break end field"),
            FieldRole::LocationSelect => write!(f, "location selector"),
            FieldRole::CalculateButton => write!(f, "calculate button"),
            FieldRole::NextButton => write!(f, "next button"),
            FieldRole::SubmitButton => write!(f, "submit button"),
            FieldRole::ProjectTimeCell(i) => write!(f, "project time cell {}", i),
            FieldRole::ErrorList => write!(f, "error list"),
        }
    }
}

/// Ordered locator candidates for a role. `frame_count` widens the chain
/// with per-iframe variants of the exact selectors.
pub fn strategies(role: FieldRole, frame_count: usize) -> Vec<Locator> {
    match role {
        FieldRole::StartTime => named_input_chain(START_TIME_NAME, "KNMTMRNG", "STDI", frame_count),
        FieldRole::EndTime => named_input_chain(END_TIME_NAME, "KNMTMRNG", "ETDI", frame_count),
        FieldRole::BreakStart => {
            named_input_chain(BREAK_START_NAME, "RCSST10", "STDI", frame_count)
        }
        FieldRole::BreakEnd => named_input_chain(BREAK_END_NAME, "RCSST10", "ETDI", frame_count),
        FieldRole::LocationSelect => {
            let exact = format!("select[name='{}']", LOCATION_SELECT_NAME);
            let mut chain = vec![
                Locator::css(exact.clone()),
                Locator::xpath(format!("//form//select[@name='{}']", LOCATION_SELECT_NAME)),
                Locator::css("select[name*='COMBOBOX38']"),
            ];
            for i in 0..frame_count {
                chain.push(Locator::frame(i, exact.clone()));
            }
            chain
        }
        FieldRole::CalculateButton => button_chain(CALCULATE_BUTTON_ID, "Calc", frame_count),
        FieldRole::NextButton => button_chain(NEXT_BUTTON_ID, "Next", frame_count),
        FieldRole::SubmitButton => button_chain(SUBMIT_BUTTON_ID, "Submission", frame_count),
        FieldRole::ProjectTimeCell(index) => {
            // nth-child is one-based; the grid puts the editable time value
            // in layout column l2/r2 (third cell).
            let row = index + 1;
            vec![
                Locator::css(format!(".slick-row:nth-child({}) .l2.r2", row)),
                Locator::css(format!(".slick-row:nth-child({}) .slick-cell.l2", row)),
                Locator::css(format!(".slick-row:nth-child({}) .r2", row)),
                Locator::css(format!(".slick-row:nth-child({}) [data-column='2']", row)),
                Locator::css(format!(".slick-row:nth-child({}) .slick-cell:nth-child(3)", row)),
            ]
        }
        FieldRole::ErrorList => {
            let mut chain = vec![Locator::css(ERROR_SELECTOR)];
            for i in 0..frame_count {
                chain.push(Locator::frame(i, ERROR_SELECTOR.to_string()));
            }
            chain
        }
    }
}

fn named_input_chain(
    name: &str,
    name_prefix: &str,
    name_suffix: &str,
    frame_count: usize,
) -> Vec<Locator> {
    let exact = format!("input[name='{}']", name);
    let substring = format!("input[name*='{}'][name*='{}']", name_prefix, name_suffix);
    let mut chain = vec![
        Locator::css(exact.clone()),
        Locator::css(format!("#{}", name)),
        Locator::xpath(format!("//form//input[@name='{}']", name)),
        Locator::xpath(format!("//table//input[@name='{}']", name)),
        Locator::css(substring.clone()),
    ];
    for i in 0..frame_count {
        chain.push(Locator::frame(i, exact.clone()));
        chain.push(Locator::frame(i, substring.clone()));
    }
    // Last resort: any visible text input that is not one of the page's
    // internal dummy fields.
    chain.push(Locator::css(
        "input[type='text']:not([name*='dummy']):not([name*='hidden'])",
    ));
    chain
}

fn button_chain(id: &str, id_fragment: &str, frame_count: usize) -> Vec<Locator> {
    let exact = format!("#{}", id);
    let mut chain = vec![
        Locator::css(exact.clone()),
        Locator::xpath(format!("//*[@id='{}']", id)),
        Locator::css(format!("button[id*='{}'], input[id*='{}']", id_fragment, id_fragment)),
    ];
    for i in 0..frame_count {
        chain.push(Locator::frame(i, exact.clone()));
    }
    chain
}

/// Resolve a role to the first interactable locator, polling until the
/// timeout. Exhaustion yields [`PunchError::ElementNotFound`] naming the
/// role.
pub async fn resolve(session: &Session, role: FieldRole, timeout: Duration) -> Result<Locator> {
    let deadline = Instant::now() + timeout;
    loop {
        let frames = dom::frame_count(session).await.unwrap_or(0);
        for (index, locator) in strategies(role, frames).into_iter().enumerate() {
            match dom::is_interactable(session, &locator).await {
                Ok(true) => {
                    debug!("Resolved {} via strategy {} ({})", role, index, locator);
                    return Ok(locator);
                }
                Ok(false) => trace!("Strategy {} for {} not interactable", index, role),
                Err(e) => trace!("Strategy {} for {} probe failed: {}", index, role, e),
            }
        }
        if Instant::now() >= deadline {
            return Err(PunchError::ElementNotFound(role.to_string()));
        }
        tokio::time::sleep(RESOLVE_POLL_INTERVAL).await;
    }
}

/// Visible validation error texts currently shown anywhere on the page
pub async fn read_validation_errors(session: &Session) -> Result<Vec<String>> {
    dom::collect_texts(session, ERROR_SELECTOR).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_is_tried_first() {
        let chain = strategies(FieldRole::StartTime, 0);
        assert_eq!(chain[0], Locator::css("input[name='KNMTMRNGSTDI']"));
        // substring fallback comes after the exact variants
        assert!(chain
            .iter()
            .position(|l| *l == Locator::css("input[name*='KNMTMRNG'][name*='STDI']"))
            .unwrap() > 0);
    }

    #[test]
    fn frames_extend_the_chain() {
        let bare = strategies(FieldRole::EndTime, 0).len();
        let framed = strategies(FieldRole::EndTime, 2).len();
        assert_eq!(framed, bare + 4);
        // the generic text-input fallback stays last even with frames
        assert!(matches!(
            strategies(FieldRole::EndTime, 1).last(),
            Some(Locator::Css(css)) if css.contains("dummy")
        ));
    }

    #[test]
    fn project_cell_rows_are_one_based() {
        let chain = strategies(FieldRole::ProjectTimeCell(0), 0);
        assert_eq!(chain[0], Locator::css(".slick-row:nth-child(1) .l2.r2"));
        let chain = strategies(FieldRole::ProjectTimeCell(3), 0);
        assert_eq!(chain[0], Locator::css(".slick-row:nth-child(4) .l2.r2"));
    }

    #[test]
    fn buttons_resolve_by_id_then_fragment() {
        let chain = strategies(FieldRole::CalculateButton, 0);
        assert_eq!(chain[0], Locator::css("#btnCalc0"));
        assert!(chain.iter().any(|l| l.to_string().contains("Calc")));
    }

    #[test]
    fn location_select_has_no_generic_fallback() {
        // A wrong select would silently misfile the day; the chain stays
        // specific to the known combobox.
        for locator in strategies(FieldRole::LocationSelect, 1) {
            assert!(locator.to_string().contains("COMBOBOX38") || locator.to_string().contains("GI_COMBOBOX38"));
        }
    }
}
