//! Verified input: the only way values enter the form
//!
//! Typing into the timesheet form is unreliable three ways: fields silently
//! swallow keystrokes, restore a default value on blur, or keep a stale
//! value when only the DOM property changed. Every write therefore layers
//! trusted keystrokes over a direct property write, commits with Enter+Tab,
//! and re-reads the field to verify what actually stuck.

use crate::dom;
use crate::error::Result;
use crate::locator::Locator;
use crate::resolver::{self, FieldRole};
use crate::session::Session;
use punchcard_core::time::normalize_clock;
use punchcard_core::PunchError;
use std::time::Duration;
use tracing::{debug, info};

const SETTLE_DELAY: Duration = Duration::from_millis(200);
const EDITOR_SELECTOR: &str = "input.editor-text";

/// Write a value into a form field and verify it stuck
///
/// Short-circuits when the field already holds the value (compared after
/// clock normalization, so `09:00` matches `9:00`). Verification failure is
/// an [`PunchError::Input`]; callers decide whether to retry.
pub async fn set_field_value(
    session: &Session,
    role: FieldRole,
    value: &str,
    timeout: Duration,
) -> Result<()> {
    let locator = resolver::resolve(session, role, timeout).await?;

    if let Some(current) = dom::read_value(session, &locator).await? {
        if normalize_clock(&current) == normalize_clock(value) {
            debug!("{} already holds {:?}, skipping", role, value);
            return Ok(());
        }
    }

    dom::click(session, &locator).await?;
    clear_with_keystroke_sweep(session, &locator).await?;

    // Keystrokes first so focus/IME handlers fire, then the property write
    // to defeat fields that drop keyboard input.
    session.type_text(value).await?;
    dom::set_value_property(session, &locator, value).await?;

    session.press_key("Enter").await?;
    session.press_key("Tab").await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    // The commit can re-render the form; verify against a fresh resolution.
    let locator = resolver::resolve(session, role, timeout).await?;
    let actual = dom::read_value(session, &locator).await?.unwrap_or_default();
    if normalize_clock(&actual) == normalize_clock(value) {
        info!("{} <- {:?}", role, value);
        Ok(())
    } else {
        Err(PunchError::Input(format!(
            "{} holds {:?} after writing {:?}",
            role, actual, value
        )))
    }
}

/// Empty a field, falling back to deleting the leftovers key by key
///
/// Script-level clearing can leave a value behind when the field re-fills
/// itself from an attribute or change handler. When that happens, jump to
/// the end of the value and backspace over every remaining character with
/// trusted keyboard events, which those handlers cannot distinguish from
/// the user.
async fn clear_with_keystroke_sweep(session: &Session, locator: &Locator) -> Result<()> {
    let residual = dom::clear_value(session, locator).await?;
    if residual.is_empty() {
        return Ok(());
    }

    debug!("{:?} left in field after clearing, sweeping with backspace", residual);
    session.press_key("End").await?;
    for _ in 0..sweep_len(&residual) {
        session.press_key("Backspace").await?;
    }
    Ok(())
}

/// Backspaces needed to remove a residual value (one per character, not per
/// byte; the timesheet mixes ASCII clock values with Japanese defaults)
fn sweep_len(residual: &str) -> usize {
    residual.chars().count()
}

/// Select the location type on the combobox and verify the selection
pub async fn select_location(session: &Session, form_value: &str, timeout: Duration) -> Result<()> {
    let locator = resolver::resolve(session, FieldRole::LocationSelect, timeout).await?;
    dom::select_value(session, &locator, form_value).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let actual = dom::read_value(session, &locator).await?.unwrap_or_default();
    if actual == form_value {
        info!("location selector <- {:?}", form_value);
        Ok(())
    } else {
        Err(PunchError::Input(format!(
            "location selector holds {:?} after selecting {:?}",
            actual, form_value
        )))
    }
}

/// Write a duration into one project grid cell
///
/// The grid only accepts input through its inline editor: double-click the
/// cell, wait for the editor input to attach, type into it, commit with
/// Enter, then verify the cell text.
pub async fn set_grid_cell_value(
    session: &Session,
    row_index: usize,
    value: &str,
    timeout: Duration,
) -> Result<()> {
    let cell = resolver::resolve(session, FieldRole::ProjectTimeCell(row_index), timeout).await?;
    dom::double_click(session, &cell).await?;

    let editor_ready = format!("document.querySelector('{}') !== null", EDITOR_SELECTOR);
    if !session.wait_for_condition(&editor_ready, timeout).await? {
        return Err(PunchError::ElementNotFound(format!(
            "inline editor for project row {}",
            row_index
        )));
    }

    let editor = Locator::css(EDITOR_SELECTOR);
    clear_with_keystroke_sweep(session, &editor).await?;
    session.type_text(value).await?;
    dom::set_value_property(session, &editor, value).await?;
    session.press_key("Enter").await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    // Re-read the cell itself; the editor is gone after commit.
    let cell = resolver::resolve(session, FieldRole::ProjectTimeCell(row_index), timeout).await?;
    let actual = dom::inner_text(session, &cell).await?.unwrap_or_default();
    if normalize_clock(&actual) == normalize_clock(value) {
        info!("project row {} <- {:?}", row_index, value);
        Ok(())
    } else {
        Err(PunchError::Input(format!(
            "project row {} shows {:?} after writing {:?}",
            row_index, actual, value
        )))
    }
}
