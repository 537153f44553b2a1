//! Page-state cleanup between actions and between attempts
//!
//! The timesheet page stacks fixed footers over the form and accumulates
//! half-open editors and stale error banners when an attempt dies midway.
//! These helpers put the page back into a state a fresh attempt can work
//! with, without a full reload.

use crate::error::Result;
use crate::session::Session;
use tracing::{debug, info};

/// Marker attribute stamped on elements we hide, so restore only touches
/// what we changed
const HIDDEN_MARKER: &str = "data-hidden-by-punchcard";

/// Hide fixed-position overlays (sticky footers, floating toolbars) that
/// intercept clicks meant for the form underneath
///
/// # Returns
/// Number of elements hidden
pub async fn hide_overlays(session: &Session) -> Result<usize> {
    let script = format!(
        "(function() {{ \
           var hidden = 0; \
           var candidates = document.querySelectorAll( \
             '.srw_fixed_footer_button_area, [class*=\"fixed_footer\"], [class*=\"floating\"]'); \
           candidates.forEach(function(el) {{ \
             var style = window.getComputedStyle(el); \
             if (style.position === 'fixed' || style.position === 'sticky') {{ \
               el.setAttribute('{marker}', el.style.display || ''); \
               el.style.display = 'none'; \
               hidden++; \
             }} \
           }}); \
           return hidden; \
         }})()",
        marker = HIDDEN_MARKER
    );
    let count = session.evaluate(&script).await?.as_u64().unwrap_or(0) as usize;
    if count > 0 {
        debug!("Hid {} overlay element(s)", count);
    }
    Ok(count)
}

/// Restore every element hidden by [`hide_overlays`]
pub async fn restore_overlays(session: &Session) -> Result<()> {
    let script = format!(
        "document.querySelectorAll('[{marker}]').forEach(function(el) {{ \
           el.style.display = el.getAttribute('{marker}'); \
           el.removeAttribute('{marker}'); \
         }})",
        marker = HIDDEN_MARKER
    );
    session.evaluate(&script).await?;
    Ok(())
}

/// Clear transient page state left over from a failed attempt: close any
/// open grid editor, drop focus, hide stale error banners and restore
/// overlays. Used by the recovery path before a retry, where a reload would
/// lose the day the page is positioned on.
pub async fn clear_transient_state(session: &Session) -> Result<()> {
    info!("Clearing transient page state before retry");
    let script = format!(
        "(function() {{ \
           if (document.activeElement && document.activeElement.blur) {{ \
             document.activeElement.blur(); \
           }} \
           document.querySelectorAll('input.editor-text').forEach(function(el) {{ \
             el.dispatchEvent(new KeyboardEvent('keydown', \
               {{key: 'Escape', bubbles: true}})); \
           }}); \
           document.querySelectorAll('.error, .alert').forEach(function(el) {{ \
             el.style.display = 'none'; \
           }}); \
           document.querySelectorAll('[{marker}]').forEach(function(el) {{ \
             el.style.display = el.getAttribute('{marker}'); \
             el.removeAttribute('{marker}'); \
           }}); \
           return true; \
         }})()",
        marker = HIDDEN_MARKER
    );
    session.evaluate(&script).await?;
    Ok(())
}
