//! DOM probes and actions, evaluated as JavaScript against a [`Locator`]
//!
//! Every function re-resolves its locator inside the page at call time, so a
//! form re-render between two calls can never leave us acting on a stale
//! node. Probes report absence as a value; actions treat absence as an
//! [`PunchError::ElementNotFound`].

use crate::cleanup;
use crate::error::Result;
use crate::locator::{js_string, Locator};
use crate::session::Session;
use punchcard_core::PunchError;
use tracing::{debug, warn};

/// Number of iframes in the top-level document
pub async fn frame_count(session: &Session) -> Result<usize> {
    let value = session
        .evaluate("document.querySelectorAll('iframe').length")
        .await?;
    Ok(value.as_u64().unwrap_or(0) as usize)
}

/// Whether the locator currently matches an element
pub async fn exists(session: &Session, locator: &Locator) -> Result<bool> {
    let script = format!("({}) !== null", locator.js_getter());
    Ok(session.evaluate(&script).await?.as_bool().unwrap_or(false))
}

/// Whether the element is present, visible, enabled and not fully obscured
/// by another element. This is the acceptance test the resolver applies to
/// each candidate strategy.
pub async fn is_interactable(session: &Session, locator: &Locator) -> Result<bool> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return false; \
           if (el.disabled || el.readOnly) return false; \
           var style = window.getComputedStyle(el); \
           if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false; \
           var rect = el.getBoundingClientRect(); \
           if (rect.width === 0 || rect.height === 0) return false; \
           var doc = el.ownerDocument; \
           var hit = doc.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2); \
           return hit === null || el === hit || el.contains(hit) || hit.contains(el); \
         }})()",
        locator.js_getter()
    );
    Ok(session.evaluate(&script).await?.as_bool().unwrap_or(false))
}

/// Read the element's current value (`value` for form controls, trimmed
/// `textContent` otherwise). `None` when the locator matches nothing.
pub async fn read_value(session: &Session, locator: &Locator) -> Result<Option<String>> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return null; \
           if ('value' in el) return el.value; \
           return (el.textContent || '').trim(); \
         }})()",
        locator.js_getter()
    );
    let value = session.evaluate(&script).await?;
    Ok(value.as_str().map(|s| s.to_string()))
}

/// Trimmed text content of the element, `None` when it matches nothing
pub async fn inner_text(session: &Session, locator: &Locator) -> Result<Option<String>> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           return el ? (el.innerText || el.textContent || '').trim() : null; \
         }})()",
        locator.js_getter()
    );
    let value = session.evaluate(&script).await?;
    Ok(value.as_str().map(|s| s.to_string()))
}

/// Scroll the element into view and click it
///
/// A first click attempt goes straight at the element; when the element has
/// vanished, fixed overlays (sticky footers and the like) are hidden and the
/// click is retried once before giving up.
pub async fn click(session: &Session, locator: &Locator) -> Result<()> {
    if click_once(session, locator).await? {
        return Ok(());
    }

    warn!("Click target {} missing, retrying after overlay cleanup", locator);
    let hidden = cleanup::hide_overlays(session).await?;
    let clicked = click_once(session, locator).await?;
    if hidden > 0 {
        cleanup::restore_overlays(session).await?;
    }
    if clicked {
        return Ok(());
    }
    Err(PunchError::ElementNotFound(format!("click target {}", locator)))
}

async fn click_once(session: &Session, locator: &Locator) -> Result<bool> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return false; \
           el.scrollIntoView({{block: 'center'}}); \
           el.click(); \
           return true; \
         }})()",
        locator.js_getter()
    );
    Ok(session.evaluate(&script).await?.as_bool().unwrap_or(false))
}

/// Dispatch a full double-click sequence (mousedown/mouseup pairs followed by
/// `dblclick`). Grid cells only open their inline editor on the composite
/// event sequence, not on a bare `dblclick`.
pub async fn double_click(session: &Session, locator: &Locator) -> Result<()> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return false; \
           el.scrollIntoView({{block: 'center'}}); \
           var rect = el.getBoundingClientRect(); \
           var opts = {{ \
             bubbles: true, cancelable: true, view: window, \
             clientX: rect.left + rect.width / 2, \
             clientY: rect.top + rect.height / 2 \
           }}; \
           ['mousedown', 'mouseup', 'mousedown', 'mouseup'].forEach(function(type) {{ \
             el.dispatchEvent(new MouseEvent(type, opts)); \
           }}); \
           el.dispatchEvent(new MouseEvent('dblclick', opts)); \
           return true; \
         }})()",
        locator.js_getter()
    );
    let ok = session.evaluate(&script).await?.as_bool().unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(PunchError::ElementNotFound(format!(
            "double-click target {}",
            locator
        )))
    }
}

/// Set the control's value via the DOM property and fire `input`/`change`,
/// keeping the `value` attribute in sync and stripping any default-time
/// attribute the page would otherwise restore on blur.
pub async fn set_value_property(session: &Session, locator: &Locator, value: &str) -> Result<()> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return false; \
           el.value = {v}; \
           el.setAttribute('value', {v}); \
           el.removeAttribute('defaulttime'); \
           el.dispatchEvent(new Event('input', {{bubbles: true}})); \
           el.dispatchEvent(new Event('change', {{bubbles: true}})); \
           return true; \
         }})()",
        locator.js_getter(),
        v = js_string(value)
    );
    let ok = session.evaluate(&script).await?.as_bool().unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(PunchError::ElementNotFound(format!("value target {}", locator)))
    }
}

/// Clear a text control through three escalating layers and report the value
/// left behind. Some fields re-materialize their content after a plain
/// clear, so each layer re-checks before escalating.
pub async fn clear_value(session: &Session, locator: &Locator) -> Result<String> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return null; \
           el.focus(); \
           el.value = ''; \
           if (el.value !== '') {{ \
             el.select(); \
             document.execCommand('delete'); \
           }} \
           if (el.value !== '') {{ \
             el.setAttribute('value', ''); \
             el.value = ''; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
           }} \
           return el.value; \
         }})()",
        locator.js_getter()
    );
    let value = session.evaluate(&script).await?;
    match value.as_str() {
        Some(rest) => {
            if !rest.is_empty() {
                debug!("Residual value after clearing {}: {:?}", locator, rest);
            }
            Ok(rest.to_string())
        }
        None => Err(PunchError::ElementNotFound(format!("clear target {}", locator))),
    }
}

/// Select an option on a `<select>` by its `value` attribute and fire
/// `change`. Errors with `Input` when no such option exists.
pub async fn select_value(session: &Session, locator: &Locator, value: &str) -> Result<()> {
    let script = format!(
        "(function() {{ \
           var el = {}; \
           if (!el) return 'missing'; \
           var found = false; \
           for (var i = 0; i < el.options.length; i++) {{ \
             if (el.options[i].value === {v}) {{ found = true; break; }} \
           }} \
           if (!found) return 'no-option'; \
           el.value = {v}; \
           el.dispatchEvent(new Event('change', {{bubbles: true}})); \
           return 'ok'; \
         }})()",
        locator.js_getter(),
        v = js_string(value)
    );
    let outcome = session.evaluate(&script).await?;
    match outcome.as_str() {
        Some("ok") => Ok(()),
        Some("no-option") => Err(PunchError::Input(format!(
            "select {} has no option with value {:?}",
            locator, value
        ))),
        _ => Err(PunchError::ElementNotFound(format!("select {}", locator))),
    }
}

/// Collect the trimmed, visible, non-empty texts of all elements matching a
/// CSS selector (top document and same-origin iframes)
pub async fn collect_texts(session: &Session, css: &str) -> Result<Vec<String>> {
    let script = format!(
        "(function() {{ \
           var texts = []; \
           var scan = function(doc) {{ \
             doc.querySelectorAll({sel}).forEach(function(el) {{ \
               var style = doc.defaultView.getComputedStyle(el); \
               if (style.display === 'none' || style.visibility === 'hidden') return; \
               var text = (el.innerText || el.textContent || '').trim(); \
               if (text) texts.push(text); \
             }}); \
           }}; \
           scan(document); \
           document.querySelectorAll('iframe').forEach(function(f) {{ \
             try {{ if (f.contentDocument) scan(f.contentDocument); }} catch (e) {{}} \
           }}); \
           return texts; \
         }})()",
        sel = js_string(css)
    );
    let value = session.evaluate(&script).await?;
    let texts = value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    Ok(texts)
}
