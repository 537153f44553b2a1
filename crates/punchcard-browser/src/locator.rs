//! Re-resolvable element addresses
//!
//! The target application re-renders its form after every calculation, so a
//! handle to a DOM node goes stale between actions. Instead of holding node
//! handles, every interaction carries a [`Locator`] and re-resolves it at the
//! moment of use via an evaluated JavaScript expression.

use std::fmt;

/// An address for one element, resolvable in the live page at any time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector in the top-level document
    Css(String),
    /// XPath expression in the top-level document
    XPath(String),
    /// CSS selector inside the Nth same-origin iframe
    Frame { frame_index: usize, css: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn frame(frame_index: usize, selector: impl Into<String>) -> Self {
        Locator::Frame {
            frame_index,
            css: selector.into(),
        }
    }

    /// A JavaScript expression evaluating to the element, or `null` when the
    /// locator no longer matches anything. Cross-origin frames yield `null`
    /// rather than throwing.
    pub fn js_getter(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::XPath(expr) => format!(
                "document.evaluate({}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(expr)
            ),
            Locator::Frame { frame_index, css } => format!(
                "(function() {{ \
                   var f = document.querySelectorAll('iframe')[{}]; \
                   if (!f) return null; \
                   try {{ \
                     return f.contentDocument ? f.contentDocument.querySelector({}) : null; \
                   }} catch (e) {{ return null; }} \
                 }})()",
                frame_index,
                js_string(css)
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::XPath(s) => write!(f, "xpath:{}", s),
            Locator::Frame { frame_index, css } => write!(f, "frame[{}]:{}", frame_index, css),
        }
    }
}

/// Encode a Rust string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_getter_quotes_selector() {
        let loc = Locator::css("input[name='KNMTMRNGSTDI']");
        assert_eq!(
            loc.js_getter(),
            "document.querySelector(\"input[name='KNMTMRNGSTDI']\")"
        );
    }

    #[test]
    fn xpath_getter_uses_document_evaluate() {
        let loc = Locator::xpath("//form//input[@name='x']");
        let js = loc.js_getter();
        assert!(js.starts_with("document.evaluate("));
        assert!(js.contains("FIRST_ORDERED_NODE_TYPE"));
    }

    #[test]
    fn frame_getter_indexes_iframes_and_guards_cross_origin() {
        let loc = Locator::frame(2, "#btnCalc0");
        let js = loc.js_getter();
        assert!(js.contains("querySelectorAll('iframe')[2]"));
        assert!(js.contains("contentDocument"));
        assert!(js.contains("catch"));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }

    #[test]
    fn display_is_diagnostic_friendly() {
        assert_eq!(Locator::css("#x").to_string(), "css:#x");
        assert_eq!(Locator::frame(0, ".y").to_string(), "frame[0]:.y");
    }
}
