//! Browser session management over the Chrome DevTools Protocol
//!
//! Punchcard never performs a login itself: it attaches to a Chrome the user
//! has already started with `--remote-debugging-port` and authenticated in,
//! then drives the timesheet tab of that browser.

use crate::error::Result;
use chrono::Local;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Tab};
use punchcard_core::PunchError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Active browser session attached over the DevTools protocol
pub struct Session {
    /// Underlying browser connection (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// The tab being driven
    tab: Arc<Tab>,
}

impl Session {
    /// Attach to an already-running browser instance
    ///
    /// # Arguments
    /// * `port` - Chrome DevTools Protocol port (typically 9222)
    pub async fn connect(port: u16) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let browser = Browser::connect(format!("http://127.0.0.1:{}", port))
            .map_err(|e| PunchError::Browser(format!("Failed to connect to browser: {}", e)))?;

        // Reuse the tab the user authenticated in; only open a fresh one when
        // the browser has none.
        let existing = {
            let tabs = browser
                .get_tabs()
                .lock()
                .map_err(|_| PunchError::Browser("Tab registry lock poisoned".to_string()))?;
            tabs.last().cloned()
        };
        let tab = match existing {
            Some(tab) => tab,
            None => browser
                .new_tab()
                .map_err(|e| PunchError::Browser(format!("Failed to create tab: {}", e)))?,
        };

        info!("Connected to browser successfully");
        Ok(Self { browser, tab })
    }

    /// Navigate to a URL and wait for the navigation to complete
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| PunchError::Navigation(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| PunchError::Navigation(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    /// Reload the current page
    pub async fn reload(&self) -> Result<()> {
        debug!("Reloading page");
        self.tab
            .reload(false, None)
            .map_err(|e| PunchError::Navigation(format!("Reload failed: {}", e)))?;
        Ok(())
    }

    /// Execute JavaScript in the page context
    ///
    /// # Returns
    /// JSON result of the evaluated expression (`Null` for undefined)
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| PunchError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Wait until `document.readyState` is `complete`, then give dynamic
    /// content a short grace period. Times out with a Navigation error.
    pub async fn wait_for_page_load(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.evaluate("document.readyState").await?;
            if state.as_str() == Some("complete") {
                break;
            }
            if Instant::now() >= deadline {
                return Err(PunchError::Navigation(format!(
                    "Page did not finish loading within {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // The timesheet grid keeps rendering after readyState settles.
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    /// Poll a JavaScript expression until it is truthy
    ///
    /// Returns `true` if the condition held before the timeout.
    pub async fn wait_for_condition(&self, script: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let value = self.evaluate(script).await?;
            let truthy = match &value {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Null => false,
                serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
                serde_json::Value::String(s) => !s.is_empty(),
                _ => true,
            };
            if truthy {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Current page URL
    pub async fn current_url(&self) -> Result<String> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Current page title
    pub async fn title(&self) -> Result<String> {
        let result = self.evaluate("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Type text as trusted keyboard events into the focused element
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.tab
            .type_str(text)
            .map_err(|e| PunchError::Input(format!("Failed to type text: {}", e)))?;
        Ok(())
    }

    /// Press a single named key (e.g. `"Enter"`, `"Tab"`)
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.tab
            .press_key(key)
            .map_err(|e| PunchError::Input(format!("Failed to press {}: {}", key, e)))?;
        Ok(())
    }

    /// Capture a PNG screenshot into `dir`, named `<label>_<timestamp>.png`
    ///
    /// # Returns
    /// Path of the written file
    pub async fn save_screenshot(&self, dir: &Path, label: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let data = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| PunchError::Browser(format!("Screenshot capture failed: {}", e)))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}_{}.png", label, stamp));
        std::fs::write(&path, data)?;

        info!("Saved screenshot to {}", path.display());
        Ok(path)
    }
}
