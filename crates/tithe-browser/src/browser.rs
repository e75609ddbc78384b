//! Browser lifecycle management using Chrome DevTools Protocol

use crate::error::Result;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tithe_core::TitheError;
use tracing::{debug, info};

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Default timeout for element waits
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 900,
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// Active browser session with Chrome DevTools Protocol
///
/// One session is acquired per donation run and released exactly once at the
/// end, whatever path the run took.
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch a new browser with default configuration
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default()).await
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| TitheError::Browser(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| TitheError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| TitheError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Navigate to a URL and wait for navigation to settle
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| TitheError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| TitheError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Navigated to {}", url);
        Ok(())
    }

    /// Wait for an element to appear, bounded by a timeout
    ///
    /// Uses the session default timeout if `timeout` is `None`.
    pub async fn wait_for_element(&self, selector: &str, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.config.default_timeout);

        debug!("Waiting for element: {} (timeout: {:?})", selector, timeout);

        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|_| TitheError::Browser(format!("Element not found: {}", selector)))?;

        debug!("Element found: {}", selector);
        Ok(())
    }

    /// Check whether an element exists right now, without waiting
    pub async fn element_exists(&self, selector: &str) -> bool {
        self.tab.find_element(selector).is_ok()
    }

    /// Type text into an element (simulated keystrokes)
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        debug!("Typing into {}", selector);

        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| TitheError::Browser(format!("Input not found: {}: {}", selector, e)))?;

        element
            .type_into(text)
            .map_err(|e| TitheError::Browser(format!("Failed to type into {}: {}", selector, e)))?;

        Ok(())
    }

    /// Click an element via simulated pointer event
    pub async fn click(&self, selector: &str) -> Result<()> {
        debug!("Clicking {}", selector);

        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| TitheError::Browser(format!("Control not found: {}: {}", selector, e)))?;

        element
            .click()
            .map_err(|e| TitheError::Browser(format!("Failed to click {}: {}", selector, e)))?;

        Ok(())
    }

    /// Click the geometric center of an element's bounding box
    ///
    /// Raw coordinate-based pointer click, for controls that reject the
    /// element-level click path.
    pub async fn click_center(&self, selector: &str) -> Result<()> {
        debug!("Coordinate-clicking center of {}", selector);

        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| TitheError::Browser(format!("Control not found: {}: {}", selector, e)))?;

        let midpoint = element.get_midpoint().map_err(|e| {
            TitheError::Browser(format!("No bounding box for {}: {}", selector, e))
        })?;

        self.tab
            .click_point(midpoint)
            .map_err(|e| TitheError::Browser(format!("Coordinate click failed: {}", e)))?;

        Ok(())
    }

    /// Scroll an element into view and invoke its click handler from JS
    ///
    /// Bypasses pointer simulation entirely; used when the control may be
    /// occluded by other layout.
    pub async fn invoke_click(&self, selector: &str) -> Result<()> {
        debug!("JS-invoking click on {}", selector);

        let script = format!(
            "(() => {{ const el = document.querySelector('{}'); \
             if (!el) return false; el.scrollIntoView(); el.click(); return true; }})()",
            selector
        );
        let clicked = self.evaluate_script(&script).await?;

        if clicked.as_bool() != Some(true) {
            return Err(TitheError::Browser(format!(
                "Control not present for JS click: {}",
                selector
            )));
        }
        Ok(())
    }

    /// Execute JavaScript in the page context, returning its JSON result
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| TitheError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Get the current URL
    pub async fn current_url(&self) -> Result<String> {
        let result = self.evaluate_script("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get text content of an element
    pub async fn text_content(&self, selector: &str) -> Result<String> {
        let script = format!("document.querySelector('{}')?.textContent", selector);
        let result = self.evaluate_script(&script).await?;
        Ok(result.as_str().unwrap_or("").trim().to_string())
    }

    /// Close the browser session
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        // Browser is dropped here and the child process cleaned up
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}
