//! Page surface the driver works against
//!
//! The driver never touches `headless_chrome` directly; it drives this trait.
//! [`LivePage`] implements it over a real browser session, and tests
//! substitute a scripted fake so the whole protocol runs without a browser.

use async_trait::async_trait;
use std::time::Duration;
use tithe_browser::BrowserSession;
use tithe_core::Result;
use tracing::warn;

/// How a control was successfully activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlActivation {
    /// Element-level click succeeded.
    DirectInvoke,
    /// Fell back to a raw pointer click at the bounding-box center.
    GeometryClick,
}

/// Operations the donation flow needs from a page.
#[async_trait]
pub trait DonationPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Immediate presence probe; never waits.
    async fn element_exists(&self, selector: &str) -> bool;

    /// Bounded wait for an element to appear.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn text_content(&self, selector: &str) -> Result<String>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Simulated pointer click on an element.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Raw coordinate click at the element's geometric center.
    async fn click_center(&self, selector: &str) -> Result<()>;

    /// Scroll into view and invoke the click handler programmatically,
    /// bypassing pointer simulation (for occluded controls).
    async fn invoke_click(&self, selector: &str) -> Result<()>;

    /// Activate a control by whichever capability works: direct click first,
    /// geometry click as the fallback. Reports which variant succeeded.
    async fn activate_control(&self, selector: &str) -> Result<ControlActivation> {
        match self.click(selector).await {
            Ok(()) => Ok(ControlActivation::DirectInvoke),
            Err(e) => {
                warn!("Direct click failed for {}, trying coordinates: {}", selector, e);
                self.click_center(selector).await?;
                Ok(ControlActivation::GeometryClick)
            }
        }
    }
}

/// [`DonationPage`] over a live Chrome DevTools Protocol session.
pub struct LivePage {
    session: BrowserSession,
}

impl LivePage {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }

    /// Hand the underlying session back for release.
    pub fn into_session(self) -> BrowserSession {
        self.session
    }
}

#[async_trait]
impl DonationPage for LivePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.session.navigate(url).await
    }

    async fn current_url(&self) -> Result<String> {
        self.session.current_url().await
    }

    async fn element_exists(&self, selector: &str) -> bool {
        self.session.element_exists(selector).await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.session.wait_for_element(selector, Some(timeout)).await
    }

    async fn text_content(&self, selector: &str) -> Result<String> {
        self.session.text_content(selector).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.session.type_text(selector, text).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.session.click(selector).await
    }

    async fn click_center(&self, selector: &str) -> Result<()> {
        self.session.click_center(selector).await
    }

    async fn invoke_click(&self, selector: &str) -> Result<()> {
        self.session.invoke_click(selector).await
    }
}
