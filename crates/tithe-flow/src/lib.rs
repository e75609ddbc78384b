//! # tithe-flow
//!
//! The Donation Flow Driver: one strictly sequential protocol that logs in
//! (or reuses an existing session), enters an amount, advances the three-step
//! donation form with bounded retries, submits, and races two confirmation
//! signals. Single logical thread of control; every operation is bounded by a
//! timeout; the browser session is released exactly once on every exit path.

pub mod driver;
pub mod page;
pub mod retry;
pub mod selectors;

pub use driver::DonationDriver;
pub use page::{ControlActivation, DonationPage, LivePage};
pub use retry::{Sleeper, TokioSleeper};

use tithe_browser::{BrowserConfig, BrowserSession};
use tithe_core::{Credentials, DonationAmount, FlowConfig, Result, RunReport};
use tracing::warn;

/// Run one donation end to end against a live browser.
///
/// Launches the browser, drives the protocol, and releases the session
/// unconditionally before returning, whatever the outcome. Credentials are
/// assumed validated; nothing here reads the environment.
pub async fn run_donation(
    credentials: Credentials,
    amount: &DonationAmount,
    config: FlowConfig,
) -> Result<RunReport> {
    let browser_config = BrowserConfig {
        headless: config.headless,
        ..BrowserConfig::default()
    };
    let session = BrowserSession::launch_with_config(browser_config).await?;

    let driver = DonationDriver::new(LivePage::new(session), TokioSleeper, credentials, config);
    let result = driver.run(amount).await;

    // Guaranteed cleanup: release the session on every path before the run
    // outcome propagates.
    if let Err(e) = driver.into_page().into_session().close().await {
        warn!("Browser cleanup failed: {}", e);
    }

    result
}
