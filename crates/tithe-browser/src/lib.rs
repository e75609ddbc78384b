//! Browser session management for the donation flow
//!
//! Thin wrapper over Chrome DevTools Protocol (via `headless_chrome`) exposing
//! exactly the operations the donation form needs: navigation, bounded element
//! waits, typing, and three flavors of clicking (simulated pointer, raw
//! coordinate-based, and programmatic JS invoke for occluded controls).
//!
//! # Requirements
//!
//! - Chrome or Chromium installed
//! - For headless operation, no additional setup required

pub mod browser;
pub mod error;

pub use browser::{BrowserConfig, BrowserSession};
pub use error::{BrowserError, Result};
