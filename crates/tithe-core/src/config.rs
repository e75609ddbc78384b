//! Configuration for the donation flow
//!
//! Credentials are resolved once at startup and passed in explicitly; the
//! driver itself never reads the environment. Timeouts and retry counts all
//! live in [`FlowConfig`] so tests can shrink them to zero.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::{Result, TitheError};

/// Environment variable holding the donation account username
pub const USERNAME_VAR: &str = "CHURCH_USERNAME";
/// Environment variable holding the donation account password
pub const PASSWORD_VAR: &str = "CHURCH_PASSWORD";

/// Login credentials for the identity provider
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Resolve credentials from the process environment.
    ///
    /// Fails with [`TitheError::MissingCredentials`] naming both expected
    /// variables when either is unset or empty. This runs before any browser
    /// launch or network activity.
    pub fn from_env() -> Result<Self> {
        let username = env::var(USERNAME_VAR).ok().filter(|v| !v.is_empty());
        let password = env::var(PASSWORD_VAR).ok().filter(|v| !v.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(TitheError::MissingCredentials(format!(
                "set both {} and {} (e.g. in a .env file)",
                USERNAME_VAR, PASSWORD_VAR
            ))),
        }
    }
}

/// Retry policy with exponential backoff
///
/// Delay for attempt `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`. Defaults match the fallback click retries of the original
/// workflow: 3 attempts starting at 2 seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given 1-based attempt number
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Every timeout and bound the donation protocol uses
///
/// Defaults mirror the original workflow's hard-coded waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// How long to wait for the login error panel / session marker race
    pub login_error_timeout: Duration,
    /// Bounded wait for form controls (next/submit buttons, input fields)
    pub control_timeout: Duration,
    /// Outer step-2-to-3 poll loop: maximum iterations
    pub step_poll_iterations: u32,
    /// Outer step-2-to-3 poll loop: delay between iterations
    pub step_poll_delay: Duration,
    /// Bounded wait for the terminal confirmation race
    pub confirm_timeout: Duration,
    /// Fallback raw-click retries when the programmatic click stalls
    pub blind_retry: RetryPolicy,
    /// Run the browser headless
    pub headless: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            login_error_timeout: Duration::from_secs(5),
            control_timeout: Duration::from_secs(30),
            step_poll_iterations: 5,
            step_poll_delay: Duration::from_secs(5),
            confirm_timeout: Duration::from_secs(15),
            blind_retry: RetryPolicy::default(),
            headless: true,
        }
    }
}
