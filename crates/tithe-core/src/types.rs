//! Domain types for the donation flow

use serde::{Deserialize, Serialize};

/// One page of the multi-page donation workflow.
///
/// Steps are strictly ordered; the driver only ever moves forward. The step is
/// inferred from the current URL fragment, never stored in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    /// Step 1: amount entry
    Amount,
    /// Step 2: payment method (bank account)
    BankAccount,
    /// Step 3: review and submit
    Review,
    /// Terminal thank-you page
    Confirmation,
}

impl FormStep {
    /// Infer the form step from a navigable location.
    ///
    /// Matches the `#/donation/stepN` fragment the donations app routes with.
    /// Returns `None` for any location outside the workflow.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.contains("/donation/thankyou") {
            Some(Self::Confirmation)
        } else if url.contains("/donation/step3") {
            Some(Self::Review)
        } else if url.contains("/donation/step2") {
            Some(Self::BankAccount)
        } else if url.contains("/donation/step1") {
            Some(Self::Amount)
        } else {
            None
        }
    }
}

impl std::fmt::Display for FormStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amount => write!(f, "step 1 (amount)"),
            Self::BankAccount => write!(f, "step 2 (bank account)"),
            Self::Review => write!(f, "step 3 (review)"),
            Self::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// A validated donation amount, kept as the exact text typed into the form.
///
/// Validation is local and conservative: the text must parse as a decimal
/// number strictly greater than zero. The accepted text is submitted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationAmount(String);

impl DonationAmount {
    /// Validate and wrap an amount string.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let trimmed = raw.trim();
        let value: f64 = trimmed.parse().map_err(|_| {
            crate::TitheError::InvalidAmount(format!("not a decimal number: {:?}", raw))
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(crate::TitheError::InvalidAmount(format!(
                "must be greater than zero, got {:?}",
                raw
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The exact text to type into the amount field.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DonationAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authentication state of the browser session, determined once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// A profile marker was present on the landing page; login is skipped.
    PreAuthenticated,
    /// No existing session; credential submission is required.
    Anonymous,
}

/// Outcome of the login race (error panel vs. positive session marker).
///
/// `Unknown` is an explicit state: neither signal appeared within the timeout.
/// The run proceeds past it, but never reports it as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Positive marker observed: the session left the identity provider.
    Established,
    /// The error panel rendered; payload is its message text.
    Failed(String),
    /// Neither signal within the timeout.
    Unknown,
}

/// Terminal confirmation state of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Thank-you URL reached or confirmation marker present.
    Confirmed,
    /// Neither signal within the timeout. The donation may still have
    /// succeeded server-side; verify manually.
    Unconfirmed,
}

/// What a completed run observed at each milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub session: SessionState,
    /// `None` when login was skipped (pre-authenticated session).
    pub login: Option<LoginOutcome>,
    /// Whether the driver confirmed arrival on the review step. When false,
    /// no submit attempt was made.
    pub reached_review: bool,
    pub confirmation: Confirmation,
}
