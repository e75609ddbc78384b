//! # tithe-core
//!
//! Core types for the tithe donation flow driver.
//!
//! The driver automates a single three-step donation form behind an Okta
//! login. This crate holds the pieces shared by every other crate:
//!
//! - The unified [`TitheError`] type and `Result` alias
//! - Explicit configuration ([`Credentials`], [`FlowConfig`], [`RetryPolicy`])
//! - Domain types ([`FormStep`], [`DonationAmount`], [`LoginOutcome`], ...)

mod config;
mod error;
mod types;

pub use config::{Credentials, FlowConfig, RetryPolicy, PASSWORD_VAR, USERNAME_VAR};
pub use error::{Result, TitheError};
pub use types::{Confirmation, DonationAmount, FormStep, LoginOutcome, RunReport, SessionState};
