//! Browser error types - re-exports the unified TitheError from tithe-core
//!
//! All browser failures use the Browser variant: launch, navigation, element
//! lookup, and JavaScript evaluation. Messages include the selector or URL
//! that the operation was working on.

pub use tithe_core::{Result, TitheError};

/// Alias kept so browser code reads naturally
pub type BrowserError = TitheError;
