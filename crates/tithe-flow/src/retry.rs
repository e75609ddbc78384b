//! Injected clock for retry delays
//!
//! All wall-clock waits in the driver go through [`Sleeper`], so tests run
//! the full retry machinery instantly and assert the delays that would have
//! been slept.

use async_trait::async_trait;
use std::time::Duration;

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waits via the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
