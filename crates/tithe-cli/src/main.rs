//! Tithe CLI - automated one-shot donation
//!
//! Usage:
//!   tithe               Donate the default amount ("1")
//!   tithe 25.50         Donate a specific amount
//!   tithe --headed 10   Watch the browser do it
//!
//! Credentials come from CHURCH_USERNAME and CHURCH_PASSWORD (a .env file in
//! the working directory is honored). Both are checked before the browser
//! launches; nothing touches the network until they are present.

use anyhow::{Context, Result};
use clap::Parser;
use tithe_core::{Confirmation, Credentials, DonationAmount, FlowConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tithe")]
#[command(version, about = "Automate a one-shot donation through the donations site")]
struct Cli {
    /// Donation amount
    #[arg(default_value = "1")]
    amount: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file is optional; real environment variables win
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Preconditions fail fast, before any browser or network activity
    let credentials = Credentials::from_env()?;
    let amount = DonationAmount::parse(&cli.amount)?;

    let config = FlowConfig {
        headless: !cli.headed,
        ..FlowConfig::default()
    };

    let report = tithe_flow::run_donation(credentials, &amount, config)
        .await
        .context("donation run failed")?;

    match report.confirmation {
        Confirmation::Confirmed => {
            info!("Donation of {} confirmed", amount);
        }
        Confirmation::Unconfirmed => {
            info!(
                "Donation of {} unconfirmed within the timeout; it may still have been \
                 submitted, please verify manually",
                amount
            );
        }
    }

    Ok(())
}
