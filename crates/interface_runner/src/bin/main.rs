//! Tutoring Billing - Runner Binary
//!
//! Loads a billing snapshot, generates the invoices for every completed
//! attendance period and reports each student's balance.
//!
//! # Usage
//!
//! ```bash
//! BILLING_SNAPSHOT_PATH=data/billing.json cargo run --bin tutor-billing
//! ```
//!
//! # Environment Variables
//!
//! * `BILLING_SNAPSHOT_PATH` - Snapshot JSON to load (default: billing.json)
//! * `BILLING_OUTPUT_PATH` - Write the updated snapshot here instead of printing the report
//! * `BILLING_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `BILLING_LOG_JSON` - Emit JSON logs (default: false)
//! * `BILLING_DUE_AFTER_DAYS` - Days from a period's last class to its due date (default: 7)
//! * `BILLING_DEBOUNCE_MS` - Quiet window before generation runs (default: 2000)
//! * `BILLING_CURRENCY_LABEL` - Currency label for reminders (default: Rs.)

use anyhow::Context;
use interface_runner::{config::RunnerConfig, run};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = RunnerConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(snapshot = %config.snapshot_path.display(), "Starting billing run");

    let report = run(&config).await?;

    tracing::info!(
        created = report.generation.created,
        failed = report.generation.failed.len(),
        pending_payments = report.dashboard.pending_payments,
        "Billing run complete"
    );
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
