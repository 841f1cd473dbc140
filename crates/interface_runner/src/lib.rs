//! Billing Runner
//!
//! Loads the billing collections from a JSON snapshot into an in-memory store,
//! runs debounced invoice generation over the whole roster and reports every
//! student's balance and status.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_runner::{config::RunnerConfig, run};
//!
//! let report = run(&RunnerConfig::from_env()?).await?;
//! println!("{} invoices created", report.generation.created);
//! ```

pub mod config;
pub mod report;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use domain_billing::{
    AutoGeneration, BillingCache, BillingService, BillingSnapshot, DebouncedTrigger,
    InMemoryBackend, InMemoryCollection,
};

use crate::config::RunnerConfig;
use crate::report::RunReport;

/// Reads a snapshot file
pub fn load_snapshot(path: &Path) -> anyhow::Result<BillingSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

/// Builds an in-memory backend holding the snapshot's documents
pub fn seed_backend(snapshot: BillingSnapshot) -> InMemoryBackend {
    InMemoryBackend {
        students: Arc::new(InMemoryCollection::with_documents(snapshot.students)),
        subjects: Arc::new(InMemoryCollection::with_documents(snapshot.subjects)),
        attendance: Arc::new(InMemoryCollection::with_documents(snapshot.attendance)),
        payments: Arc::new(InMemoryCollection::with_documents(snapshot.payments)),
        invoices: Arc::new(InMemoryCollection::with_documents(snapshot.invoices)),
    }
}

/// Runs generation over `snapshot` and reports the resulting balances
pub async fn run_snapshot(
    config: &RunnerConfig,
    snapshot: BillingSnapshot,
) -> anyhow::Result<(RunReport, BillingSnapshot)> {
    let backend = seed_backend(snapshot);
    let service = BillingService::new(backend.store(), config.billing());

    let cache = Arc::new(BillingCache::new());
    cache.start(service.store());

    let mut auto = AutoGeneration::spawn(
        cache.clone(),
        service.generator().clone(),
        DebouncedTrigger::new(service.config().debounce()),
    );
    tracing::debug!(delay_ms = config.debounce_ms, "Invoice generation scheduled");

    let generation = auto
        .next_report()
        .await
        .context("invoice generation stopped before it ran")?;

    let after = cache.snapshot();
    cache.stop();
    auto.join().await;

    let report = RunReport::build(&generation, &after, chrono::Utc::now().date_naive());
    for student in &report.students {
        tracing::info!(
            student = %student.name,
            status = %student.status,
            total_owed = %student.balance.total_owed,
            "Student balance"
        );
    }
    Ok((report, after))
}

/// Loads the configured snapshot, runs generation and writes the updated
/// snapshot, or prints the report when no output path is set
pub async fn run(config: &RunnerConfig) -> anyhow::Result<RunReport> {
    let snapshot = load_snapshot(&config.snapshot_path)?;
    tracing::info!(
        students = snapshot.students.len(),
        invoices = snapshot.invoices.len(),
        "Snapshot loaded"
    );

    let (report, after) = run_snapshot(config, snapshot).await?;

    match &config.output_path {
        Some(path) => {
            let body = serde_json::to_string_pretty(&after)?;
            std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "Updated snapshot written");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report)
}
