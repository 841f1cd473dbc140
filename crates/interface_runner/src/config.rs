//! Runner configuration

use serde::Deserialize;
use std::path::PathBuf;

use domain_billing::BillingConfig;

/// Runner configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// JSON file holding the billing collections
    pub snapshot_path: PathBuf,
    /// Where to write the updated snapshot; the report goes to stdout when unset
    pub output_path: Option<PathBuf>,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Days after a period's last class before its invoice is due
    pub due_after_days: u64,
    /// Quiet window before generation runs
    pub debounce_ms: u64,
    /// Currency label used in reminder messages
    pub currency_label: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let billing = BillingConfig::default();
        Self {
            snapshot_path: PathBuf::from("billing.json"),
            output_path: None,
            log_level: "info".to_string(),
            log_json: false,
            due_after_days: billing.due_after_days,
            debounce_ms: billing.debounce_ms,
            currency_label: billing.currency_label,
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from `BILLING_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("BILLING").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// The billing tunables
    pub fn billing(&self) -> BillingConfig {
        BillingConfig {
            due_after_days: self.due_after_days,
            debounce_ms: self.debounce_ms,
            currency_label: self.currency_label.clone(),
        }
    }
}
