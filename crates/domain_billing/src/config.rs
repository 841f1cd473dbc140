//! Billing configuration

use serde::Deserialize;
use std::time::Duration;

/// Tunables for invoice generation and presentation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Days after a period's last class before its invoice is due
    pub due_after_days: u64,
    /// Quiet window before a burst of attendance edits triggers generation
    pub debounce_ms: u64,
    /// Currency label used in reminder messages
    pub currency_label: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            due_after_days: 7,
            debounce_ms: 2000,
            currency_label: "Rs.".to_string(),
        }
    }
}

impl BillingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.due_after_days, 7);
        assert_eq!(config.debounce(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_override() {
        let config: BillingConfig = serde_json::from_str(r#"{"due_after_days": 10}"#).unwrap();
        assert_eq!(config.due_after_days, 10);
        assert_eq!(config.currency_label, "Rs.");
    }
}
