//! Billing domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Input rejected before any storage call
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A storage operation failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns true for input errors the caller can fix
    pub fn is_validation(&self) -> bool {
        matches!(self, BillingError::Validation { .. })
    }
}

/// Result alias for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
