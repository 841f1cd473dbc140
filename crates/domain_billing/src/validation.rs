//! Input validation rules
//!
//! Every check here runs before any storage call.
//!
//! ## Students
//! - Must have a name and a phone number
//! - Must be enrolled in at least one subject
//!
//! ## Subjects
//! - Must have a name
//! - Fee must be positive
//!
//! ## Payments
//! - Amount must be positive

use core_kernel::{Money, SubjectId};

use crate::error::{BillingError, BillingResult};

/// Validates the fields of a new or edited student
pub fn validate_student(name: &str, phone: &str, subjects: &[SubjectId]) -> BillingResult<()> {
    if name.trim().is_empty() {
        return Err(BillingError::validation("name", "Student name is required"));
    }
    if phone.trim().is_empty() {
        return Err(BillingError::validation("phone", "Phone number is required"));
    }
    if subjects.is_empty() {
        return Err(BillingError::validation(
            "subjects",
            "At least one subject must be selected",
        ));
    }
    Ok(())
}

/// Validates the fields of a new or edited subject
pub fn validate_subject(name: &str, fee: Money) -> BillingResult<()> {
    if name.trim().is_empty() {
        return Err(BillingError::validation("name", "Subject name is required"));
    }
    if !fee.is_positive() {
        return Err(BillingError::validation(
            "fee",
            format!("Fee must be positive, got {}", fee),
        ));
    }
    Ok(())
}

/// Validates a payment amount
pub fn validate_payment_amount(amount: Money) -> BillingResult<()> {
    if !amount.is_positive() {
        return Err(BillingError::validation(
            "amount",
            format!("Payment amount must be positive, got {}", amount),
        ));
    }
    Ok(())
}
