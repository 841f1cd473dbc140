//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use std::collections::HashSet;

use core_kernel::Money;
use domain_billing::{Allocation, Invoice, InvoiceStatus};

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that no two invoices share a period key
pub fn assert_unique_period_keys(invoices: &[Invoice]) {
    let mut seen = HashSet::new();
    for invoice in invoices {
        assert!(
            seen.insert(invoice.period_key.clone()),
            "Duplicate invoice for period {}",
            invoice.period_key
        );
    }
}

/// Asserts the paid status agrees with the paid amount
pub fn assert_status_consistent(invoice: &Invoice) {
    assert_eq!(
        invoice.status == InvoiceStatus::Paid,
        invoice.paid_amount >= invoice.amount,
        "Invoice {} has status {:?} with {} of {} paid",
        invoice.invoice_number,
        invoice.status,
        invoice.paid_amount,
        invoice.amount
    );
}

/// Asserts an allocation emitted exactly the requested amount
pub fn assert_allocation_conserves(allocation: &Allocation, requested: Money) {
    assert_eq!(
        allocation.total(),
        requested,
        "Allocated {} across {} payments, expected {}",
        allocation.total(),
        allocation.payments.len(),
        requested
    );
}
