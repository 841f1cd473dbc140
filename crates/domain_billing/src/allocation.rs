//! Payment Allocator
//!
//! Splits one incoming payment across a student's outstanding invoices, oldest
//! first, and books whatever is left against the current un-invoiced period.
//!
//! Allocation is pure: it returns the payment records to create and the
//! invoice updates to apply, and the caller persists them. The emitted
//! payment amounts always sum to the requested amount.

use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::{InvoiceId, Money, StudentId};

use crate::error::BillingResult;
use crate::invoice::{Invoice, InvoicePatch, InvoiceStatus};
use crate::payment::Payment;
use crate::validation::validate_payment_amount;

/// A user-submitted payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub amount: Money,
    pub date: NaiveDate,
    /// Free-text note; a generated note is used when absent or blank
    pub note: Option<String>,
}

impl PaymentRequest {
    pub fn new(student_id: StudentId, amount: Money, date: NaiveDate) -> Self {
        Self {
            student_id,
            amount,
            date,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn note_or(&self, fallback: impl FnOnce() -> String) -> String {
        match self.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => note.to_string(),
            _ => fallback(),
        }
    }
}

/// New paid amount and status for one invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceUpdate {
    pub invoice_id: InvoiceId,
    pub paid_amount: Money,
    pub status: InvoiceStatus,
    /// Set only when the invoice becomes paid
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&InvoiceUpdate> for InvoicePatch {
    fn from(update: &InvoiceUpdate) -> Self {
        InvoicePatch {
            paid_amount: Some(update.paid_amount),
            status: Some(update.status),
            paid_at: update.paid_at,
            payment_id: None,
        }
    }
}

/// Records produced by allocating one payment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    /// Payments to create, invoice-linked ones first in allocation order
    pub payments: Vec<Payment>,
    /// Invoice updates, in the same order as the linked payments
    pub invoice_updates: Vec<InvoiceUpdate>,
}

impl Allocation {
    /// Sum of the emitted payment amounts
    pub fn total(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// The unlinked payment toward the current period, if any money was left over
    pub fn current_period_payment(&self) -> Option<&Payment> {
        self.payments.iter().find(|p| p.is_unlinked())
    }
}

/// Allocates a payment across the student's outstanding invoices
///
/// Invoices of other students, paid invoices, and invoices with nothing left
/// to pay are ignored. The rest are settled oldest first by creation time;
/// invoices created at the same instant keep their input order.
///
/// # Errors
///
/// Returns a validation error if the amount is not positive.
pub fn allocate(
    request: &PaymentRequest,
    invoices: &[Invoice],
    now: DateTime<Utc>,
) -> BillingResult<Allocation> {
    validate_payment_amount(request.amount)?;

    let mut outstanding: Vec<&Invoice> = invoices
        .iter()
        .filter(|inv| inv.student_id == request.student_id)
        .filter(|inv| inv.is_outstanding() && inv.balance_due().is_positive())
        .collect();
    outstanding.sort_by_key(|inv| inv.created_at);

    let mut allocation = Allocation::default();
    let mut remaining = request.amount;

    for invoice in outstanding {
        if !remaining.is_positive() {
            break;
        }

        let balance = invoice.balance_due();
        let applied = remaining.min(balance);
        let note = request.note_or(|| format!("Partial payment for invoice {}", invoice.invoice_number));

        allocation.payments.push(Payment::for_invoice(
            request.student_id,
            applied,
            request.date,
            note,
            invoice.id,
            invoice.invoice_number.clone(),
            applied < balance,
        ));

        let paid_amount = invoice.paid_amount + applied;
        let status = InvoiceStatus::for_paid_amount(paid_amount, invoice.amount);
        allocation.invoice_updates.push(InvoiceUpdate {
            invoice_id: invoice.id,
            paid_amount,
            status,
            paid_at: (status == InvoiceStatus::Paid).then_some(now),
        });

        remaining -= applied;
    }

    if remaining.is_positive() {
        allocation.payments.push(Payment::for_current_period(
            request.student_id,
            remaining,
            request.date,
            request.note_or(|| "Partial payment for current period".to_string()),
        ));
    }

    Ok(allocation)
}
