//! Payment records
//!
//! A single amount handed over by a student may be split into several payment
//! records: one per invoice it settles (linked by `invoice_id`) and, if money
//! is left, one unlinked record counted toward the current period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Document, InvoiceId, Money, PaymentId, StudentId};

/// A payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Paying student
    pub student_id: StudentId,
    /// Amount of this record
    pub amount: Money,
    /// Payment date as entered
    pub date: NaiveDate,
    /// Free-form note
    #[serde(default)]
    pub note: String,
    /// Invoice the amount was applied to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<InvoiceId>,
    /// Invoice label at the time of payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    /// True if the record did not fully settle its target; absent on older records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_partial: Option<bool>,
    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment linked to an invoice
    pub fn for_invoice(
        student_id: StudentId,
        amount: Money,
        date: NaiveDate,
        note: impl Into<String>,
        invoice_id: InvoiceId,
        invoice_number: impl Into<String>,
        is_partial: bool,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            student_id,
            amount,
            date,
            note: note.into(),
            invoice_id: Some(invoice_id),
            invoice_number: Some(invoice_number.into()),
            is_partial: Some(is_partial),
            created_at: Utc::now(),
        }
    }

    /// Creates an unlinked payment toward the current period
    pub fn for_current_period(
        student_id: StudentId,
        amount: Money,
        date: NaiveDate,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            student_id,
            amount,
            date,
            note: note.into(),
            invoice_id: None,
            invoice_number: None,
            is_partial: Some(true),
            created_at: Utc::now(),
        }
    }

    /// Returns true if the payment is not linked to any invoice
    pub fn is_unlinked(&self) -> bool {
        self.invoice_id.is_none()
    }

    /// Unlinked payments marked partial (or unmarked) apply to the current period
    pub fn counts_toward_current_period(&self) -> bool {
        self.is_unlinked() && self.is_partial != Some(false)
    }
}

/// Partial update for a payment
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub note: Option<String>,
}

impl Document for Payment {
    type Id = PaymentId;
    type Patch = PaymentPatch;

    const COLLECTION: &'static str = "payments";

    fn id(&self) -> PaymentId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn apply_patch(&mut self, patch: PaymentPatch) {
        if let Some(note) = patch.note {
            self.note = note;
        }
    }
}

/// Payments belonging to a student
pub fn for_student(student_id: StudentId, payments: &[Payment]) -> impl Iterator<Item = &Payment> {
    payments.iter().filter(move |p| p.student_id == student_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_current_period_classification() {
        let student = StudentId::new();
        let unlinked = Payment::for_current_period(student, Money::from_major(300), today(), "");
        assert!(unlinked.counts_toward_current_period());

        let linked = Payment::for_invoice(
            student,
            Money::from_major(300),
            today(),
            "",
            InvoiceId::new(),
            "INV-202405-0001",
            true,
        );
        assert!(!linked.counts_toward_current_period());

        let mut settled_unlinked = unlinked.clone();
        settled_unlinked.is_partial = Some(false);
        assert!(!settled_unlinked.counts_toward_current_period());

        let mut legacy = unlinked;
        legacy.is_partial = None;
        assert!(legacy.counts_toward_current_period());
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = format!(
            r#"{{"id":"{}","studentId":"{}","amount":"250","date":"2024-05-01"}}"#,
            PaymentId::new().as_uuid(),
            StudentId::new().as_uuid()
        );
        let payment: Payment = serde_json::from_str(&json).unwrap();
        assert!(payment.is_unlinked());
        assert_eq!(payment.is_partial, None);
        assert_eq!(payment.note, "");
    }
}
