//! Invoice management
//!
//! One invoice is issued per completed attendance period. The amount is always
//! the subject's full period fee at generation time; present/absent counts are
//! informational. After creation an invoice only changes through payment
//! allocation (`paid_amount`, `status`, `paid_at`).

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{Document, InvoiceId, Money, PaymentId, StudentId, SubjectId};

use crate::period::{Period, PeriodKey};
use crate::roster::{Student, Subject};

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Nothing paid yet
    Pending,
    /// Some payment received, balance remains
    Partial,
    /// Fully paid
    Paid,
}

impl InvoiceStatus {
    /// Status implied by a paid amount against an invoice amount
    pub fn for_paid_amount(paid: Money, amount: Money) -> Self {
        if paid >= amount {
            InvoiceStatus::Paid
        } else if paid.is_positive() {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Pending
        }
    }
}

/// An invoice for one completed attendance period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Display label, `INV-YYYYMM-NNNN`; not unique
    pub invoice_number: String,
    /// Billed student
    pub student_id: StudentId,
    /// Student name at generation time
    pub student_name: String,
    /// Billed subject
    pub subject_id: SubjectId,
    /// Subject name at generation time
    pub subject_name: String,
    /// Subject fee at generation time
    pub amount: Money,
    /// Idempotency key of the covered period
    pub period_key: PeriodKey,
    /// First class date of the period
    pub period_start: NaiveDate,
    /// Last class date of the period
    pub period_end: NaiveDate,
    /// The four class dates
    pub attendance_dates: Vec<NaiveDate>,
    /// Classes attended
    pub present_days: u32,
    /// Classes missed
    pub absent_days: u32,
    /// Status
    pub status: InvoiceStatus,
    /// Cumulative amount paid
    #[serde(default)]
    pub paid_amount: Money,
    /// Payment due date
    pub due_date: NaiveDate,
    /// When the invoice became fully paid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    /// Payment that settled the invoice through direct settlement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a pending invoice for a completed period
    ///
    /// # Arguments
    ///
    /// * `student` - Billed student (name is snapshotted)
    /// * `subject` - Billed subject (name and fee are snapshotted)
    /// * `period` - The completed period
    /// * `due_after_days` - Days after the period's last class the invoice is due
    pub fn for_period(
        student: &Student,
        subject: &Subject,
        period: &Period<'_>,
        due_after_days: u64,
    ) -> Self {
        let now = Utc::now();
        let period_end = period.end();

        Self {
            id: InvoiceId::new_v7(),
            invoice_number: generate_invoice_number(now.date_naive()),
            student_id: student.id,
            student_name: student.name.clone(),
            subject_id: subject.id,
            subject_name: subject.name.clone(),
            amount: subject.fee,
            period_key: period.key(),
            period_start: period.start(),
            period_end,
            attendance_dates: period.dates(),
            present_days: period.present_days(),
            absent_days: period.absent_days(),
            status: InvoiceStatus::Pending,
            paid_amount: Money::ZERO,
            due_date: due_date_for(period_end, due_after_days),
            paid_at: None,
            payment_id: None,
            created_at: now,
        }
    }

    /// Returns the balance still owed
    pub fn balance_due(&self) -> Money {
        self.amount - self.paid_amount
    }

    /// Returns true unless the invoice is paid
    pub fn is_outstanding(&self) -> bool {
        self.status != InvoiceStatus::Paid
    }

    /// Checks if the invoice is past its due date on `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.due_date && self.is_outstanding()
    }
}

/// Partial update for an invoice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
    pub paid_amount: Option<Money>,
    pub status: Option<InvoiceStatus>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<PaymentId>,
}

impl Document for Invoice {
    type Id = InvoiceId;
    type Patch = InvoicePatch;

    const COLLECTION: &'static str = "invoices";

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn apply_patch(&mut self, patch: InvoicePatch) {
        if let Some(paid_amount) = patch.paid_amount {
            self.paid_amount = paid_amount;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(paid_at) = patch.paid_at {
            self.paid_at = Some(paid_at);
        }
        if let Some(payment_id) = patch.payment_id {
            self.payment_id = Some(payment_id);
        }
    }
}

/// Due date: the period's last class date plus `days`
pub fn due_date_for(period_end: NaiveDate, days: u64) -> NaiveDate {
    period_end
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// Generates an invoice number `INV-YYYYMM-NNNN` with a random 4-digit suffix
pub fn generate_invoice_number(issued_on: NaiveDate) -> String {
    let suffix = Uuid::new_v4().as_u128() % 10_000;
    format!(
        "INV-{:04}{:02}-{:04}",
        issued_on.year(),
        issued_on.month(),
        suffix
    )
}

/// Unpaid invoices for a student
pub fn unpaid_for_student(student_id: StudentId, invoices: &[Invoice]) -> Vec<&Invoice> {
    invoices
        .iter()
        .filter(|inv| inv.student_id == student_id && inv.is_outstanding())
        .collect()
}
