//! Balance Calculator
//!
//! Two additive figures make up what a student owes:
//!
//! - the **invoiced balance**: the unpaid part of every invoice not yet paid
//! - the **current-period balance**: classes held since the last completed
//!   period, charged at a quarter of the subject fee each, less the unlinked
//!   payments made toward them (floored at zero)
//!
//! Invoice figures never include current-period money and vice versa.

use serde::Serialize;

use core_kernel::{Money, StudentId};

use crate::attendance::AttendanceRecord;
use crate::invoice::Invoice;
use crate::payment::{self, Payment};
use crate::period::{PeriodGrouping, PERIOD_SIZE};
use crate::roster::{find_subject, Student, Subject};

fn student_invoices(student_id: StudentId, invoices: &[Invoice]) -> impl Iterator<Item = &Invoice> {
    invoices.iter().filter(move |inv| inv.student_id == student_id)
}

/// Sum of `amount - paid_amount` over the student's invoices not yet paid
pub fn outstanding_invoice_total(student_id: StudentId, invoices: &[Invoice]) -> Money {
    student_invoices(student_id, invoices)
        .filter(|inv| inv.is_outstanding())
        .map(Invoice::balance_due)
        .sum()
}

/// Sum of every invoice amount ever issued to the student, any status
pub fn total_invoiced(student_id: StudentId, invoices: &[Invoice]) -> Money {
    student_invoices(student_id, invoices).map(|inv| inv.amount).sum()
}

/// Sum of the paid amounts recorded on the student's invoices
pub fn total_paid_on_invoices(student_id: StudentId, invoices: &[Invoice]) -> Money {
    student_invoices(student_id, invoices)
        .map(|inv| inv.paid_amount)
        .sum()
}

pub fn unpaid_invoice_count(student_id: StudentId, invoices: &[Invoice]) -> usize {
    student_invoices(student_id, invoices)
        .filter(|inv| inv.is_outstanding())
        .count()
}

/// Charge for the trailing, not yet invoiced classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPeriodCharge {
    /// Classes held in the trailing incomplete periods, across subjects
    pub classes_held: u32,
    /// Charge for those classes, rounded to whole units
    pub owed: Money,
    /// Unlinked payments made toward the current period
    pub paid: Money,
    /// `owed - paid`, floored at zero and rounded to whole units
    pub balance: Money,
}

impl CurrentPeriodCharge {
    /// Computes the current-period charge for a student
    ///
    /// Each enrolled subject contributes `remainder × fee / 4`, where the
    /// remainder is the number of attendance records past the last completed
    /// period. Subjects that no longer exist contribute nothing.
    pub fn compute(
        student: &Student,
        subjects: &[Subject],
        attendance: &[AttendanceRecord],
        payments: &[Payment],
    ) -> Self {
        let mut classes_held = 0u32;
        let mut owed = Money::ZERO;

        for &subject_id in &student.subjects {
            let Some(subject) = find_subject(subjects, subject_id) else {
                continue;
            };
            let remainder = PeriodGrouping::for_pair(student.id, subject_id, attendance).remainder_len() as u32;
            classes_held += remainder;
            owed += daily_rate(subject).multiply(remainder.into());
        }

        let paid: Money = payment::for_student(student.id, payments)
            .filter(|p| p.counts_toward_current_period())
            .map(|p| p.amount)
            .sum();

        Self {
            classes_held,
            owed: owed.round_whole(),
            paid,
            balance: (owed - paid).floor_at_zero().round_whole(),
        }
    }
}

/// A quarter of the subject fee
fn daily_rate(subject: &Subject) -> Money {
    // PERIOD_SIZE is a non-zero constant
    subject
        .fee
        .per_unit(PERIOD_SIZE as u32)
        .unwrap_or(Money::ZERO)
}

/// All balance figures for one student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBalance {
    pub student_id: StudentId,
    pub total_invoiced: Money,
    pub total_paid_on_invoices: Money,
    pub outstanding_invoices: Money,
    pub unpaid_invoice_count: usize,
    pub current_period: CurrentPeriodCharge,
    /// Invoiced balance plus current-period balance
    pub total_owed: Money,
}

impl StudentBalance {
    pub fn compute(
        student: &Student,
        subjects: &[Subject],
        attendance: &[AttendanceRecord],
        payments: &[Payment],
        invoices: &[Invoice],
    ) -> Self {
        let outstanding_invoices = outstanding_invoice_total(student.id, invoices);
        let current_period = CurrentPeriodCharge::compute(student, subjects, attendance, payments);

        Self {
            student_id: student.id,
            total_invoiced: total_invoiced(student.id, invoices),
            total_paid_on_invoices: total_paid_on_invoices(student.id, invoices),
            outstanding_invoices,
            unpaid_invoice_count: unpaid_invoice_count(student.id, invoices),
            current_period,
            total_owed: outstanding_invoices + current_period.balance,
        }
    }

    /// Amount to pre-fill when recording a payment
    ///
    /// The unpaid invoice total when there is one, otherwise the
    /// current-period balance.
    pub fn suggested_payment(&self) -> Money {
        if self.outstanding_invoices.is_positive() {
            self.outstanding_invoices
        } else {
            self.current_period.balance
        }
    }
}
