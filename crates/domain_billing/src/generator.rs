//! Invoice Generator
//!
//! Turns completed attendance periods into invoices, at most one per period key.
//!
//! Generation is split in two steps:
//!
//! 1. [`plan_invoices`] is pure: it groups each enrolled subject's attendance
//!    into periods and synthesizes an invoice for every completed period whose
//!    key is not among the existing invoices.
//! 2. [`InvoiceGenerator::generate`] persists the plan through
//!    [`InvoicePort::insert_if_absent`], one awaited write at a time. A failed
//!    write is logged and skipped; the period key stays unconsumed so the next
//!    run picks it up.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::attendance::AttendanceRecord;
use crate::cache::BillingSnapshot;
use crate::invoice::Invoice;
use crate::period::{PeriodGrouping, PeriodKey};
use crate::ports::{InsertOutcome, InvoicePort};
use crate::roster::{find_subject, Student, Subject};

/// Synthesizes the invoices a student is missing, without touching storage
///
/// Subjects listed more than once on the student, or missing from `subjects`,
/// never produce extra invoices.
pub fn plan_invoices(
    student: &Student,
    subjects: &[Subject],
    attendance: &[AttendanceRecord],
    existing: &[Invoice],
    due_after_days: u64,
) -> Vec<Invoice> {
    let mut seen: HashSet<PeriodKey> = existing
        .iter()
        .filter(|inv| inv.student_id == student.id)
        .map(|inv| inv.period_key.clone())
        .collect();

    let mut planned = Vec::new();
    for &subject_id in &student.subjects {
        let Some(subject) = find_subject(subjects, subject_id) else {
            debug!(%subject_id, "Enrolled subject not found, skipping");
            continue;
        };

        let grouping = PeriodGrouping::for_pair(student.id, subject_id, attendance);
        for period in grouping.completed() {
            if seen.insert(period.key()) {
                planned.push(Invoice::for_period(student, subject, &period, due_after_days));
            }
        }
    }
    planned
}

/// A planned invoice whose write failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub period_key: PeriodKey,
    pub error: String,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Invoices stored by this run
    pub created: Vec<Invoice>,
    /// Planned invoices the store already held
    pub skipped: usize,
    /// Writes that failed and will be retried by the next run
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: GenerationReport) {
        self.created.extend(other.created);
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Persists invoices for completed periods
#[derive(Clone)]
pub struct InvoiceGenerator {
    invoices: Arc<dyn InvoicePort>,
    due_after_days: u64,
}

impl InvoiceGenerator {
    pub fn new(invoices: Arc<dyn InvoicePort>, due_after_days: u64) -> Self {
        Self {
            invoices,
            due_after_days,
        }
    }

    /// Generates and stores the missing invoices for one student
    ///
    /// Returns the invoices this call stored. Calling it again with the same
    /// inputs stores nothing.
    pub async fn generate(
        &self,
        student: &Student,
        subjects: &[Subject],
        attendance: &[AttendanceRecord],
        existing: &[Invoice],
    ) -> Vec<Invoice> {
        self.generate_with_report(student, subjects, attendance, existing)
            .await
            .created
    }

    /// Same as [`generate`](Self::generate), also reporting skips and failures
    #[instrument(skip_all, fields(student_id = %student.id))]
    pub async fn generate_with_report(
        &self,
        student: &Student,
        subjects: &[Subject],
        attendance: &[AttendanceRecord],
        existing: &[Invoice],
    ) -> GenerationReport {
        let planned = plan_invoices(student, subjects, attendance, existing, self.due_after_days);
        let mut report = GenerationReport::default();

        for invoice in planned {
            let period_key = invoice.period_key.clone();
            match self.invoices.insert_if_absent(invoice.clone()).await {
                Ok(InsertOutcome::Inserted(id)) => {
                    debug!(invoice_id = %id, %period_key, "Invoice created");
                    report.created.push(invoice);
                }
                Ok(InsertOutcome::AlreadyExists(id)) => {
                    debug!(invoice_id = %id, %period_key, "Invoice already exists");
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(%period_key, error = %err, transient = err.is_transient(), "Failed to store invoice");
                    report.failures.push(GenerationFailure {
                        period_key,
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Runs generation for every student in the snapshot
    #[instrument(skip_all, fields(students = snapshot.students.len()))]
    pub async fn generate_for_roster(&self, snapshot: &BillingSnapshot) -> GenerationReport {
        let mut report = GenerationReport::default();
        for student in &snapshot.students {
            let student_report = self
                .generate_with_report(
                    student,
                    &snapshot.subjects,
                    &snapshot.attendance,
                    &snapshot.invoices,
                )
                .await;
            report.merge(student_report);
        }

        info!(
            created = report.created_count(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "Invoice generation finished"
        );
        report
    }
}
