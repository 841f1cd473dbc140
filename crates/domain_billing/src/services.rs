//! Billing services
//!
//! [`BillingService`] is the entry point callers use. It validates input,
//! reads current data from the store, runs the pure billing components and
//! writes their results back.
//!
//! Multi-record writes (payment allocation, student deletion) are applied in
//! sequence without rollback: if a write fails midway the records already
//! written stay, and the error is returned.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use core_kernel::{Document, InvoiceId, Money, PaymentId, PortError, StudentId, SubjectId};

use crate::allocation::{allocate, Allocation, PaymentRequest};
use crate::attendance::{plan_mark, AttendancePatch, MarkAction};
use crate::balance::StudentBalance;
use crate::cache::BillingSnapshot;
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::generator::{GenerationReport, InvoiceGenerator};
use crate::invoice::{Invoice, InvoicePatch};
use crate::payment::{self, Payment};
use crate::ports::{BillingStore, NotificationPort, OutboundMessage};
use crate::reminder::compose_reminder;
use crate::roster::{Student, StudentPatch, Subject, SubjectPatch};
use crate::stats::{DashboardStats, InvoiceTotals};
use crate::status::AccountStatus;
use crate::validation::{validate_payment_amount, validate_student, validate_subject};

/// Everything shown for one student
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub student: Student,
    pub balance: StudentBalance,
    pub status: AccountStatus,
    pub unpaid_invoices: Vec<Invoice>,
}

/// Billing operations over a [`BillingStore`]
#[derive(Clone)]
pub struct BillingService {
    store: BillingStore,
    generator: InvoiceGenerator,
    notifier: Option<Arc<dyn NotificationPort>>,
    config: BillingConfig,
}

impl BillingService {
    pub fn new(store: BillingStore, config: BillingConfig) -> Self {
        let generator = InvoiceGenerator::new(store.invoices.clone(), config.due_after_days);
        Self {
            store,
            generator,
            notifier: None,
            config,
        }
    }

    /// Attaches the channel used by [`send_reminder`](Self::send_reminder)
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &BillingStore {
        &self.store
    }

    pub fn generator(&self) -> &InvoiceGenerator {
        &self.generator
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Reads every collection
    pub async fn load_snapshot(&self) -> BillingResult<BillingSnapshot> {
        Ok(BillingSnapshot {
            students: self.store.students.list().await?,
            subjects: self.store.subjects.list().await?,
            attendance: self.store.attendance.list().await?,
            payments: self.store.payments.list().await?,
            invoices: self.store.invoices.list().await?,
        })
    }

    // ========================================================================
    // Roster
    // ========================================================================

    /// Adds a student after validating name, phone and enrollment
    #[instrument(skip(self, phone, school))]
    pub async fn add_student(
        &self,
        name: &str,
        phone: &str,
        school: &str,
        subjects: Vec<SubjectId>,
    ) -> BillingResult<StudentId> {
        validate_student(name, phone, &subjects)?;
        let student = Student::new(name.trim(), phone.trim(), school.trim(), subjects);
        let id = self.store.students.add(student).await?;
        info!(student_id = %id, "Student added");
        Ok(id)
    }

    /// Applies an edit, validating the edited student as a whole
    #[instrument(skip(self, patch), fields(student_id = %id))]
    pub async fn update_student(&self, id: StudentId, patch: StudentPatch) -> BillingResult<()> {
        let mut edited = self.store.students.get(id).await?;
        edited.apply_patch(patch.clone());
        validate_student(&edited.name, &edited.phone, &edited.subjects)?;
        self.store.students.update(id, patch).await?;
        Ok(())
    }

    /// Deletes a student and then every payment they made
    ///
    /// Invoices and attendance records are kept.
    #[instrument(skip(self), fields(student_id = %id))]
    pub async fn delete_student(&self, id: StudentId) -> BillingResult<()> {
        self.store.students.delete(id).await?;

        let payments = self.store.payments.list().await?;
        let mut removed = 0usize;
        for payment in payment::for_student(id, &payments) {
            self.store.payments.delete(payment.id).await?;
            removed += 1;
        }
        info!(payments_removed = removed, "Student deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_subject(&self, name: &str, fee: Money) -> BillingResult<SubjectId> {
        validate_subject(name, fee)?;
        let id = self.store.subjects.add(Subject::new(name.trim(), fee)).await?;
        info!(subject_id = %id, "Subject added");
        Ok(id)
    }

    /// Applies an edit; a fee change affects only invoices generated afterwards
    #[instrument(skip(self, patch), fields(subject_id = %id))]
    pub async fn update_subject(&self, id: SubjectId, patch: SubjectPatch) -> BillingResult<()> {
        let mut edited = self.store.subjects.get(id).await?;
        edited.apply_patch(patch.clone());
        validate_subject(&edited.name, edited.fee)?;
        self.store.subjects.update(id, patch).await?;
        Ok(())
    }

    /// Deletes a subject; enrollments and invoices keep their dangling references
    #[instrument(skip(self), fields(subject_id = %id))]
    pub async fn delete_subject(&self, id: SubjectId) -> BillingResult<()> {
        self.store.subjects.delete(id).await?;
        Ok(())
    }

    // ========================================================================
    // Attendance
    // ========================================================================

    /// Records that a class was held for (student, subject, date)
    ///
    /// A second mark for the same triple corrects the `present` flag of the
    /// existing record. Records covered by an invoice cannot be corrected,
    /// and no record can be added on or before the last billed date of the
    /// pair, since either would change an invoiced period.
    #[instrument(skip(self), fields(student_id = %student_id, subject_id = %subject_id))]
    pub async fn mark_attendance(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        date: NaiveDate,
        present: bool,
    ) -> BillingResult<MarkAction> {
        let attendance = self.store.attendance.list().await?;
        let invoices = self.store.invoices.list().await?;
        let last_billed = invoices
            .iter()
            .filter(|inv| inv.student_id == student_id && inv.subject_id == subject_id)
            .map(|inv| inv.period_end)
            .max();

        let action = plan_mark(&attendance, student_id, subject_id, date, present);
        match &action {
            MarkAction::Insert(record) => {
                if last_billed.is_some_and(|end| date <= end) {
                    return Err(BillingError::validation(
                        "date",
                        format!("Attendance up to {} is already invoiced", date),
                    ));
                }
                self.store.attendance.add(record.clone()).await?;
                debug!(%date, present, "Attendance added");
            }
            MarkAction::Update { id, present } => {
                if last_billed.is_some_and(|end| date <= end) {
                    return Err(BillingError::validation(
                        "present",
                        format!("Attendance on {} is already invoiced", date),
                    ));
                }
                self.store
                    .attendance
                    .update(*id, AttendancePatch { present: Some(*present) })
                    .await?;
                debug!(%date, present, "Attendance corrected");
            }
            MarkAction::Unchanged(_) => {}
        }
        Ok(action)
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Generates missing invoices for every student
    pub async fn generate_invoices(&self) -> BillingResult<GenerationReport> {
        let snapshot = self.load_snapshot().await?;
        Ok(self.generator.generate_for_roster(&snapshot).await)
    }

    /// Generates missing invoices for one student
    pub async fn generate_for_student(&self, student_id: StudentId) -> BillingResult<Vec<Invoice>> {
        let snapshot = self.load_snapshot().await?;
        let student = snapshot
            .student(student_id)
            .ok_or_else(|| BillingError::NotFound(format!("student {}", student_id)))?;
        Ok(self
            .generator
            .generate(student, &snapshot.subjects, &snapshot.attendance, &snapshot.invoices)
            .await)
    }

    /// Pays off one invoice in full
    ///
    /// Records a payment for the invoice's remaining balance linked to it,
    /// then marks the invoice paid by that payment. Returns the payment id.
    #[instrument(skip(self, note), fields(invoice_id = %invoice_id))]
    pub async fn settle_invoice(
        &self,
        invoice_id: InvoiceId,
        date: NaiveDate,
        note: Option<String>,
    ) -> BillingResult<PaymentId> {
        let invoice = self.store.invoices.get(invoice_id).await?;
        if !invoice.is_outstanding() {
            return Err(BillingError::validation(
                "invoice",
                format!("Invoice {} is already paid", invoice.invoice_number),
            ));
        }

        let amount = invoice.balance_due();
        validate_payment_amount(amount)?;
        let note = note
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Payment for invoice {}", invoice.invoice_number));
        let payment = Payment::for_invoice(
            invoice.student_id,
            amount,
            date,
            note,
            invoice.id,
            invoice.invoice_number.clone(),
            false,
        );

        let payment_id = self.store.payments.add(payment).await?;
        self.store
            .invoices
            .update(
                invoice_id,
                InvoicePatch {
                    paid_amount: Some(invoice.amount),
                    ..Default::default()
                },
            )
            .await?;
        self.store.invoices.mark_as_paid(invoice_id, payment_id).await?;

        info!(payment_id = %payment_id, %amount, "Invoice settled");
        Ok(payment_id)
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Allocates a payment across the student's outstanding invoices and
    /// stores the result
    ///
    /// All payment records are written first, then the invoice updates.
    #[instrument(skip(self, request), fields(student_id = %request.student_id, amount = %request.amount))]
    pub async fn record_payment(&self, request: PaymentRequest) -> BillingResult<Allocation> {
        validate_payment_amount(request.amount)?;
        self.store.students.get(request.student_id).await?;

        let invoices = self.store.invoices.list().await?;
        let allocation = allocate(&request, &invoices, Utc::now())?;

        for payment in &allocation.payments {
            self.store.payments.add(payment.clone()).await?;
        }
        for update in &allocation.invoice_updates {
            self.store
                .invoices
                .update(update.invoice_id, InvoicePatch::from(update))
                .await?;
        }

        info!(
            payments = allocation.payments.len(),
            invoices_updated = allocation.invoice_updates.len(),
            "Payment recorded"
        );
        Ok(allocation)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Balance, status and unpaid invoices for one student
    pub async fn student_summary(&self, student_id: StudentId) -> BillingResult<StudentSummary> {
        let snapshot = self.load_snapshot().await?;
        summarize(&snapshot, student_id)
    }

    /// Amount to pre-fill when recording a payment for the student
    pub async fn suggested_payment(&self, student_id: StudentId) -> BillingResult<Money> {
        Ok(self.student_summary(student_id).await?.balance.suggested_payment())
    }

    /// Sends a reminder for everything the student owes
    ///
    /// Returns `None` without sending when nothing is owed.
    #[instrument(skip(self), fields(student_id = %student_id))]
    pub async fn send_reminder(&self, student_id: StudentId) -> BillingResult<Option<OutboundMessage>> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or_else(|| BillingError::Persistence(PortError::service_unavailable("notifications")))?;

        let summary = self.student_summary(student_id).await?;
        let amount = summary.balance.total_owed;
        if !amount.is_positive() {
            debug!("Nothing owed, no reminder sent");
            return Ok(None);
        }

        let message = compose_reminder(&summary.student, amount, &self.config.currency_label);
        notifier.send(message.clone()).await?;
        info!(%amount, "Reminder sent");
        Ok(Some(message))
    }

    pub async fn dashboard(&self) -> BillingResult<DashboardStats> {
        Ok(DashboardStats::compute(&self.load_snapshot().await?))
    }

    pub async fn invoice_totals(&self) -> BillingResult<InvoiceTotals> {
        let today = Utc::now().date_naive();
        Ok(InvoiceTotals::compute(&self.store.invoices.list().await?, today))
    }
}

/// Builds a student's summary from a snapshot
pub fn summarize(snapshot: &BillingSnapshot, student_id: StudentId) -> BillingResult<StudentSummary> {
    let student = snapshot
        .student(student_id)
        .ok_or_else(|| BillingError::NotFound(format!("student {}", student_id)))?;
    let balance = snapshot.balance_for(student);

    Ok(StudentSummary {
        student: student.clone(),
        status: AccountStatus::classify(&balance),
        unpaid_invoices: crate::invoice::unpaid_for_student(student_id, &snapshot.invoices)
            .into_iter()
            .cloned()
            .collect(),
        balance,
    })
}
