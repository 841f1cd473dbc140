//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use core_kernel::{Money, StudentId, SubjectId};
use domain_billing::{
    AttendanceRecord, BillingSnapshot, Invoice, InvoiceStatus, Payment, PeriodGrouping, Student,
    Subject,
};

use crate::fixtures::{DateFixtures, RosterFixtures};

/// Builder for attendance runs of one student and subject
pub struct AttendanceBuilder {
    student_id: StudentId,
    subject_id: SubjectId,
    dates: Vec<NaiveDate>,
    absent: Vec<usize>,
}

impl AttendanceBuilder {
    /// Creates a builder for the pair with no classes yet
    pub fn for_pair(student_id: StudentId, subject_id: SubjectId) -> Self {
        Self {
            student_id,
            subject_id,
            dates: Vec::new(),
            absent: Vec::new(),
        }
    }

    /// Adds `count` twice-weekly classes from the term start
    pub fn classes(mut self, count: usize) -> Self {
        self.dates = DateFixtures::twice_weekly(count);
        self
    }

    /// Uses explicit class dates
    pub fn on_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.dates = dates;
        self
    }

    /// Marks the classes at these positions (0-indexed) as absent
    pub fn absent_at(mut self, positions: &[usize]) -> Self {
        self.absent = positions.to_vec();
        self
    }

    /// Builds the records
    pub fn build(self) -> Vec<AttendanceRecord> {
        self.dates
            .iter()
            .enumerate()
            .map(|(i, &date)| {
                AttendanceRecord::new(self.student_id, self.subject_id, date, !self.absent.contains(&i))
            })
            .collect()
    }
}

/// Builder for invoices in a given payment state
pub struct TestInvoiceBuilder {
    student: Student,
    subject: Subject,
    period_number: usize,
    paid_amount: Money,
    created_at: Option<DateTime<Utc>>,
}

impl TestInvoiceBuilder {
    pub fn new(student: &Student, subject: &Subject) -> Self {
        Self {
            student: student.clone(),
            subject: subject.clone(),
            period_number: 1,
            paid_amount: Money::ZERO,
            created_at: None,
        }
    }

    /// Bills the Nth period (1-indexed) of the twice-weekly schedule
    pub fn period(mut self, number: usize) -> Self {
        self.period_number = number.max(1);
        self
    }

    /// Records an amount already paid; the status follows from it
    pub fn paid(mut self, amount: Money) -> Self {
        self.paid_amount = amount;
        self
    }

    /// Sets the creation time to `days` days ago
    pub fn created_days_ago(mut self, days: i64) -> Self {
        self.created_at = Some(Utc::now() - Duration::days(days));
        self
    }

    pub fn build(self) -> Invoice {
        let records = AttendanceBuilder::for_pair(self.student.id, self.subject.id)
            .classes(self.period_number * 4)
            .build();
        let grouping = PeriodGrouping::for_pair(self.student.id, self.subject.id, &records);
        let period = grouping
            .completed()
            .last()
            .expect("builder always produces at least one period");

        let mut invoice = Invoice::for_period(&self.student, &self.subject, &period, 7);
        invoice.paid_amount = self.paid_amount;
        invoice.status = InvoiceStatus::for_paid_amount(self.paid_amount, invoice.amount);
        if let Some(created_at) = self.created_at {
            invoice.created_at = created_at;
        }
        invoice
    }
}

/// Builder for whole snapshots
#[derive(Default)]
pub struct SnapshotBuilder {
    snapshot: BillingSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One student enrolled in maths with `classes` attendance records
    pub fn single_student(classes: usize) -> Self {
        let maths = RosterFixtures::maths();
        let student = RosterFixtures::student_in(&[&maths]);
        let attendance = AttendanceBuilder::for_pair(student.id, maths.id)
            .classes(classes)
            .build();
        Self::new()
            .subject(maths)
            .student(student)
            .attendance(attendance)
    }

    pub fn student(mut self, student: Student) -> Self {
        self.snapshot.students.push(student);
        self
    }

    pub fn subject(mut self, subject: Subject) -> Self {
        self.snapshot.subjects.push(subject);
        self
    }

    pub fn attendance(mut self, records: Vec<AttendanceRecord>) -> Self {
        self.snapshot.attendance.extend(records);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.snapshot.payments.push(payment);
        self
    }

    pub fn invoice(mut self, invoice: Invoice) -> Self {
        self.snapshot.invoices.push(invoice);
        self
    }

    pub fn build(self) -> BillingSnapshot {
        self.snapshot
    }
}
