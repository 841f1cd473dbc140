//! Attendance records
//!
//! One record per (student, subject, date). A record's existence means a class
//! was held and is billable; `present` only records whether the student came.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AttendanceId, Document, StudentId, SubjectId};

/// A single attendance mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Unique identifier
    pub id: AttendanceId,
    /// Student the mark belongs to
    pub student_id: StudentId,
    /// Subject the class was held for
    pub subject_id: SubjectId,
    /// Class date
    pub date: NaiveDate,
    /// Whether the student attended
    pub present: bool,
    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Creates a new attendance record
    pub fn new(student_id: StudentId, subject_id: SubjectId, date: NaiveDate, present: bool) -> Self {
        Self {
            id: AttendanceId::new_v7(),
            student_id,
            subject_id,
            date,
            present,
            created_at: Utc::now(),
        }
    }

    /// Returns true if this record belongs to the (student, subject) pair
    pub fn belongs_to(&self, student_id: StudentId, subject_id: SubjectId) -> bool {
        self.student_id == student_id && self.subject_id == subject_id
    }
}

/// Partial update for an attendance record
#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
    pub present: Option<bool>,
}

impl Document for AttendanceRecord {
    type Id = AttendanceId;
    type Patch = AttendancePatch;

    const COLLECTION: &'static str = "attendance";

    fn id(&self) -> AttendanceId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn apply_patch(&mut self, patch: AttendancePatch) {
        if let Some(present) = patch.present {
            self.present = present;
        }
    }
}

/// Finds the record for a (student, subject, date) triple
pub fn find_mark(
    attendance: &[AttendanceRecord],
    student_id: StudentId,
    subject_id: SubjectId,
    date: NaiveDate,
) -> Option<&AttendanceRecord> {
    attendance
        .iter()
        .find(|a| a.belongs_to(student_id, subject_id) && a.date == date)
}

/// Upsert decision for marking attendance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkAction {
    /// No record exists for the triple
    Insert(AttendanceRecord),
    /// A record exists and its flag must be corrected
    Update { id: AttendanceId, present: bool },
    /// A record exists with the same flag
    Unchanged(AttendanceId),
}

/// Decides whether marking attendance inserts or updates
pub fn plan_mark(
    attendance: &[AttendanceRecord],
    student_id: StudentId,
    subject_id: SubjectId,
    date: NaiveDate,
    present: bool,
) -> MarkAction {
    match find_mark(attendance, student_id, subject_id, date) {
        Some(existing) if existing.present == present => MarkAction::Unchanged(existing.id),
        Some(existing) => MarkAction::Update {
            id: existing.id,
            present,
        },
        None => MarkAction::Insert(AttendanceRecord::new(student_id, subject_id, date, present)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_plan_mark_inserts_new_triple() {
        let student = StudentId::new();
        let subject = SubjectId::new();

        match plan_mark(&[], student, subject, date(1), true) {
            MarkAction::Insert(record) => {
                assert_eq!(record.student_id, student);
                assert_eq!(record.date, date(1));
                assert!(record.present);
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_mark_updates_existing_triple() {
        let student = StudentId::new();
        let subject = SubjectId::new();
        let existing = AttendanceRecord::new(student, subject, date(1), true);
        let attendance = vec![existing.clone()];

        assert_eq!(
            plan_mark(&attendance, student, subject, date(1), false),
            MarkAction::Update { id: existing.id, present: false }
        );
        assert_eq!(
            plan_mark(&attendance, student, subject, date(1), true),
            MarkAction::Unchanged(existing.id)
        );
    }

    #[test]
    fn test_other_subject_same_date_is_separate() {
        let student = StudentId::new();
        let attendance = vec![AttendanceRecord::new(student, SubjectId::new(), date(1), true)];

        assert!(matches!(
            plan_mark(&attendance, student, SubjectId::new(), date(1), true),
            MarkAction::Insert(_)
        ));
    }
}
