//! Period grouping
//!
//! A student-subject pair's attendance, sorted by date, is cut into
//! consecutive runs of [`PERIOD_SIZE`] records. The Nth period (1-indexed)
//! holds the records at sorted positions `[4(N-1), 4N)`. Whatever is left
//! over (0 to 3 records) is the current, not-yet-invoiced period.
//!
//! Because attendance is unique per (student, subject, date), chunking by
//! record count is the same as chunking by class sessions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{StudentId, SubjectId};

use crate::attendance::AttendanceRecord;

/// Number of attendance records in one billing period
pub const PERIOD_SIZE: usize = 4;

/// Deterministic idempotency key for one period instance
///
/// Built from (student, subject, first date, last date); an invoice carrying
/// a key is permanently tied to the four dates it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn new(
        student_id: StudentId,
        subject_id: SubjectId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Self {
        Self(format!(
            "{}-{}-{}-{}",
            student_id.as_uuid(),
            subject_id.as_uuid(),
            first,
            last
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeriodKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A complete billing period of exactly four records
#[derive(Debug, Clone, Copy)]
pub struct Period<'a> {
    student_id: StudentId,
    subject_id: SubjectId,
    number: usize,
    records: &'a [&'a AttendanceRecord],
}

impl<'a> Period<'a> {
    /// 1-based position of this period in the pair's history
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn records(&self) -> &'a [&'a AttendanceRecord] {
        self.records
    }

    pub fn start(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn end(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    pub fn key(&self) -> PeriodKey {
        PeriodKey::new(self.student_id, self.subject_id, self.start(), self.end())
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn present_days(&self) -> u32 {
        self.records.iter().filter(|r| r.present).count() as u32
    }

    pub fn absent_days(&self) -> u32 {
        self.records.len() as u32 - self.present_days()
    }
}

/// Attendance for one student-subject pair, sorted and ready to cut into periods
#[derive(Debug, Clone)]
pub struct PeriodGrouping<'a> {
    student_id: StudentId,
    subject_id: SubjectId,
    sorted: Vec<&'a AttendanceRecord>,
}

impl<'a> PeriodGrouping<'a> {
    /// Groups the records belonging to (student, subject) from a mixed slice
    pub fn for_pair(
        student_id: StudentId,
        subject_id: SubjectId,
        attendance: &'a [AttendanceRecord],
    ) -> Self {
        let mut sorted: Vec<&AttendanceRecord> = attendance
            .iter()
            .filter(|a| a.belongs_to(student_id, subject_id))
            .collect();
        sorted.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));

        Self {
            student_id,
            subject_id,
            sorted,
        }
    }

    /// Total number of records for the pair
    pub fn record_count(&self) -> usize {
        self.sorted.len()
    }

    /// Lazily yields every complete period, oldest first
    pub fn completed(&self) -> impl Iterator<Item = Period<'_>> + '_ {
        self.sorted
            .chunks_exact(PERIOD_SIZE)
            .enumerate()
            .map(move |(index, records)| Period {
                student_id: self.student_id,
                subject_id: self.subject_id,
                number: index + 1,
                records,
            })
    }

    pub fn completed_count(&self) -> usize {
        self.sorted.len() / PERIOD_SIZE
    }

    /// Trailing records that do not yet form a period
    pub fn remainder(&self) -> &[&'a AttendanceRecord] {
        let start = self.completed_count() * PERIOD_SIZE;
        &self.sorted[start..]
    }

    pub fn remainder_len(&self) -> usize {
        self.sorted.len() % PERIOD_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(student: StudentId, subject: SubjectId, days: &[u32]) -> Vec<AttendanceRecord> {
        days.iter()
            .map(|d| {
                AttendanceRecord::new(
                    student,
                    subject,
                    NaiveDate::from_ymd_opt(2024, 1, *d).unwrap(),
                    d % 2 == 0,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_attendance_has_no_periods() {
        let grouping = PeriodGrouping::for_pair(StudentId::new(), SubjectId::new(), &[]);
        assert_eq!(grouping.completed().count(), 0);
        assert!(grouping.remainder().is_empty());
    }

    #[test]
    fn test_unordered_input_is_sorted_before_chunking() {
        let student = StudentId::new();
        let subject = SubjectId::new();
        let attendance = marks(student, subject, &[9, 2, 5, 1, 7]);

        let grouping = PeriodGrouping::for_pair(student, subject, &attendance);
        let periods: Vec<_> = grouping.completed().collect();

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].number(), 1);
        assert_eq!(periods[0].start().to_string(), "2024-01-01");
        assert_eq!(periods[0].end().to_string(), "2024-01-07");
        assert_eq!(grouping.remainder().len(), 1);
        assert_eq!(grouping.remainder()[0].date.to_string(), "2024-01-09");
    }

    #[test]
    fn test_other_pairs_are_ignored() {
        let student = StudentId::new();
        let subject = SubjectId::new();
        let mut attendance = marks(student, subject, &[1, 2, 3]);
        attendance.extend(marks(student, SubjectId::new(), &[4, 5]));
        attendance.extend(marks(StudentId::new(), subject, &[6]));

        let grouping = PeriodGrouping::for_pair(student, subject, &attendance);
        assert_eq!(grouping.record_count(), 3);
        assert_eq!(grouping.completed_count(), 0);
        assert_eq!(grouping.remainder_len(), 3);
    }

    #[test]
    fn test_present_absent_split() {
        let student = StudentId::new();
        let subject = SubjectId::new();
        // even days are present
        let attendance = marks(student, subject, &[1, 2, 3, 4]);

        let grouping = PeriodGrouping::for_pair(student, subject, &attendance);
        let period = grouping.completed().next().unwrap();

        assert_eq!(period.present_days(), 2);
        assert_eq!(period.absent_days(), 2);
        assert_eq!(period.dates().len(), PERIOD_SIZE);
    }

    #[test]
    fn test_period_key_is_stable() {
        let student = StudentId::new();
        let subject = SubjectId::new();
        let attendance = marks(student, subject, &[1, 2, 3, 4]);

        let first = PeriodGrouping::for_pair(student, subject, &attendance)
            .completed()
            .next()
            .unwrap()
            .key();
        let again = PeriodGrouping::for_pair(student, subject, &attendance)
            .completed()
            .next()
            .unwrap()
            .key();

        assert_eq!(first, again);
        assert!(first.as_str().ends_with("2024-01-01-2024-01-04"));
    }
}
