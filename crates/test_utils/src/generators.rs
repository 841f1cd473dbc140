//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{Days, NaiveDate};
use core_kernel::{Money, StudentId, SubjectId};
use domain_billing::AttendanceRecord;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for positive amounts with up to two decimal places
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)))
}

/// Strategy for whole-unit subject fees
pub fn fee_strategy() -> impl Strategy<Value = Money> {
    (1i64..50_000i64).prop_map(Money::from_major)
}

/// Strategy for a set of distinct class dates within two years, unordered
pub fn class_dates_strategy(max: usize) -> impl Strategy<Value = Vec<NaiveDate>> {
    prop::collection::btree_set(0u64..730, 0..=max).prop_flat_map(|offsets| {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let dates: Vec<NaiveDate> = offsets
            .into_iter()
            .filter_map(|d| base.checked_add_days(Days::new(d)))
            .collect();
        Just(dates).prop_shuffle()
    })
}

/// Strategy for attendance of one pair, in random order with random presence
pub fn attendance_strategy(
    student_id: StudentId,
    subject_id: SubjectId,
    max: usize,
) -> impl Strategy<Value = Vec<AttendanceRecord>> {
    class_dates_strategy(max).prop_flat_map(move |dates| {
        let len = dates.len();
        prop::collection::vec(any::<bool>(), len).prop_map(move |presence| {
            dates
                .iter()
                .zip(presence)
                .map(|(&date, present)| AttendanceRecord::new(student_id, subject_id, date, present))
                .collect()
        })
    })
}
