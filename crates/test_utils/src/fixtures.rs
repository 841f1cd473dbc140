//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for common entities of the billing system.
//! These fixtures are designed to be consistent and predictable for tests.

use chrono::{Days, NaiveDate};
use core_kernel::Money;
use domain_billing::{Student, Subject};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The standard period fee used across tests
    pub fn standard_fee() -> Money {
        Money::from_major(2000)
    }

    /// A fee that does not divide evenly into four classes
    pub fn uneven_fee() -> Money {
        Money::new(dec!(1250))
    }

    /// Creates a zero amount
    pub fn zero() -> Money {
        Money::ZERO
    }
}

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    /// First class date of the standard term
    pub fn term_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap_or_default()
    }

    /// `count` class dates, one every `step_days` from the term start
    pub fn class_dates(count: usize, step_days: u64) -> Vec<NaiveDate> {
        (0..count as u64)
            .map(|i| {
                Self::term_start()
                    .checked_add_days(Days::new(i * step_days))
                    .unwrap_or(NaiveDate::MAX)
            })
            .collect()
    }

    /// Twice-weekly class dates starting at the term start
    pub fn twice_weekly(count: usize) -> Vec<NaiveDate> {
        Self::class_dates(count, 3)
    }
}

/// Fixture for roster entities
pub struct RosterFixtures;

impl RosterFixtures {
    pub fn maths() -> Subject {
        Subject::new("Mathematics", MoneyFixtures::standard_fee())
    }

    pub fn science() -> Subject {
        Subject::new("Science", Money::from_major(1600))
    }

    /// A student enrolled in the given subjects
    pub fn student_in(subjects: &[&Subject]) -> Student {
        Student::new(
            "Kasun Perera",
            "+94 77 123 4567",
            "Royal College",
            subjects.iter().map(|s| s.id).collect(),
        )
    }
}
