//! Billing Domain - Attendance-Based Tutoring Billing
//!
//! This crate turns per-subject attendance marks into invoices and tracks the
//! payments made against them.
//!
//! # Billing Rules
//!
//! - Every attendance record, present or absent, means a class was held
//! - Four consecutive records for a student and subject form a **period**
//! - Each completed period is invoiced exactly once, for the full subject fee
//! - The trailing incomplete period is charged at a quarter of the fee per
//!   class until it completes
//! - Payments settle outstanding invoices oldest first; any excess is booked
//!   against the current period
//!
//! # Components
//!
//! - [`period`]: groups attendance into periods
//! - [`generator`]: creates the invoices for completed periods
//! - [`balance`]: invoiced and current-period balances
//! - [`allocation`]: splits a payment across invoices
//! - [`status`]: the derived account status
//! - [`auto_generation`]: debounced regeneration driven by the [`BillingCache`]
//! - [`services`]: the [`BillingService`] facade over a [`BillingStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingConfig, BillingService, BillingStore, PaymentRequest};
//!
//! let service = BillingService::new(BillingStore::in_memory(), BillingConfig::default());
//!
//! let maths = service.add_subject("Maths", Money::from_major(2000)).await?;
//! let student = service.add_student("Kasun", "0771234567", "", vec![maths]).await?;
//!
//! for date in dates {
//!     service.mark_attendance(student, maths, date, true).await?;
//! }
//! service.generate_invoices().await?;
//!
//! service.record_payment(PaymentRequest::new(student, Money::from_major(2500), today)).await?;
//! ```

pub mod adapters;
pub mod allocation;
pub mod attendance;
pub mod auto_generation;
pub mod balance;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod invoice;
pub mod payment;
pub mod period;
pub mod ports;
pub mod reminder;
pub mod roster;
pub mod scheduler;
pub mod services;
pub mod stats;
pub mod status;
pub mod validation;

pub use adapters::{InMemoryCollection, RecordingNotifier};
pub use allocation::{allocate, Allocation, InvoiceUpdate, PaymentRequest};
pub use attendance::{AttendancePatch, AttendanceRecord, MarkAction};
pub use auto_generation::AutoGeneration;
pub use balance::{CurrentPeriodCharge, StudentBalance};
pub use cache::{BillingCache, BillingSnapshot};
pub use config::BillingConfig;
pub use error::{BillingError, BillingResult};
pub use generator::{plan_invoices, GenerationFailure, GenerationReport, InvoiceGenerator};
pub use invoice::{Invoice, InvoicePatch, InvoiceStatus};
pub use payment::{Payment, PaymentPatch};
pub use period::{Period, PeriodGrouping, PeriodKey, PERIOD_SIZE};
pub use ports::{
    BillingStore, InMemoryBackend, InsertOutcome, InvoicePort, NotificationPort, OutboundMessage,
};
pub use reminder::compose_reminder;
pub use roster::{Student, StudentPatch, Subject, SubjectPatch};
pub use scheduler::DebouncedTrigger;
pub use services::{summarize, BillingService, StudentSummary};
pub use stats::{DashboardStats, InvoiceTotals};
pub use status::AccountStatus;
