//! Core Kernel - Foundational types for the tutoring billing system
//!
//! This crate provides the building blocks shared by the billing domain and
//! its adapters:
//! - Money with precise decimal arithmetic
//! - Strongly-typed identifiers for every persisted record
//! - The uniform storage collaborator contract (ports)

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError};
pub use identifiers::{StudentId, SubjectId, AttendanceId, InvoiceId, PaymentId};
pub use ports::{
    CollectionPort, Document, DomainPort, PortError, SnapshotCallback, Subscription,
    SubscriberRegistry,
};
