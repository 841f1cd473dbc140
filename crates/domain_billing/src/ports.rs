//! Billing Domain Ports
//!
//! The billing components talk to storage and to the outbound messaging
//! channel only through the traits defined here, so a hosted document store,
//! the in-memory adapter, or a test double can be swapped in.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::ports::BillingStore;
//!
//! let store = BillingStore::in_memory();
//! let id = store.subjects.add(Subject::new("Maths", Money::from_major(2000))).await?;
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use core_kernel::{CollectionPort, InvoiceId, PaymentId, PortError};

use crate::adapters::memory::InMemoryCollection;
use crate::attendance::AttendanceRecord;
use crate::invoice::Invoice;
use crate::payment::Payment;
use crate::roster::{Student, Subject};

/// Result of a conditional invoice insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The invoice was stored under this id
    Inserted(InvoiceId),
    /// An invoice with the same period key already exists
    AlreadyExists(InvoiceId),
}

/// Storage port for invoices
///
/// Extends the uniform collection contract with the two composite operations
/// billing needs.
#[async_trait]
pub trait InvoicePort: CollectionPort<Invoice> {
    /// Stores the invoice unless one with the same period key exists
    ///
    /// Implementations must make the check and the insert a single atomic step
    /// (unique index, transaction, or lock), so that two concurrent
    /// generation runs cannot both insert an invoice for the same period.
    async fn insert_if_absent(&self, invoice: Invoice) -> Result<InsertOutcome, PortError>;

    /// Marks an invoice paid by a specific payment, stamping `paid_at` with now
    async fn mark_as_paid(&self, invoice_id: InvoiceId, payment_id: PaymentId) -> Result<(), PortError>;
}

/// A composed reminder ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient phone number, digits only
    pub recipient: String,
    /// Message body
    pub body: String,
}

/// Outbound messaging channel
#[async_trait]
pub trait NotificationPort: Send + Sync + 'static {
    async fn send(&self, message: OutboundMessage) -> Result<(), PortError>;
}

/// The five collections billing reads and writes
#[derive(Clone)]
pub struct BillingStore {
    pub students: Arc<dyn CollectionPort<Student>>,
    pub subjects: Arc<dyn CollectionPort<Subject>>,
    pub attendance: Arc<dyn CollectionPort<AttendanceRecord>>,
    pub payments: Arc<dyn CollectionPort<Payment>>,
    pub invoices: Arc<dyn InvoicePort>,
}

impl BillingStore {
    /// Creates a store backed by empty in-memory collections
    pub fn in_memory() -> Self {
        InMemoryBackend::new().store()
    }
}

/// Concrete handles to the in-memory collections behind a [`BillingStore`]
///
/// Tests keep these to seed data or inject failures while the services only
/// see the trait objects.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    pub students: Arc<InMemoryCollection<Student>>,
    pub subjects: Arc<InMemoryCollection<Subject>>,
    pub attendance: Arc<InMemoryCollection<AttendanceRecord>>,
    pub payments: Arc<InMemoryCollection<Payment>>,
    pub invoices: Arc<InMemoryCollection<Invoice>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view of the backend
    pub fn store(&self) -> BillingStore {
        BillingStore {
            students: self.students.clone(),
            subjects: self.subjects.clone(),
            attendance: self.attendance.clone(),
            payments: self.payments.clone(),
            invoices: self.invoices.clone(),
        }
    }
}
