//! In-memory adapters
//!
//! `InMemoryCollection` keeps documents in insertion order behind a mutex and
//! pushes the full collection to subscribers after every change. Writes can be
//! made to fail on demand so callers' failure policies can be exercised.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use core_kernel::{
    CollectionPort, Document, DomainPort, InvoiceId, PaymentId, PortError, SnapshotCallback,
    SubscriberRegistry, Subscription,
};

use crate::invoice::{Invoice, InvoicePatch, InvoiceStatus};
use crate::ports::{InsertOutcome, InvoicePort, NotificationPort, OutboundMessage};

/// A document collection held in process memory
pub struct InMemoryCollection<T: Document> {
    documents: Mutex<Vec<T>>,
    subscribers: Arc<SubscriberRegistry<T>>,
    failing_writes: Mutex<usize>,
}

impl<T: Document> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            subscribers: SubscriberRegistry::new(),
            failing_writes: Mutex::new(0),
        }
    }
}

impl<T: Document> InMemoryCollection<T> {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection pre-populated with documents, keeping their timestamps
    pub fn with_documents(documents: Vec<T>) -> Self {
        let collection = Self::new();
        *collection.lock_documents() = documents;
        collection
    }

    /// Current contents, in insertion order
    pub fn snapshot(&self) -> Vec<T> {
        self.lock_documents().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes the next `count` write operations fail with `ServiceUnavailable`
    pub fn fail_next_writes(&self, count: usize) {
        *self.failing_writes.lock().unwrap_or_else(|e| e.into_inner()) = count;
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn lock_documents(&self) -> MutexGuard<'_, Vec<T>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_write(&self) -> Result<(), PortError> {
        let mut failing = self.failing_writes.lock().unwrap_or_else(|e| e.into_inner());
        if *failing > 0 {
            *failing -= 1;
            return Err(PortError::service_unavailable(T::COLLECTION));
        }
        Ok(())
    }

    fn publish(&self, snapshot: Vec<T>) {
        self.subscribers.notify(&snapshot);
    }

    /// Runs `mutate` under the lock, then publishes the resulting snapshot
    fn mutate<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<T>) -> Result<R, PortError>,
    ) -> Result<R, PortError> {
        let (result, snapshot) = {
            let mut documents = self.lock_documents();
            let result = mutate(&mut *documents)?;
            (result, documents.clone())
        };
        self.publish(snapshot);
        Ok(result)
    }
}

impl<T: Document> DomainPort for InMemoryCollection<T> {}

#[async_trait]
impl<T: Document> CollectionPort<T> for InMemoryCollection<T> {
    async fn list(&self) -> Result<Vec<T>, PortError> {
        Ok(self.snapshot())
    }

    async fn get(&self, id: T::Id) -> Result<T, PortError> {
        self.lock_documents()
            .iter()
            .find(|d| d.id() == id)
            .cloned()
            .ok_or_else(|| PortError::not_found(T::COLLECTION, id))
    }

    async fn add(&self, mut record: T) -> Result<T::Id, PortError> {
        self.check_write()?;
        record.set_created_at(Utc::now());
        let id = record.id();
        self.mutate(|documents| {
            if documents.iter().any(|d| d.id() == id) {
                return Err(PortError::conflict(format!(
                    "{} already contains {}",
                    T::COLLECTION,
                    id
                )));
            }
            documents.push(record);
            Ok(())
        })?;
        debug!(collection = T::COLLECTION, %id, "Document added");
        Ok(id)
    }

    async fn update(&self, id: T::Id, patch: T::Patch) -> Result<(), PortError> {
        self.check_write()?;
        self.mutate(|documents| {
            let document = documents
                .iter_mut()
                .find(|d| d.id() == id)
                .ok_or_else(|| PortError::not_found(T::COLLECTION, id))?;
            document.apply_patch(patch);
            Ok(())
        })
    }

    async fn delete(&self, id: T::Id) -> Result<(), PortError> {
        self.check_write()?;
        self.mutate(|documents| {
            let before = documents.len();
            documents.retain(|d| d.id() != id);
            if documents.len() == before {
                return Err(PortError::not_found(T::COLLECTION, id));
            }
            Ok(())
        })
    }

    fn subscribe(&self, callback: SnapshotCallback<T>) -> Subscription {
        let subscription = self.subscribers.register(callback.clone());
        callback(&self.snapshot());
        subscription
    }
}

#[async_trait]
impl InvoicePort for InMemoryCollection<Invoice> {
    async fn insert_if_absent(&self, mut invoice: Invoice) -> Result<InsertOutcome, PortError> {
        self.check_write()?;
        invoice.set_created_at(Utc::now());
        let key = invoice.period_key.clone();

        let (outcome, snapshot) = {
            let mut documents = self.lock_documents();
            if let Some(existing) = documents.iter().find(|d| d.period_key == key) {
                return Ok(InsertOutcome::AlreadyExists(existing.id));
            }
            let id = invoice.id;
            documents.push(invoice);
            (InsertOutcome::Inserted(id), documents.clone())
        };
        self.publish(snapshot);
        Ok(outcome)
    }

    async fn mark_as_paid(&self, invoice_id: InvoiceId, payment_id: PaymentId) -> Result<(), PortError> {
        self.update(
            invoice_id,
            InvoicePatch {
                status: Some(InvoiceStatus::Paid),
                payment_id: Some(payment_id),
                paid_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }
}

/// Notification adapter that records messages instead of sending them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn send(&self, message: OutboundMessage) -> Result<(), PortError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(())
    }
}
