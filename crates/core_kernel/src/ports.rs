//! Ports and Adapters Infrastructure
//!
//! This module provides the storage collaborator contract shared by every
//! persisted record type (students, subjects, attendance, payments, invoices).
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Billing Services                         │
//! │      (invoice generation, payment allocation, balances)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CollectionPort<T: Document>                 │
//! │        add / get / list / update / delete / subscribe        │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  In-memory store  │     │  Hosted document │
//!         │  (tests, runner)  │     │  store adapter   │
//!         └───────────────────┘     └──────────────────┘
//! ```
//!
//! Each collection pushes its full current contents to subscribers on every
//! change, and once immediately on subscription.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;

/// Error type for port operations
///
/// Provides a unified error type that all storage adapters must use.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested document was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The operation conflicts with existing data (e.g. a uniqueness constraint)
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// The store is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a ServiceUnavailable error
    pub fn service_unavailable(service: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::ServiceUnavailable { .. })
    }

    /// Returns true if this error indicates the document was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// A record persisted as a flat field-value document with a generated identity
pub trait Document: Clone + Send + Sync + 'static {
    /// Identity type of the record
    type Id: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static;
    /// Partial field update accepted by `CollectionPort::update`
    type Patch: Send + Sync + 'static;

    /// Collection name, used in logs and errors
    const COLLECTION: &'static str;

    fn id(&self) -> Self::Id;

    fn created_at(&self) -> DateTime<Utc>;

    /// Stamps the creation time; called by the store on `add`
    fn set_created_at(&mut self, at: DateTime<Utc>);

    /// Applies a partial update in place
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Callback receiving the full current collection
pub type SnapshotCallback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// The uniform storage collaborator contract for one record type
///
/// All methods except `subscribe` are async and return `Result<T, PortError>`
/// for consistent error handling across different adapter implementations.
#[async_trait::async_trait]
pub trait CollectionPort<T: Document>: DomainPort {
    /// Returns every document in the collection
    async fn list(&self) -> Result<Vec<T>, PortError>;

    /// Retrieves a document by ID, or `PortError::NotFound`
    async fn get(&self, id: T::Id) -> Result<T, PortError>;

    /// Adds a document, assigning its creation timestamp, and returns its ID
    async fn add(&self, record: T) -> Result<T::Id, PortError>;

    /// Applies a partial update to an existing document
    async fn update(&self, id: T::Id, patch: T::Patch) -> Result<(), PortError>;

    /// Deletes a document
    async fn delete(&self, id: T::Id) -> Result<(), PortError>;

    /// Registers a change listener
    ///
    /// The callback fires immediately with the current snapshot, then again
    /// after every change. Dropping or calling `unsubscribe` on the returned
    /// handle stops delivery.
    fn subscribe(&self, callback: SnapshotCallback<T>) -> Subscription;
}

/// Handle to an active subscription
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Creates a handle that runs `cancel` when the subscription ends
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stops delivery of further snapshots
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Listener bookkeeping for adapters that push snapshots
pub struct SubscriberRegistry<T> {
    next_id: Mutex<u64>,
    listeners: Mutex<HashMap<u64, SnapshotCallback<T>>>,
}

impl<T: Send + Sync + 'static> SubscriberRegistry<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: Mutex::new(0),
            listeners: Mutex::new(HashMap::new()),
        })
    }

    /// Registers a callback and returns a handle that removes it
    pub fn register(self: &Arc<Self>, callback: SnapshotCallback<T>) -> Subscription {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);

        let registry: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .listeners
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
            }
        })
    }

    /// Pushes a snapshot to every registered listener
    pub fn notify(&self, snapshot: &[T]) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let listeners: Vec<SnapshotCallback<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    /// Number of active listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
