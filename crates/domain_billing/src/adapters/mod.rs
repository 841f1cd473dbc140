//! Storage and messaging adapters
//!
//! - **InMemoryCollection**: a process-local document collection implementing
//!   `CollectionPort` (and `InvoicePort` for invoices), used by the runner and tests
//! - **RecordingNotifier**: a `NotificationPort` that keeps sent messages in memory

pub mod memory;

pub use memory::{InMemoryCollection, RecordingNotifier};
