//! Live billing data
//!
//! [`BillingCache`] keeps a copy of the five collections in sync with the
//! store's change feed between [`start`](BillingCache::start) and
//! [`stop`](BillingCache::stop). Billing components never read the cache
//! directly; they receive a [`BillingSnapshot`] taken from it.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::debug;

use core_kernel::{CollectionPort, Document, StudentId, Subscription};

use crate::attendance::AttendanceRecord;
use crate::balance::StudentBalance;
use crate::invoice::Invoice;
use crate::payment::Payment;
use crate::ports::BillingStore;
use crate::roster::{Student, Subject};
use crate::status::AccountStatus;

/// A point-in-time copy of every billing collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSnapshot {
    pub students: Vec<Student>,
    pub subjects: Vec<Subject>,
    pub attendance: Vec<AttendanceRecord>,
    pub payments: Vec<Payment>,
    pub invoices: Vec<Invoice>,
}

impl BillingSnapshot {
    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Balance figures for one student
    pub fn balance_for(&self, student: &Student) -> StudentBalance {
        StudentBalance::compute(
            student,
            &self.subjects,
            &self.attendance,
            &self.payments,
            &self.invoices,
        )
    }

    pub fn status_for(&self, student: &Student) -> AccountStatus {
        AccountStatus::classify(&self.balance_for(student))
    }
}

type SharedSnapshot = Arc<RwLock<BillingSnapshot>>;

/// Process-wide cache fed by the store's subscriptions
pub struct BillingCache {
    snapshot: SharedSnapshot,
    version: Arc<watch::Sender<u64>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Default for BillingCache {
    fn default() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            snapshot: Arc::new(RwLock::new(BillingSnapshot::default())),
            version: Arc::new(version),
            subscriptions: Mutex::new(Vec::new()),
        }
    }
}

impl BillingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every collection of `store`
    ///
    /// Each subscription delivers the current contents immediately, so the
    /// cache is fully populated when this returns. Calling `start` again
    /// replaces the previous subscriptions.
    pub fn start(&self, store: &BillingStore) {
        self.stop();

        let subscriptions = vec![
            self.watch::<Student, _>(&*store.students, |s, docs| s.students = docs.to_vec()),
            self.watch::<Subject, _>(&*store.subjects, |s, docs| s.subjects = docs.to_vec()),
            self.watch::<AttendanceRecord, _>(&*store.attendance, |s, docs| s.attendance = docs.to_vec()),
            self.watch::<Payment, _>(&*store.payments, |s, docs| s.payments = docs.to_vec()),
            self.watch::<Invoice, _>(&*store.invoices, |s, docs| s.invoices = docs.to_vec()),
        ];
        *self.lock_subscriptions() = subscriptions;
        debug!("Billing cache started");
    }

    /// Drops every subscription; the last snapshot stays readable
    ///
    /// Receivers from [`changes`](Self::changes) see one last bump, after
    /// which [`is_running`](Self::is_running) is false.
    pub fn stop(&self) {
        let subscriptions = std::mem::take(&mut *self.lock_subscriptions());
        if subscriptions.is_empty() {
            return;
        }
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.version.send_modify(|v| *v += 1);
        debug!("Billing cache stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.lock_subscriptions().is_empty()
    }

    /// Copies the current contents
    pub fn snapshot(&self) -> BillingSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Receiver whose value increases on every collection change
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn watch<T, P>(&self, port: &P, apply: fn(&mut BillingSnapshot, &[T])) -> Subscription
    where
        T: Document,
        P: CollectionPort<T> + ?Sized,
    {
        let snapshot = self.snapshot.clone();
        let version = self.version.clone();
        port.subscribe(Arc::new(move |docs: &[T]| {
            let mut guard = snapshot.write().unwrap_or_else(|e| e.into_inner());
            apply(&mut *guard, docs);
            drop(guard);
            version.send_modify(|v| *v += 1);
        }))
    }
}

impl Drop for BillingCache {
    fn drop(&mut self) {
        self.stop();
    }
}
