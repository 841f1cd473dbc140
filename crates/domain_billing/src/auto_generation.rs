//! Automatic invoice generation
//!
//! [`AutoGeneration`] follows a running [`BillingCache`] and reschedules a
//! roster-wide generation run on its [`DebouncedTrigger`] whenever students,
//! subjects, attendance or invoices change. A burst of marks therefore ends in
//! a single run once the quiet period passes.
//!
//! Changes that leave the generation inputs as the last run left them are
//! ignored. That covers the run's own invoice writes and payment-only
//! changes.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::attendance::AttendanceRecord;
use crate::cache::{BillingCache, BillingSnapshot};
use crate::generator::{GenerationReport, InvoiceGenerator};
use crate::period::PeriodKey;
use crate::roster::{Student, Subject};
use crate::scheduler::DebouncedTrigger;

/// The part of a snapshot that decides which invoices are due
#[derive(Debug, Clone, PartialEq, Default)]
struct GenerationInputs {
    students: Vec<Student>,
    subjects: Vec<Subject>,
    attendance: Vec<AttendanceRecord>,
    invoiced: BTreeSet<PeriodKey>,
}

impl GenerationInputs {
    fn of(snapshot: &BillingSnapshot) -> Self {
        Self {
            students: snapshot.students.clone(),
            subjects: snapshot.subjects.clone(),
            attendance: snapshot.attendance.clone(),
            invoiced: snapshot.invoices.iter().map(|i| i.period_key.clone()).collect(),
        }
    }

    /// The inputs as they stand once `report`'s invoices are stored
    fn settled_by(mut self, report: &GenerationReport) -> Self {
        self.invoiced
            .extend(report.created.iter().map(|i| i.period_key.clone()));
        self
    }
}

type Settled = Arc<Mutex<Option<GenerationInputs>>>;

fn lock(settled: &Settled) -> MutexGuard<'_, Option<GenerationInputs>> {
    settled.lock().unwrap_or_else(|e| e.into_inner())
}

/// Background loop turning cache changes into debounced generation runs
///
/// The loop ends when the cache is stopped; a run still waiting out its quiet
/// period is cancelled with it.
pub struct AutoGeneration {
    handle: JoinHandle<()>,
    reports: mpsc::UnboundedReceiver<GenerationReport>,
}

impl AutoGeneration {
    /// Starts following `cache`, with one run scheduled for its current contents
    ///
    /// Must be called from within a tokio runtime, after the cache is started.
    pub fn spawn(
        cache: Arc<BillingCache>,
        generator: InvoiceGenerator,
        trigger: DebouncedTrigger,
    ) -> Self {
        let mut changes = cache.changes();
        let (sender, reports) = mpsc::unbounded_channel();
        let settled: Settled = Arc::new(Mutex::new(None));

        let schedule = {
            let cache = cache.clone();
            let settled = settled.clone();
            move |trigger: &DebouncedTrigger| {
                let (cache, generator, settled, sender) =
                    (cache.clone(), generator.clone(), settled.clone(), sender.clone());
                trigger.schedule(move || async move {
                    let snapshot = cache.snapshot();
                    let report = generator.generate_for_roster(&snapshot).await;
                    *lock(&settled) = Some(GenerationInputs::of(&snapshot).settled_by(&report));
                    info!(created = report.created_count(), "Automatic generation finished");
                    // The receiver may already be gone during shutdown
                    let _ = sender.send(report);
                });
            }
        };

        schedule(&trigger);
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                if !cache.is_running() {
                    break;
                }
                let current = GenerationInputs::of(&cache.snapshot());
                if lock(&settled).as_ref() == Some(&current) {
                    debug!("Change leaves generation inputs unchanged");
                    continue;
                }
                schedule(&trigger);
            }
            trigger.cancel();
            debug!("Automatic generation stopped");
        });

        Self { handle, reports }
    }

    /// Waits for the next finished run
    ///
    /// Returns `None` once the loop has ended and every report was taken.
    pub async fn next_report(&mut self) -> Option<GenerationReport> {
        self.reports.recv().await
    }

    /// Takes a finished run's report without waiting
    pub fn try_next_report(&mut self) -> Option<GenerationReport> {
        self.reports.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the loop to end; stop the cache first
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Automatic generation task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{CollectionPort, Money};
    use std::time::Duration;
    use tokio::time::sleep;

    use crate::payment::Payment;
    use crate::ports::InMemoryBackend;

    fn generator_for(backend: &InMemoryBackend) -> InvoiceGenerator {
        InvoiceGenerator::new(backend.invoices.clone(), 7)
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_run_after_quiet_period() {
        let backend = InMemoryBackend::new();
        let cache = Arc::new(BillingCache::new());
        cache.start(&backend.store());

        let mut auto = AutoGeneration::spawn(
            cache.clone(),
            generator_for(&backend),
            DebouncedTrigger::new(Duration::from_millis(2000)),
        );

        sleep(Duration::from_millis(1999)).await;
        assert!(auto.try_next_report().is_none());

        let report = auto.next_report().await.unwrap();
        assert_eq!(report.created_count(), 0);

        cache.stop();
        auto.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_only_change_does_not_rerun() {
        let backend = InMemoryBackend::new();
        let store = backend.store();
        let cache = Arc::new(BillingCache::new());
        cache.start(&store);
        let mut auto = AutoGeneration::spawn(
            cache.clone(),
            generator_for(&backend),
            DebouncedTrigger::new(Duration::from_millis(2000)),
        );
        auto.next_report().await.unwrap();

        let student = Student::new("Ama", "071", "", vec![]);
        store
            .payments
            .add(Payment::for_current_period(
                student.id,
                Money::from_major(500),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                "Cash",
            ))
            .await
            .unwrap();

        sleep(Duration::from_millis(10_000)).await;
        assert!(auto.try_next_report().is_none());

        cache.stop();
        auto.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_cache_ends_loop_and_cancels_waiting_run() {
        let backend = InMemoryBackend::new();
        let cache = Arc::new(BillingCache::new());
        cache.start(&backend.store());
        let mut auto = AutoGeneration::spawn(
            cache.clone(),
            generator_for(&backend),
            DebouncedTrigger::new(Duration::from_millis(2000)),
        );

        cache.stop();
        sleep(Duration::from_millis(5000)).await;

        assert!(auto.is_finished());
        assert!(auto.next_report().await.is_none());
        auto.join().await;
    }
}
