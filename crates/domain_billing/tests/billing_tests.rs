//! Comprehensive tests for domain_billing

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use proptest::prelude::*;

use core_kernel::{Money, StudentId, SubjectId};

use domain_billing::{
    allocate, AccountStatus, AutoGeneration, BillingCache, BillingConfig, BillingService,
    DebouncedTrigger, InMemoryBackend, InMemoryCollection, InvoiceGenerator, InvoiceStatus,
    MarkAction, PaymentRequest, PeriodGrouping, RecordingNotifier, StudentBalance, StudentPatch,
    PERIOD_SIZE,
};
use test_utils::{
    assert_allocation_conserves, assert_status_consistent, assert_unique_period_keys,
    attendance_strategy, positive_money_strategy, AttendanceBuilder, DateFixtures, MoneyFixtures,
    RosterFixtures, SnapshotBuilder, TestInvoiceBuilder,
};

fn service_over(backend: &InMemoryBackend) -> BillingService {
    BillingService::new(backend.store(), BillingConfig::default())
}

fn generator_over(backend: &InMemoryBackend) -> InvoiceGenerator {
    InvoiceGenerator::new(backend.invoices.clone(), 7)
}

// ============================================================================
// Period Grouper Tests
// ============================================================================

mod period_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_completed_periods_and_remainder(
            records in attendance_strategy(StudentId::new(), SubjectId::new(), 40)
        ) {
            let (student_id, subject_id) = match records.first() {
                Some(r) => (r.student_id, r.subject_id),
                None => return Ok(()),
            };
            let grouping = PeriodGrouping::for_pair(student_id, subject_id, &records);

            prop_assert_eq!(grouping.completed().count(), records.len() / PERIOD_SIZE);
            prop_assert_eq!(grouping.remainder_len(), records.len() % PERIOD_SIZE);

            let mut previous_end = None;
            for period in grouping.completed() {
                prop_assert_eq!(period.records().len(), PERIOD_SIZE);
                prop_assert!(period.start() <= period.end());
                if let Some(end) = previous_end {
                    prop_assert!(end < period.start());
                }
                previous_end = Some(period.end());
            }
        }
    }

    #[test]
    fn test_no_records_no_periods() {
        let grouping = PeriodGrouping::for_pair(StudentId::new(), SubjectId::new(), &[]);
        assert_eq!(grouping.completed().count(), 0);
        assert!(grouping.remainder().is_empty());
    }
}

// ============================================================================
// Invoice Generator Tests
// ============================================================================

mod generator_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_generation_is_idempotent(
            records in attendance_strategy(StudentId::new(), SubjectId::new(), 30)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let maths = RosterFixtures::maths();
                let student = RosterFixtures::student_in(&[&maths]);
                let records: Vec<_> = records
                    .into_iter()
                    .map(|mut r| {
                        r.student_id = student.id;
                        r.subject_id = maths.id;
                        r
                    })
                    .collect();

                let backend = InMemoryBackend::new();
                let generator = generator_over(&backend);
                let subjects = vec![maths];

                for _ in 0..3 {
                    let existing = backend.invoices.snapshot();
                    generator.generate(&student, &subjects, &records, &existing).await;
                }

                let invoices = backend.invoices.snapshot();
                assert_eq!(invoices.len(), records.len() / PERIOD_SIZE);
                assert_unique_period_keys(&invoices);
                assert!(invoices.iter().all(|i| i.amount == MoneyFixtures::standard_fee()));
            });
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_retried_next_run() {
        let backend = InMemoryBackend::new();
        let generator = generator_over(&backend);
        let snapshot = SnapshotBuilder::single_student(8).build();
        let student = &snapshot.students[0];

        backend.invoices.fail_next_writes(1);
        let report = generator
            .generate_with_report(student, &snapshot.subjects, &snapshot.attendance, &[])
            .await;
        assert_eq!(report.created_count(), 1);
        assert_eq!(report.failures.len(), 1);

        let existing = backend.invoices.snapshot();
        let retried = generator
            .generate(student, &snapshot.subjects, &snapshot.attendance, &existing)
            .await;
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].period_key, report.failures[0].period_key);
        assert_eq!(backend.invoices.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_duplicate() {
        let backend = InMemoryBackend::new();
        let snapshot = SnapshotBuilder::single_student(12).build();
        let student = &snapshot.students[0];
        let first = generator_over(&backend);
        let second = generator_over(&backend);

        // Both runs plan against the same stale view
        let (a, b) = tokio::join!(
            first.generate(student, &snapshot.subjects, &snapshot.attendance, &[]),
            second.generate(student, &snapshot.subjects, &snapshot.attendance, &[]),
        );

        assert_eq!(a.len() + b.len(), 3);
        let stored = backend.invoices.snapshot();
        assert_eq!(stored.len(), 3);
        assert_unique_period_keys(&stored);
    }

    #[tokio::test]
    async fn test_roster_generation_report() {
        let science = RosterFixtures::science();
        let other = RosterFixtures::student_in(&[&science]);
        let snapshot = SnapshotBuilder::single_student(9)
            .subject(science.clone())
            .attendance(AttendanceBuilder::for_pair(other.id, science.id).classes(4).build())
            .student(other)
            .build();

        let backend = InMemoryBackend::new();
        let report = generator_over(&backend).generate_for_roster(&snapshot).await;

        assert_eq!(report.created_count(), 3);
        assert!(report.is_clean());
        assert_eq!(report.skipped, 0);
    }
}

// ============================================================================
// Payment Allocation Tests
// ============================================================================

mod allocation_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_allocation_conserves_amount(amount in positive_money_strategy(), paid in 0i64..2000) {
            let maths = RosterFixtures::maths();
            let student = RosterFixtures::student_in(&[&maths]);
            let invoices = vec![
                TestInvoiceBuilder::new(&student, &maths).period(1).paid(Money::from_major(paid)).created_days_ago(9).build(),
                TestInvoiceBuilder::new(&student, &maths).period(2).created_days_ago(2).build(),
            ];
            let request = PaymentRequest::new(student.id, amount, DateFixtures::term_start());

            let allocation = allocate(&request, &invoices, Utc::now()).unwrap();
            assert_allocation_conserves(&allocation, amount);
        }
    }
}

// ============================================================================
// Service Tests
// ============================================================================

mod service_tests {
    use super::*;
    use core_kernel::CollectionPort;

    async fn enrolled(service: &BillingService) -> (StudentId, SubjectId) {
        let maths = service
            .add_subject("Mathematics", MoneyFixtures::standard_fee())
            .await
            .unwrap();
        let student = service
            .add_student("Kasun Perera", "077 123 4567", "Royal College", vec![maths])
            .await
            .unwrap();
        (student, maths)
    }

    #[tokio::test]
    async fn test_end_to_end_first_period() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let (student, maths) = enrolled(&service).await;
        let dates = DateFixtures::twice_weekly(5);

        for (i, &date) in dates.iter().take(4).enumerate() {
            service.mark_attendance(student, maths, date, i != 2).await.unwrap();
        }
        service.mark_attendance(student, maths, dates[4], true).await.unwrap();

        let report = service.generate_invoices().await.unwrap();
        assert_eq!(report.created_count(), 1);

        let invoice = &backend.invoices.snapshot()[0];
        assert_eq!(invoice.amount, Money::from_major(2000));
        assert_eq!(invoice.present_days, 3);
        assert_eq!(invoice.absent_days, 1);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.due_date, dates[3].checked_add_days(Days::new(7)).unwrap());

        let summary = service.student_summary(student).await.unwrap();
        assert_eq!(summary.balance.current_period.classes_held, 1);
        assert_eq!(summary.balance.current_period.balance, Money::from_major(500));
        assert_eq!(summary.balance.total_owed, Money::from_major(2500));
        assert_eq!(summary.status, AccountStatus::Pending);

        let again = service.generate_invoices().await.unwrap();
        assert_eq!(again.created_count(), 0);
        assert_eq!(again.skipped, 0);
    }

    #[tokio::test]
    async fn test_payment_settles_oldest_invoice_first() {
        let maths = RosterFixtures::maths();
        let student = RosterFixtures::student_in(&[&maths]);
        let older = TestInvoiceBuilder::new(&student, &maths)
            .period(1)
            .paid(Money::from_major(1900))
            .created_days_ago(10)
            .build();
        let newer = TestInvoiceBuilder::new(&student, &maths)
            .period(2)
            .paid(Money::from_major(1950))
            .created_days_ago(3)
            .build();

        let backend = InMemoryBackend {
            students: Arc::new(InMemoryCollection::with_documents(vec![student.clone()])),
            subjects: Arc::new(InMemoryCollection::with_documents(vec![maths])),
            invoices: Arc::new(InMemoryCollection::with_documents(vec![newer.clone(), older.clone()])),
            ..Default::default()
        };
        let service = service_over(&backend);

        let request = PaymentRequest::new(student.id, Money::from_major(120), DateFixtures::term_start());
        let allocation = service.record_payment(request).await.unwrap();
        assert_eq!(allocation.payments.len(), 2);

        let old = backend.invoices.get(older.id).await.unwrap();
        assert_eq!(old.status, InvoiceStatus::Paid);
        assert!(old.paid_at.is_some());
        let new = backend.invoices.get(newer.id).await.unwrap();
        assert_eq!(new.status, InvoiceStatus::Partial);
        assert_eq!(new.paid_amount, Money::from_major(1970));

        for invoice in backend.invoices.snapshot() {
            assert_status_consistent(&invoice);
        }
        let stored: Money = backend.payments.snapshot().iter().map(|p| p.amount).sum();
        assert_eq!(stored, Money::from_major(120));
    }

    #[tokio::test]
    async fn test_overpayment_funds_current_period() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let (student, maths) = enrolled(&service).await;
        for date in DateFixtures::twice_weekly(6) {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        service.generate_invoices().await.unwrap();

        let request = PaymentRequest::new(student, Money::from_major(2600), DateFixtures::term_start());
        service.record_payment(request).await.unwrap();

        let summary = service.student_summary(student).await.unwrap();
        assert_eq!(summary.balance.outstanding_invoices, Money::ZERO);
        assert_eq!(summary.balance.current_period.owed, Money::from_major(1000));
        assert_eq!(summary.balance.current_period.paid, Money::from_major(600));
        assert_eq!(summary.balance.total_owed, Money::from_major(400));
        assert_eq!(summary.status, AccountStatus::Partial);
        assert_eq!(service.suggested_payment(student).await.unwrap(), Money::from_major(400));
    }

    #[tokio::test]
    async fn test_settle_invoice_marks_paid() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let (student, maths) = enrolled(&service).await;
        for date in DateFixtures::twice_weekly(4) {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        let created = service.generate_for_student(student).await.unwrap();

        let payment_id = service
            .settle_invoice(created[0].id, DateFixtures::term_start(), None)
            .await
            .unwrap();

        let invoice = backend.invoices.get(created[0].id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.payment_id, Some(payment_id));
        assert_eq!(invoice.paid_amount, invoice.amount);

        let summary = service.student_summary(student).await.unwrap();
        assert_eq!(summary.status, AccountStatus::Paid);
        assert!(service
            .settle_invoice(created[0].id, DateFixtures::term_start(), None)
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_attendance_upsert_and_billed_guard() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let (student, maths) = enrolled(&service).await;
        let dates = DateFixtures::twice_weekly(6);

        let first = service.mark_attendance(student, maths, dates[0], true).await.unwrap();
        assert!(matches!(first, MarkAction::Insert(_)));
        let corrected = service.mark_attendance(student, maths, dates[0], false).await.unwrap();
        assert!(matches!(corrected, MarkAction::Update { present: false, .. }));
        assert_eq!(backend.attendance.len(), 1);

        for &date in &dates[1..4] {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        service.generate_invoices().await.unwrap();

        let err = service.mark_attendance(student, maths, dates[1], false).await.unwrap_err();
        assert!(err.is_validation());
        let backdated = dates[0].pred_opt().unwrap();
        assert!(service.mark_attendance(student, maths, backdated, true).await.is_err());
        assert!(service.mark_attendance(student, maths, dates[4], true).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_storage() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);

        assert!(service.add_subject("Art", Money::ZERO).await.unwrap_err().is_validation());
        assert!(service
            .add_student("Nimal", "0771111111", "", vec![])
            .await
            .unwrap_err()
            .is_validation());
        assert!(backend.subjects.is_empty());
        assert!(backend.students.is_empty());

        let (student, _) = enrolled(&service).await;
        let err = service
            .update_student(student, StudentPatch { phone: Some(" ".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_delete_student_removes_payments_only() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let (student, maths) = enrolled(&service).await;
        for date in DateFixtures::twice_weekly(4) {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        service.generate_invoices().await.unwrap();
        service
            .record_payment(PaymentRequest::new(student, Money::from_major(500), DateFixtures::term_start()))
            .await
            .unwrap();

        service.delete_student(student).await.unwrap();

        assert!(backend.students.is_empty());
        assert!(backend.payments.is_empty());
        assert_eq!(backend.invoices.len(), 1);
        assert_eq!(backend.attendance.len(), 4);
    }

    #[tokio::test]
    async fn test_reminder_and_dashboard() {
        let backend = InMemoryBackend::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let service = service_over(&backend).with_notifier(notifier.clone());
        let (student, maths) = enrolled(&service).await;
        for date in DateFixtures::twice_weekly(5) {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        service.generate_invoices().await.unwrap();

        let message = service.send_reminder(student).await.unwrap().unwrap();
        assert_eq!(message.recipient, "0771234567");
        assert!(message.body.contains("Rs. 2500"));
        assert_eq!(notifier.sent(), vec![message]);

        let stats = service.dashboard().await.unwrap();
        assert_eq!(stats.total_students, 1);
        assert_eq!(stats.pending_payments, 1);
        let totals = service.invoice_totals().await.unwrap();
        assert_eq!(totals.pending, Money::from_major(2000));
    }
}

// ============================================================================
// Cache and Trigger Tests
// ============================================================================

mod cache_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_marks_generates_once() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let cache = Arc::new(BillingCache::new());
        cache.start(&backend.store());
        let mut auto = AutoGeneration::spawn(
            cache.clone(),
            service.generator().clone(),
            DebouncedTrigger::new(service.config().debounce()),
        );

        let maths = service.add_subject("Mathematics", Money::from_major(2000)).await.unwrap();
        let student = service.add_student("Ama", "071", "", vec![maths]).await.unwrap();
        for date in DateFixtures::twice_weekly(4) {
            service.mark_attendance(student, maths, date, true).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert!(auto.try_next_report().is_none());
        assert_eq!(backend.invoices.len(), 0);

        let report = auto.next_report().await.unwrap();
        assert_eq!(report.created_count(), 1);
        assert_eq!(backend.invoices.len(), 1);

        // The run's own invoice write schedules nothing further
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(auto.try_next_report().is_none());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.invoices.len(), 1);
        let balance: StudentBalance = snapshot.balance_for(&snapshot.students[0]);
        assert_eq!(balance.total_owed, Money::from_major(2000));

        cache.stop();
        auto.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_after_run_triggers_next_period() {
        let backend = InMemoryBackend::new();
        let service = service_over(&backend);
        let cache = Arc::new(BillingCache::new());
        cache.start(&backend.store());
        let mut auto = AutoGeneration::spawn(
            cache.clone(),
            service.generator().clone(),
            DebouncedTrigger::new(service.config().debounce()),
        );

        let maths = service.add_subject("Mathematics", Money::from_major(2000)).await.unwrap();
        let student = service.add_student("Ama", "071", "", vec![maths]).await.unwrap();
        let dates = DateFixtures::twice_weekly(8);
        for &date in &dates[..4] {
            service.mark_attendance(student, maths, date, true).await.unwrap();
        }
        assert_eq!(auto.next_report().await.unwrap().created_count(), 1);

        for &date in &dates[4..] {
            service.mark_attendance(student, maths, date, false).await.unwrap();
        }
        assert_eq!(auto.next_report().await.unwrap().created_count(), 1);
        assert_eq!(backend.invoices.len(), 2);

        assert_unique_period_keys(&backend.invoices.snapshot());

        cache.stop();
        auto.join().await;
    }
}
