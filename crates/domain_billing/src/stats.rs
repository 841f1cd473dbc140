//! Dashboard and invoice summaries

use chrono::NaiveDate;
use serde::Serialize;

use core_kernel::Money;

use crate::cache::BillingSnapshot;
use crate::invoice::{Invoice, InvoiceStatus};

/// Headline figures for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_subjects: usize,
    /// Sum of every payment recorded
    pub total_collected: Money,
    /// Students who currently owe money
    pub pending_payments: usize,
}

impl DashboardStats {
    pub fn compute(snapshot: &BillingSnapshot) -> Self {
        Self {
            total_students: snapshot.students.len(),
            total_subjects: snapshot.subjects.len(),
            total_collected: snapshot.payments.iter().map(|p| p.amount).sum(),
            pending_payments: snapshot
                .students
                .iter()
                .filter(|s| snapshot.status_for(s).is_owing())
                .count(),
        }
    }
}

/// Invoice amounts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub count: usize,
    pub all: Money,
    pub pending: Money,
    pub partial: Money,
    pub paid: Money,
    /// Unpaid invoices past their due date
    pub overdue_count: usize,
    /// Balance still owed on the overdue invoices
    pub overdue: Money,
}

impl InvoiceTotals {
    /// Totals as of `today`, which decides what is overdue
    pub fn compute(invoices: &[Invoice], today: NaiveDate) -> Self {
        invoices.iter().fold(Self::default(), |mut totals, inv| {
            totals.count += 1;
            totals.all += inv.amount;
            match inv.status {
                InvoiceStatus::Pending => totals.pending += inv.amount,
                InvoiceStatus::Partial => totals.partial += inv.amount,
                InvoiceStatus::Paid => totals.paid += inv.amount,
            }
            if inv.is_overdue(today) {
                totals.overdue_count += 1;
                totals.overdue += inv.balance_due();
            }
            totals
        })
    }
}

/// Invoices with the given status, or all of them
pub fn filter_by_status(invoices: &[Invoice], status: Option<InvoiceStatus>) -> Vec<&Invoice> {
    invoices
        .iter()
        .filter(|inv| status.map_or(true, |s| inv.status == s))
        .collect()
}
