//! Run report

use chrono::NaiveDate;
use serde::Serialize;

use core_kernel::{Money, StudentId};
use domain_billing::{
    summarize, AccountStatus, BillingSnapshot, DashboardStats, GenerationReport, InvoiceTotals,
    StudentBalance,
};

/// Counts from the generation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub created: usize,
    pub skipped: usize,
    /// Period keys whose invoice could not be stored
    pub failed: Vec<String>,
}

/// One student's line in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLine {
    pub student_id: StudentId,
    pub name: String,
    pub status: AccountStatus,
    pub balance: StudentBalance,
    pub suggested_payment: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generation: GenerationSummary,
    pub dashboard: DashboardStats,
    pub invoices: InvoiceTotals,
    pub students: Vec<StudentLine>,
}

impl RunReport {
    /// Builds the report for `snapshot`; `today` decides which invoices are overdue
    pub fn build(generation: &GenerationReport, snapshot: &BillingSnapshot, today: NaiveDate) -> Self {
        let students = snapshot
            .students
            .iter()
            .filter_map(|s| summarize(snapshot, s.id).ok())
            .map(|summary| StudentLine {
                student_id: summary.student.id,
                name: summary.student.name,
                status: summary.status,
                suggested_payment: summary.balance.suggested_payment(),
                balance: summary.balance,
            })
            .collect();

        Self {
            generation: GenerationSummary {
                created: generation.created_count(),
                skipped: generation.skipped,
                failed: generation
                    .failures
                    .iter()
                    .map(|f| f.period_key.to_string())
                    .collect(),
            },
            dashboard: DashboardStats::compute(snapshot),
            invoices: InvoiceTotals::compute(&snapshot.invoices, today),
            students,
        }
    }
}
