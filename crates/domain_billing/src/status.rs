//! Status Classifier
//!
//! Derives a student's display status from their balances. Nothing here is
//! stored; the status is recomputed from current data on every query.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::balance::StudentBalance;

/// Coarse payment state of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountStatus {
    /// Nothing invoiced and nothing owed for the current period
    NoInvoices,
    /// Nothing owed
    Paid,
    /// Something owed, some money already received
    Partial,
    /// Something owed, nothing received
    Pending,
}

impl AccountStatus {
    /// Classifies a balance
    ///
    /// Rules are checked in order:
    /// 1. nothing invoiced and no current-period balance: `NoInvoices`
    /// 2. nothing owed: `Paid`
    /// 3. any invoice payment or current-period payment: `Partial`
    /// 4. otherwise `Pending`
    pub fn classify(balance: &StudentBalance) -> Self {
        if balance.total_invoiced.is_zero() && balance.current_period.balance.is_zero() {
            AccountStatus::NoInvoices
        } else if balance.total_owed.is_zero() {
            AccountStatus::Paid
        } else if balance.total_paid_on_invoices.is_positive()
            || balance.current_period.paid.is_positive()
        {
            AccountStatus::Partial
        } else {
            AccountStatus::Pending
        }
    }

    /// Returns true if the student owes money
    pub fn is_owing(&self) -> bool {
        matches!(self, AccountStatus::Partial | AccountStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::NoInvoices => "no-invoices",
            AccountStatus::Paid => "paid",
            AccountStatus::Partial => "partial",
            AccountStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
