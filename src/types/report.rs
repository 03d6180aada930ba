//! Read-time aggregate views over the transaction history

use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Number of stored transactions of one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub transaction_type: String,
    pub count: u64,
}

/// Totals for one calendar month of a year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFraud {
    /// Full English month name, e.g. `March`
    pub month: String,
    pub total: u64,
    pub fraud: u64,
}

/// Everything the dashboard renders for one year/month selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub total_transactions: u64,
    pub fraudulent_transactions: u64,
    pub by_type: Vec<TypeCount>,
    /// Years present in the history, newest first
    pub years: Vec<i32>,
    pub selected_year: Option<i32>,
    /// Months present in the selected year, calendar order
    pub months: Vec<String>,
    pub selected_month: Option<String>,
    pub monthly: Vec<MonthlyFraud>,
    /// History rows narrowed to the selected period, newest first
    pub records: Vec<TransactionRecord>,
}

impl DashboardReport {
    /// Report for an empty history
    pub fn empty() -> Self {
        Self {
            total_transactions: 0,
            fraudulent_transactions: 0,
            by_type: Vec::new(),
            years: Vec::new(),
            selected_year: None,
            months: Vec::new(),
            selected_month: None,
            monthly: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.total_transactions > 0
    }
}
