//! Type definitions for the fraud scoring service

pub mod prediction;
pub mod report;
pub mod transaction;

pub use prediction::{ErrorResponse, PredictionResponse};
pub use report::{DashboardReport, MonthlyFraud, TypeCount};
pub use transaction::{NewTransaction, TransactionInput, TransactionRecord, TransactionType};
