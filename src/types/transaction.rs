//! Transaction data structures for fraud scoring

use chrono::{DateTime, Datelike, Month, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction types the scoring model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransactionType {
    Payment,
    Transfer,
    CashOut,
}

impl TransactionType {
    /// All variants in the model's one-hot column order
    pub const ALL: [TransactionType; 3] = [
        TransactionType::CashOut,
        TransactionType::Payment,
        TransactionType::Transfer,
    ];

    /// Canonical label as the model expects it (e.g. `CASH_OUT`)
    pub fn as_label(&self) -> &'static str {
        match self {
            TransactionType::Payment => "PAYMENT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::CashOut => "CASH_OUT",
        }
    }

    /// Normalized form used for storage and comparison
    pub fn normalized(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Transfer => "transfer",
            TransactionType::CashOut => "cash_out",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payment" => Ok(TransactionType::Payment),
            "transfer" => Ok(TransactionType::Transfer),
            "cash_out" => Ok(TransactionType::CashOut),
            other => Err(format!(
                "unknown transaction type '{}', expected one of PAYMENT, TRANSFER, CASH_OUT",
                other
            )),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.as_label().to_string()
    }
}

/// Raw scoring request body.
///
/// Field names follow the model's training columns. Unknown fields are
/// rejected so the record always has the scorer's exact shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub amount: f64,

    /// Sender balance before the transaction
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_org: f64,

    /// Sender balance after the transaction
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,

    /// Receiver balance before the transaction
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,

    /// Receiver balance after the transaction
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
}

/// A scored transaction ready to be written; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Lowercase transaction type
    pub transaction_type: String,
    pub amount: f64,
    pub old_balance_sender: f64,
    pub new_balance_sender: f64,
    pub old_balance_receiver: f64,
    pub new_balance_receiver: f64,
    pub timestamp: DateTime<Utc>,
    pub is_fraud: u8,
    pub fraud_score: f64,
}

impl NewTransaction {
    /// Build the persisted shape from a scoring request and the scorer's verdict
    pub fn from_scored(
        input: &TransactionInput,
        timestamp: DateTime<Utc>,
        is_fraud: u8,
        fraud_score: f64,
    ) -> Self {
        Self {
            transaction_type: input.transaction_type.normalized().to_string(),
            amount: input.amount,
            old_balance_sender: input.old_balance_org,
            new_balance_sender: input.new_balance_orig,
            old_balance_receiver: input.old_balance_dest,
            new_balance_receiver: input.new_balance_dest,
            timestamp,
            is_fraud,
            fraud_score,
        }
    }
}

/// One persisted row of the `Transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: i64,
    pub transaction_type: String,
    pub amount: f64,
    pub old_balance_sender: f64,
    pub new_balance_sender: f64,
    pub old_balance_receiver: f64,
    pub new_balance_receiver: f64,
    pub timestamp: DateTime<Utc>,
    pub is_fraud: u8,
    pub fraud_score: f64,
}

impl TransactionRecord {
    /// Calendar year of the stored timestamp
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Calendar month of the stored timestamp
    pub fn month(&self) -> Month {
        // month() is always 1..=12
        Month::try_from(self.timestamp.month() as u8).unwrap_or(Month::January)
    }

    pub fn is_fraud(&self) -> bool {
        self.is_fraud == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_input_deserialization() {
        let json = r#"{"type":"TRANSFER","amount":5000,"oldbalanceOrg":10000,
            "newbalanceOrig":5000,"oldbalanceDest":0,"newbalanceDest":5000}"#;
        let input: TransactionInput = serde_json::from_str(json).unwrap();

        assert_eq!(input.transaction_type, TransactionType::Transfer);
        assert_eq!(input.amount, 5000.0);
        assert_eq!(input.old_balance_org, 10000.0);
        assert_eq!(input.new_balance_dest, 5000.0);
    }

    #[test]
    fn test_input_type_is_case_insensitive() {
        let json = r#"{"type":"cash_out","amount":1,"oldbalanceOrg":1,
            "newbalanceOrig":0,"oldbalanceDest":0,"newbalanceDest":1}"#;
        let input: TransactionInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.transaction_type, TransactionType::CashOut);
    }

    #[test]
    fn test_input_rejects_extra_field() {
        let json = r#"{"type":"PAYMENT","amount":1,"oldbalanceOrg":1,"newbalanceOrig":0,
            "oldbalanceDest":0,"newbalanceDest":1,"step":1}"#;
        assert!(serde_json::from_str::<TransactionInput>(json).is_err());
    }

    #[test]
    fn test_input_rejects_missing_field() {
        let json = r#"{"type":"PAYMENT","amount":1,"oldbalanceOrg":1,"newbalanceOrig":0,
            "oldbalanceDest":0}"#;
        assert!(serde_json::from_str::<TransactionInput>(json).is_err());
    }

    #[test]
    fn test_input_rejects_unknown_type() {
        let json = r#"{"type":"DEBIT","amount":1,"oldbalanceOrg":1,"newbalanceOrig":0,
            "oldbalanceDest":0,"newbalanceDest":1}"#;
        let err = serde_json::from_str::<TransactionInput>(json).unwrap_err();
        assert!(err.to_string().contains("unknown transaction type"));
    }

    #[test]
    fn test_new_transaction_renames_balances() {
        let input = TransactionInput {
            transaction_type: TransactionType::CashOut,
            amount: 250.0,
            old_balance_org: 1000.0,
            new_balance_orig: 750.0,
            old_balance_dest: 10.0,
            new_balance_dest: 260.0,
        };
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let tx = NewTransaction::from_scored(&input, ts, 1, 0.87);

        assert_eq!(tx.transaction_type, "cash_out");
        assert_eq!(tx.old_balance_sender, 1000.0);
        assert_eq!(tx.new_balance_sender, 750.0);
        assert_eq!(tx.old_balance_receiver, 10.0);
        assert_eq!(tx.new_balance_receiver, 260.0);
        assert_eq!(tx.is_fraud, 1);
    }

    #[test]
    fn test_record_derived_calendar_fields() {
        let record = TransactionRecord {
            transaction_id: 1,
            transaction_type: "payment".to_string(),
            amount: 1.0,
            old_balance_sender: 0.0,
            new_balance_sender: 0.0,
            old_balance_receiver: 0.0,
            new_balance_receiver: 0.0,
            timestamp: Utc.with_ymd_and_hms(2023, 11, 30, 23, 59, 59).unwrap(),
            is_fraud: 0,
            fraud_score: 0.1,
        };

        assert_eq!(record.year(), 2023);
        assert_eq!(record.month(), Month::November);
        assert!(!record.is_fraud());
    }
}
