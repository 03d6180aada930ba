//! Feature shaping for fraud model inference.
//!
//! The scorer consumes a single-row record with a fixed column set. This
//! module builds that record from a request and encodes it into the numeric
//! vector numeric models are trained on.

use crate::types::transaction::{TransactionInput, TransactionType};

/// Column names of the raw record, in the order the model pipeline expects.
pub const RECORD_COLUMNS: [&str; 6] = [
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Single-row feature record handed to a [`Scorer`](crate::models::Scorer).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub old_balance_org: f64,
    pub new_balance_orig: f64,
    pub old_balance_dest: f64,
    pub new_balance_dest: f64,
}

impl From<&TransactionInput> for FeatureRecord {
    fn from(input: &TransactionInput) -> Self {
        Self {
            transaction_type: input.transaction_type,
            amount: input.amount,
            old_balance_org: input.old_balance_org,
            new_balance_orig: input.new_balance_orig,
            old_balance_dest: input.old_balance_dest,
            new_balance_dest: input.new_balance_dest,
        }
    }
}

/// Encodes feature records into model input vectors.
///
/// The transaction type is one-hot encoded (alphabetical category order, as
/// the training pipeline's encoder emits it) followed by the numeric columns
/// passed through unchanged.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Encode a record as `[type_CASH_OUT, type_PAYMENT, type_TRANSFER,
    /// amount, oldbalanceOrg, newbalanceOrig, oldbalanceDest, newbalanceDest]`.
    pub fn extract(&self, record: &FeatureRecord) -> Vec<f32> {
        let mut features = Vec::with_capacity(self.feature_count());

        for category in TransactionType::ALL {
            features.push(if record.transaction_type == category {
                1.0
            } else {
                0.0
            });
        }

        features.push(record.amount as f32);
        features.push(record.old_balance_org as f32);
        features.push(record.new_balance_orig as f32);
        features.push(record.old_balance_dest as f32);
        features.push(record.new_balance_dest as f32);

        features
    }

    /// Same encoding as [`extract`](Self::extract) at full precision
    pub fn extract_f64(&self, record: &FeatureRecord) -> Vec<f64> {
        let mut features: Vec<f64> = TransactionType::ALL
            .iter()
            .map(|&category| {
                if record.transaction_type == category {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        features.extend_from_slice(&[
            record.amount,
            record.old_balance_org,
            record.new_balance_orig,
            record.old_balance_dest,
            record.new_balance_dest,
        ]);

        features
    }

    pub fn feature_count(&self) -> usize {
        8
    }

    /// Encoded feature names, matching the training pipeline's output order
    pub fn feature_names(&self) -> Vec<&'static str> {
        vec![
            "type_CASH_OUT",
            "type_PAYMENT",
            "type_TRANSFER",
            "amount",
            "oldbalanceOrg",
            "newbalanceOrig",
            "oldbalanceDest",
            "newbalanceDest",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> FeatureRecord {
        FeatureRecord {
            transaction_type: TransactionType::Transfer,
            amount: 5000.0,
            old_balance_org: 10000.0,
            new_balance_orig: 5000.0,
            old_balance_dest: 0.0,
            new_balance_dest: 5000.0,
        }
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&transfer());

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(&features[..3], &[0.0, 0.0, 1.0]); // one-hot TRANSFER
        assert_eq!(features[3], 5000.0); // amount
        assert_eq!(features[7], 5000.0); // newbalanceDest
    }

    #[test]
    fn test_one_hot_matches_type() {
        let extractor = FeatureExtractor::new();
        let mut record = transfer();

        record.transaction_type = TransactionType::CashOut;
        assert_eq!(&extractor.extract_f64(&record)[..3], &[1.0, 0.0, 0.0]);

        record.transaction_type = TransactionType::Payment;
        assert_eq!(&extractor.extract_f64(&record)[..3], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 8);
        assert_eq!(extractor.feature_names().len(), 8);
        assert_eq!(RECORD_COLUMNS.len(), 6);
    }
}
