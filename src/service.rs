//! Scoring request lifecycle: validate, score, stamp, persist, respond.

use crate::error::ServiceError;
use crate::feature_extractor::{FeatureRecord, RECORD_COLUMNS};
use crate::metrics::ScoringMetrics;
use crate::models::Scorer;
use crate::store::TransactionStore;
use crate::types::prediction::PredictionResponse;
use crate::types::transaction::{NewTransaction, TransactionInput};
use anyhow::anyhow;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Round a probability to 2 decimal places.
///
/// Rounds the exact binary value, ties to even, so `0.015` (stored just
/// below 0.015) gives `0.01` and `0.125` gives `0.12`.
pub fn round_score(probability: f64) -> f64 {
    let scaled = probability * 100.0;
    // Exact error of the multiplication above
    let residual = probability.mul_add(100.0, -scaled);
    let floor = scaled.floor();
    let frac = scaled - floor;

    let hundredths = if frac > 0.5 || (frac == 0.5 && residual > 0.0) {
        floor + 1.0
    } else if frac < 0.5 || residual < 0.0 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };

    hundredths / 100.0
}

/// Stateless scoring handler sharing the loaded model and the store
#[derive(Clone)]
pub struct ScoringService {
    scorer: Arc<dyn Scorer>,
    store: TransactionStore,
    metrics: Arc<ScoringMetrics>,
}

impl ScoringService {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        store: TransactionStore,
        metrics: Arc<ScoringMetrics>,
    ) -> Self {
        Self {
            scorer,
            store,
            metrics,
        }
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<ScoringMetrics> {
        &self.metrics
    }

    /// Score a raw JSON request body
    pub fn score_json(&self, body: &[u8]) -> Result<PredictionResponse, ServiceError> {
        let input: TransactionInput = match serde_json::from_slice(body) {
            Ok(input) => input,
            Err(e) => {
                let err = ServiceError::Validation(format!(
                    "{} (expected exactly: {})",
                    e,
                    RECORD_COLUMNS.join(", ")
                ));
                self.metrics.record_failure(err.kind());
                warn!(kind = err.kind(), error = %err, "Rejected scoring request");
                return Err(err);
            }
        };

        self.score(&input)
    }

    /// Score a validated request and persist the outcome.
    ///
    /// Exactly one record is written on success and none on failure.
    pub fn score(&self, input: &TransactionInput) -> Result<PredictionResponse, ServiceError> {
        let start_time = Instant::now();

        let outcome = self.evaluate(input).and_then(|(prediction, fraud_score)| {
            let record = NewTransaction::from_scored(input, Utc::now(), prediction, fraud_score);
            let id = self.store.insert(&record)?;
            Ok((id, prediction, fraud_score))
        });

        match outcome {
            Ok((id, prediction, fraud_score)) => {
                let processing_time = start_time.elapsed();
                self.metrics
                    .record_prediction(processing_time, fraud_score, prediction == 1);

                if prediction == 1 {
                    info!(
                        transaction_id = id,
                        transaction_type = %input.transaction_type,
                        fraud_score = fraud_score,
                        processing_time_us = processing_time.as_micros(),
                        "Transaction flagged as fraud"
                    );
                } else {
                    debug!(
                        transaction_id = id,
                        fraud_score = fraud_score,
                        processing_time_us = processing_time.as_micros(),
                        "Transaction scored"
                    );
                }

                Ok(PredictionResponse {
                    prediction,
                    fraud_score,
                })
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(kind = e.kind(), error = %e, "Scoring request failed");
                Err(e)
            }
        }
    }

    /// Run the scorer and check its output is usable
    fn evaluate(&self, input: &TransactionInput) -> Result<(u8, f64), ServiceError> {
        let record = FeatureRecord::from(input);

        let label = self
            .scorer
            .classify(&record)
            .map_err(ServiceError::Scoring)?;
        let probability = self
            .scorer
            .score_probability(&record)
            .map_err(ServiceError::Scoring)?;

        if label > 1 {
            return Err(ServiceError::Scoring(anyhow!(
                "model {} returned label {}, expected 0 or 1",
                self.scorer.name(),
                label
            )));
        }
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ServiceError::Scoring(anyhow!(
                "model {} returned probability {}, expected a value in [0, 1]",
                self.scorer.name(),
                probability
            )));
        }

        Ok((label, round_score(probability)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionType;
    use anyhow::Result;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Scorer returning a fixed probability with a 0.5 threshold
    struct FixedScorer(f64);

    impl Scorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classify(&self, record: &FeatureRecord) -> Result<u8> {
            Ok(u8::from(self.score_probability(record)? >= 0.5))
        }

        fn score_probability(&self, _record: &FeatureRecord) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn name(&self) -> &str {
            "failing"
        }

        fn classify(&self, _record: &FeatureRecord) -> Result<u8> {
            Err(anyhow!("model session unavailable"))
        }

        fn score_probability(&self, _record: &FeatureRecord) -> Result<f64> {
            Err(anyhow!("model session unavailable"))
        }
    }

    fn service(scorer: Arc<dyn Scorer>) -> (TempDir, ScoringService) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            TransactionStore::open(dir.path().join("history.db"), Duration::from_secs(1)).unwrap();
        let service = ScoringService::new(scorer, store, Arc::new(ScoringMetrics::new()));
        (dir, service)
    }

    fn transfer() -> TransactionInput {
        TransactionInput {
            transaction_type: TransactionType::Transfer,
            amount: 5000.0,
            old_balance_org: 10000.0,
            new_balance_orig: 5000.0,
            old_balance_dest: 0.0,
            new_balance_dest: 5000.0,
        }
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.8765), 0.88);
        assert_eq!(round_score(0.004), 0.0);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(0.5), 0.5);
    }

    #[test]
    fn test_round_score_ties_follow_exact_value() {
        // Exact ties go to the even neighbour
        assert_eq!(round_score(0.125), 0.12);
        assert_eq!(round_score(0.625), 0.62);
        assert_eq!(round_score(0.375), 0.38);
        // Stored slightly below the written decimal
        assert_eq!(round_score(0.015), 0.01);
        assert_eq!(round_score(0.045), 0.04);
        // Stored slightly above the written decimal
        assert_eq!(round_score(0.035), 0.04);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn test_score_persists_transfer() {
        let (_dir, service) = service(Arc::new(FixedScorer(0.8765)));

        let response = service.score(&transfer()).unwrap();
        assert_eq!(response.prediction, 1);
        assert_eq!(response.fraud_score, 0.88);

        let records = service.store().list_all().unwrap();
        assert_eq!(records.len(), 1);
        let stored = &records[0];
        assert_eq!(stored.transaction_type, "transfer");
        assert_eq!(stored.amount, 5000.0);
        assert_eq!(stored.old_balance_sender, 10000.0);
        assert_eq!(stored.new_balance_sender, 5000.0);
        assert_eq!(stored.old_balance_receiver, 0.0);
        assert_eq!(stored.new_balance_receiver, 5000.0);
        assert_eq!(stored.is_fraud, response.prediction);
        assert_eq!(stored.fraud_score, response.fraud_score);
    }

    #[test]
    fn test_score_json_accepts_request_shape() {
        let (_dir, service) = service(Arc::new(FixedScorer(0.12)));
        let body = br#"{"type":"PAYMENT","amount":1000.0,"oldbalanceOrg":10000.0,
            "newbalanceOrig":9000.0,"oldbalanceDest":0.0,"newbalanceDest":0.0}"#;

        let response = service.score_json(body).unwrap();
        assert_eq!(response.prediction, 0);
        assert_eq!(response.fraud_score, 0.12);
        assert_eq!(service.store().count().unwrap(), 1);
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let (_dir, service) = service(Arc::new(FixedScorer(0.2)));
        let body = br#"{"type":"PAYMENT","amount":1000.0}"#;

        let err = service.score_json(body).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("oldbalanceOrg"));
        assert_eq!(service.store().count().unwrap(), 0);
        assert_eq!(service.metrics().snapshot().requests_failed, 1);
    }

    #[test]
    fn test_malformed_json_is_validation_failure() {
        let (_dir, service) = service(Arc::new(FixedScorer(0.2)));
        let err = service.score_json(b"not json").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_scorer_failure_writes_nothing() {
        let (_dir, service) = service(Arc::new(FailingScorer));

        let err = service.score(&transfer()).unwrap_err();
        assert_eq!(err.kind(), "scoring");
        assert!(err.to_string().contains("model session unavailable"));
        assert_eq!(service.store().count().unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        for bad in [1.5, -0.1, f64::NAN] {
            let (_dir, service) = service(Arc::new(FixedScorer(bad)));
            let err = service.score(&transfer()).unwrap_err();
            assert_eq!(err.kind(), "scoring");
            assert_eq!(service.store().count().unwrap(), 0);
        }
    }

    #[test]
    fn test_persistence_failure_is_reported() {
        let (dir, service) = service(Arc::new(FixedScorer(0.3)));
        // Replace the database file with a directory so the next open fails
        let db = dir.path().join("history.db");
        std::fs::remove_file(&db).unwrap();
        std::fs::create_dir(&db).unwrap();

        let err = service.score(&transfer()).unwrap_err();
        assert_eq!(err.kind(), "persistence");
    }

    #[test]
    fn test_each_success_adds_one_record() {
        let (_dir, service) = service(Arc::new(FixedScorer(0.61)));
        for expected in 1..=3 {
            service.score(&transfer()).unwrap();
            assert_eq!(service.store().count().unwrap(), expected);
        }
        assert_eq!(service.metrics().snapshot().fraud_flagged, 3);
    }
}
