//! Scoring endpoint response bodies

use serde::{Deserialize, Serialize};

/// Successful scoring response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 1 = fraud, 0 = not fraud
    pub prediction: u8,
    /// Class-1 probability rounded to 2 decimal places
    pub fraud_score: f64,
}

impl PredictionResponse {
    pub fn is_fraud(&self) -> bool {
        self.prediction == 1
    }

    /// Score as a percentage for display (e.g. `87.0`)
    pub fn score_percent(&self) -> f64 {
        (self.fraud_score * 100.0 * 100.0).round() / 100.0
    }
}

/// Uniform failure body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
