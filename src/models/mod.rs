//! Fraud model scoring components

pub mod linear;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use linear::{LinearModelArtifact, LinearScorer};
pub use loader::ModelLoader;
#[cfg(feature = "onnx")]
pub use onnx::OnnxScorer;

use crate::feature_extractor::FeatureRecord;
use anyhow::Result;

/// A pre-trained fraud classifier, treated as a black box.
///
/// Implementations are loaded once at start-up and shared read-only across
/// requests, so they must be `Send + Sync`.
pub trait Scorer: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Predicted label: 1 = fraud, 0 = not fraud
    fn classify(&self, record: &FeatureRecord) -> Result<u8>;

    /// Probability of the fraud class, in [0, 1]
    fn score_probability(&self, record: &FeatureRecord) -> Result<f64>;
}
