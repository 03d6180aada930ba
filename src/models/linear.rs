//! Logistic-regression scorer backed by a JSON model artifact

use crate::feature_extractor::{FeatureExtractor, FeatureRecord};
use crate::models::Scorer;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Exported coefficients of a standard-scaled logistic regression pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModelArtifact {
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Encoded feature names, in coefficient order
    pub feature_names: Vec<String>,
    /// Scaler means; empty means no centering
    #[serde(default)]
    pub means: Vec<f64>,
    /// Scaler standard deviations; empty means no scaling
    #[serde(default)]
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Decision threshold on the fraud probability
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_model_name() -> String {
    "logistic_regression".to_string()
}

fn default_threshold() -> f64 {
    0.5
}

/// Scores transactions with a linear model over the encoded feature vector
pub struct LinearScorer {
    artifact: LinearModelArtifact,
    extractor: FeatureExtractor,
}

impl LinearScorer {
    /// Build a scorer, checking the artifact against the feature schema
    pub fn from_artifact(artifact: LinearModelArtifact) -> Result<Self> {
        let extractor = FeatureExtractor::new();
        let expected = extractor.feature_names();
        let n = expected.len();

        if artifact.feature_names != expected {
            bail!(
                "model features {:?} do not match expected schema {:?}",
                artifact.feature_names,
                expected
            );
        }
        if artifact.coefficients.len() != n {
            bail!(
                "expected {} coefficients, found {}",
                n,
                artifact.coefficients.len()
            );
        }
        if !artifact.means.is_empty() && artifact.means.len() != n {
            bail!("expected {} scaler means, found {}", n, artifact.means.len());
        }
        if !artifact.scales.is_empty() && artifact.scales.len() != n {
            bail!(
                "expected {} scaler scales, found {}",
                n,
                artifact.scales.len()
            );
        }
        if artifact.scales.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            bail!("scaler scales must be finite and non-zero");
        }
        if !(0.0..=1.0).contains(&artifact.threshold) {
            bail!("threshold {} outside [0, 1]", artifact.threshold);
        }

        Ok(Self {
            artifact,
            extractor,
        })
    }

    /// Load a model artifact from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let artifact: LinearModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model artifact {}", path.display()))?;

        let scorer = Self::from_artifact(artifact)
            .with_context(|| format!("Invalid model artifact {}", path.display()))?;

        info!(
            model = %scorer.artifact.name,
            path = %path.display(),
            threshold = scorer.artifact.threshold,
            "Linear model loaded"
        );

        Ok(scorer)
    }

    pub fn threshold(&self) -> f64 {
        self.artifact.threshold
    }

    fn decision_function(&self, record: &FeatureRecord) -> f64 {
        let features = self.extractor.extract_f64(record);

        features
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let mean = self.artifact.means.get(i).copied().unwrap_or(0.0);
                let scale = self.artifact.scales.get(i).copied().unwrap_or(1.0);
                self.artifact.coefficients[i] * (x - mean) / scale
            })
            .sum::<f64>()
            + self.artifact.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Scorer for LinearScorer {
    fn name(&self) -> &str {
        &self.artifact.name
    }

    fn classify(&self, record: &FeatureRecord) -> Result<u8> {
        let probability = self.score_probability(record)?;
        Ok(u8::from(probability >= self.artifact.threshold))
    }

    fn score_probability(&self, record: &FeatureRecord) -> Result<f64> {
        let probability = sigmoid(self.decision_function(record));
        if probability.is_nan() {
            bail!("model produced NaN probability");
        }
        Ok(probability)
    }
}
