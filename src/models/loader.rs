//! Builds the configured scorer at start-up

use crate::config::{ModelConfig, ScorerKind};
use crate::models::{LinearScorer, Scorer};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Loader for fraud model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the scorer described by the model configuration
    pub fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Scorer>> {
        info!(kind = ?config.kind, path = %config.path, "Loading fraud model");

        let scorer: Arc<dyn Scorer> = match config.kind {
            ScorerKind::Linear => Arc::new(LinearScorer::load(&config.path)?),
            ScorerKind::Onnx => self.load_onnx(config)?,
        };

        info!(model = %scorer.name(), "Fraud model ready");
        Ok(scorer)
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, config: &ModelConfig) -> Result<Arc<dyn Scorer>> {
        let scorer = crate::models::OnnxScorer::load(
            &config.path,
            config.threshold,
            self.onnx_threads,
        )?;
        Ok(Arc::new(scorer))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, _config: &ModelConfig) -> Result<Arc<dyn Scorer>> {
        anyhow::bail!("ONNX models require building with the `onnx` feature")
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
