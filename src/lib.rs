//! Fraud Scoring Service Library
//!
//! Scores transactions with a pre-trained fraud model, keeps a history of
//! every scored transaction, and derives dashboard reports from it.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod reporting;
pub mod service;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::{ServiceError, StoreError};
pub use feature_extractor::{FeatureExtractor, FeatureRecord};
pub use http::{build_router, AppState};
pub use models::{ModelLoader, Scorer};
pub use service::ScoringService;
pub use store::TransactionStore;
pub use types::{PredictionResponse, TransactionInput, TransactionRecord, TransactionType};
