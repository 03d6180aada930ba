//! HTTP surface: scoring endpoint plus history and reporting routes.

use crate::error::{ServiceError, StoreError};
use crate::reporting;
use crate::service::ScoringService;
use crate::store::TransactionStore;
use crate::types::prediction::ErrorResponse;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Month;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, error};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: ScoringService,
}

impl AppState {
    pub fn new(service: ScoringService) -> Self {
        Self { service }
    }

    fn store(&self) -> TransactionStore {
        self.service.store().clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route(
            "/transactions",
            get(list_transactions_handler).delete(delete_all_handler),
        )
        .route("/transactions/delete", post(delete_selected_handler))
        .route("/reports/dashboard", get(dashboard_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

/// Year/month selection shared by the history routes
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    /// Month name (`March`) or number (`3`)
    pub month: Option<String>,
}

impl PeriodQuery {
    fn month(&self) -> Result<Option<Month>, String> {
        match self.month.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case("all") => Ok(None),
            Some(raw) => reporting::parse_month(raw)
                .map(Some)
                .ok_or_else(|| format!("invalid month '{}'", raw)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn store_failure(e: StoreError) -> Response {
    error!(error = %e, "History store request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Scoring failures of every kind become the same `RequestFailed` response:
/// HTTP 500 with the message in `{"error"}`.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        debug!(
            kind = self.kind(),
            reported_as = ServiceError::REQUEST_FAILED,
            "Returning scoring failure"
        );
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
    }
}

/// Run a blocking store operation off the async workers
async fn with_store<T, F>(store: TransactionStore, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&TransactionStore) -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

async fn predict_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || service.score_json(&body)).await {
        Ok(Ok(prediction)) => (StatusCode::OK, Json(prediction)).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(error = %e, "Scoring task did not complete");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("scoring task did not complete: {}", e),
            )
        }
    }
}

async fn list_transactions_handler(
    State(state): State<AppState>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let month = match query.month() {
        Ok(m) => m,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match with_store(state.store(), |s| s.list_all()).await {
        Ok(records) => {
            Json(reporting::filter_period(&records, query.year, month)).into_response()
        }
        Err(e) => store_failure(e),
    }
}

async fn delete_all_handler(State(state): State<AppState>) -> Response {
    match with_store(state.store(), |s| s.delete_all()).await {
        Ok(deleted) => Json(DeleteResponse { deleted }).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn delete_selected_handler(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let ids: BTreeSet<i64> = request.ids.into_iter().collect();

    match with_store(state.store(), move |s| s.delete_by_ids(&ids)).await {
        Ok(deleted) => Json(DeleteResponse { deleted }).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn dashboard_handler(
    State(state): State<AppState>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let month = match query.month() {
        Ok(m) => m,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match with_store(state.store(), |s| s.list_all()).await {
        Ok(records) => {
            Json(reporting::build_dashboard(&records, query.year, month)).into_response()
        }
        Err(e) => store_failure(e),
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    Json(state.service.metrics().snapshot()).into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_service_errors_share_one_response() {
        let failures = [
            ServiceError::Validation("missing field `amount`".into()),
            ServiceError::Scoring(anyhow::anyhow!("model session unavailable")),
            ServiceError::Persistence(StoreError::Task("cancelled".into())),
        ];

        for failure in failures {
            let message = failure.to_string();
            let response = failure.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, ErrorResponse::new(message));
        }
        assert_eq!(ServiceError::REQUEST_FAILED, "RequestFailed");
    }

    #[test]
    fn test_period_query_month_parsing() {
        let q = PeriodQuery {
            year: Some(2024),
            month: Some("march".to_string()),
        };
        assert_eq!(q.month().unwrap(), Some(Month::March));

        let all = PeriodQuery {
            year: None,
            month: Some("All".to_string()),
        };
        assert_eq!(all.month().unwrap(), None);

        let bad = PeriodQuery {
            year: None,
            month: Some("Brumaire".to_string()),
        };
        assert!(bad.month().is_err());

        assert_eq!(PeriodQuery::default().month().unwrap(), None);
    }
}
