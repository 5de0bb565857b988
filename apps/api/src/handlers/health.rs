use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::dto::HealthResponse;
use crate::state::AppState;

/// `GET /health`. 503 when the database does not answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.sales.health().await;
    let status = if report.database == "up" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
