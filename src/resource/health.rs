use axum::{extract::State, http::StatusCode};
use tracing::{error, info};

use super::AppState;

/// `GET /health/db`: 200 while the backend answers, 503 otherwise
pub async fn health_db(State(backend): State<AppState>) -> StatusCode {
    if backend.health_check().await {
        info!("DB health check OK");
        StatusCode::OK
    } else {
        error!("DB health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    }
}
