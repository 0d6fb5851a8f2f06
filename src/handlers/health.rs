use axum::{extract::State, Json};

use crate::handlers::AppState;

/// GET /health: liveness plus a summary of what the service loaded.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.model.name(),
        "observations": state.history.len(),
        "horizon": state.horizon,
    }))
}
