use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::db::ForecastRepo;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::ml::ForecastEngine;
use crate::models::ForecastResponse;

/// POST /forecast: run the autoregressive loop over the loaded history
/// and upsert each forecast day into the store.
pub async fn generate(State(state): State<AppState>) -> Result<Json<ForecastResponse>, AppError> {
    let days = ForecastEngine::new().run(
        state.model.as_ref(),
        &state.history,
        state.feature_names.as_slice(),
        state.horizon,
    )?;

    ForecastRepo::upsert_batch(&state.pool, &days).await?;
    info!(horizon = state.horizon, days = days.len(), "Forecast saved");

    Ok(Json(ForecastResponse {
        status: "success".into(),
        message: "Forecast saved".into(),
        data: days,
    }))
}

/// GET /forecast/:date: stored hourly values for an exact date key, or an
/// empty list when nothing is stored under it.
pub async fn get_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<f64>>, AppError> {
    let values = ForecastRepo::get_values(&state.pool, &date)
        .await?
        .unwrap_or_default();
    Ok(Json(values))
}
