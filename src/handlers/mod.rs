pub mod forecasts;
pub mod health;

use std::sync::Arc;

use crate::ml::Predictor;
use crate::models::SeriesFrame;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub model: Arc<dyn Predictor>,
    pub history: Arc<SeriesFrame>,
    pub feature_names: Arc<Vec<String>>,
    pub horizon: usize,
}
