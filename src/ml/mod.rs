pub mod dataset;
pub mod engine;
pub mod features;
pub mod model;

pub use engine::{ForecastEngine, ForecastError};
pub use model::{load_model, load_model_str, ModelError, Predictor};
