pub mod forecast;
pub mod series;

pub use forecast::{DayForecast, ForecastResponse};
pub use series::{FeatureRow, Observation, SeriesFrame};
