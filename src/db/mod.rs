pub mod forecasts;

pub use forecasts::ForecastRepo;
