//! The autoregressive forecast loop.
//!
//! Each step derives the model's features for the next hour and asks the
//! model for one prediction. The prediction is appended back onto the
//! working series so later lags and rolling means see it. A run either
//! completes every step or returns an error; there is no partial output.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::ml::features::{self, Feature};
use crate::ml::model::{ModelError, Predictor};
use crate::models::{DayForecast, FeatureRow, Observation, SeriesFrame};

#[derive(Debug, Error)]
pub enum ForecastError {
    /// A requested feature name is not in the supported set.
    #[error("unsupported feature '{0}'")]
    UnsupportedFeature(String),

    /// The history is shorter than the longest lookback the requested
    /// features need.
    #[error("insufficient history: need {required} hourly observations, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// The model failed while predicting a step.
    #[error("prediction failed at step {step}: {source}")]
    Prediction {
        step: usize,
        #[source]
        source: ModelError,
    },

    /// The model produced NaN or an infinity, which would poison every
    /// later lag and rolling feature.
    #[error("non-finite prediction at step {step}")]
    NonFinite { step: usize },

    /// The caller requested an abort before the step started.
    #[error("forecast aborted before step {0}")]
    Aborted(usize),
}

/// The forecasting engine. Stateless: every run works on its own copy of
/// the caller's history.
#[derive(Debug, Default)]
pub struct ForecastEngine;

impl ForecastEngine {
    pub fn new() -> Self {
        Self
    }

    /// Forecast `horizon` hourly steps past the end of `history` and
    /// bucket the rounded results per calendar day.
    ///
    /// `feature_names` is the model's ordered feature list; the vector
    /// handed to `model.predict` follows that order exactly. Predictions
    /// are fed back into the working series unrounded, so rounding only
    /// shapes the output, never the next step's inputs.
    pub fn run(
        &self,
        model: &dyn Predictor,
        history: &SeriesFrame,
        feature_names: &[String],
        horizon: usize,
    ) -> Result<Vec<DayForecast>, ForecastError> {
        self.run_with_abort(model, history, feature_names, horizon, || false)
    }

    /// Like [`ForecastEngine::run`], but checks `should_abort` before every
    /// step, so a caller enforcing a deadline can stop the loop cleanly at
    /// a step boundary.
    pub fn run_with_abort(
        &self,
        model: &dyn Predictor,
        history: &SeriesFrame,
        feature_names: &[String],
        horizon: usize,
        should_abort: impl Fn() -> bool,
    ) -> Result<Vec<DayForecast>, ForecastError> {
        let features = features::resolve(feature_names)?;

        if horizon == 0 {
            return Ok(Vec::new());
        }

        // The first step needs a last timestamp to extend, so one
        // observation is the floor even for purely calendar features.
        let required = features::max_lookback(&features).max(1);
        if history.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                available: history.len(),
            });
        }

        let mut state = history.clone();
        let mut predicted: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(horizon);

        for step in 0..horizon {
            if should_abort() {
                return Err(ForecastError::Aborted(step));
            }

            let next_timestamp = match state.last_timestamp() {
                Some(last) => last + Duration::hours(1),
                None => {
                    return Err(ForecastError::InsufficientHistory {
                        required,
                        available: 0,
                    })
                }
            };

            let (row, vector) = derive_row(&features, next_timestamp, &state, required)?;

            let value = model
                .predict(&vector)
                .map_err(|source| ForecastError::Prediction { step, source })?;
            if !value.is_finite() {
                return Err(ForecastError::NonFinite { step });
            }

            state.push(Observation::with_features(next_timestamp, value, row));
            predicted.push((next_timestamp, value));
        }

        Ok(group_into_days(&predicted))
    }
}

/// Build the named feature row and the model-ordered vector for one step.
/// A lookback underflow here would mean the series shrank below the
/// validated floor, which never happens mid-run.
fn derive_row(
    features: &[Feature],
    timestamp: NaiveDateTime,
    state: &SeriesFrame,
    required: usize,
) -> Result<(FeatureRow, Vec<f64>), ForecastError> {
    let mut row = FeatureRow::new();
    let mut vector = Vec::with_capacity(features.len());
    for feature in features {
        let value =
            feature
                .evaluate(timestamp, state)
                .ok_or(ForecastError::InsufficientHistory {
                    required,
                    available: state.len(),
                })?;
        row.insert(feature.name().to_string(), value);
        vector.push(value);
    }
    Ok((row, vector))
}

/// Partition chronological predictions into per-date buckets. The input
/// is already sorted, so a date change always starts a new bucket.
fn group_into_days(predicted: &[(NaiveDateTime, f64)]) -> Vec<DayForecast> {
    let mut days: Vec<DayForecast> = Vec::new();
    for (timestamp, value) in predicted {
        let date = timestamp.date();
        let rounded = round2(*value);
        match days.last_mut() {
            Some(day) if day.date == date => day.values.push(rounded),
            _ => days.push(DayForecast {
                date,
                values: vec![rounded],
            }),
        }
    }
    days
}

/// Round to two decimal places, half away from zero. At or above 2^52
/// every f64 is already integral and scaling by 100 can overflow, so
/// such magnitudes pass through unchanged.
fn round2(value: f64) -> f64 {
    const INTEGRAL_LIMIT: f64 = 4_503_599_627_370_496.0; // 2^52
    if value.abs() >= INTEGRAL_LIMIT {
        return value;
    }
    (value * 100.0).round() / 100.0
}
