use std::collections::BTreeMap;

use chrono::NaiveDateTime;

/// Feature values keyed by feature name.
pub type FeatureRow = BTreeMap<String, f64>;

/// One hourly observation: the target value plus the engineered feature
/// columns that came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub features: FeatureRow,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self {
            timestamp,
            value,
            features: FeatureRow::new(),
        }
    }

    pub fn with_features(timestamp: NaiveDateTime, value: f64, features: FeatureRow) -> Self {
        Self {
            timestamp,
            value,
            features,
        }
    }
}

/// A chronologically ordered hourly series.
///
/// Rows are kept in insertion order; the loader guarantees one-hour
/// spacing, and the forecast loop preserves it by always appending the
/// next hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFrame {
    observations: Vec<Observation>,
}

impl SeriesFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.observations.last().map(|o| o.timestamp)
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Target value `offset` rows back from the end (1 = most recent).
    /// `None` when the series holds fewer than `offset` rows.
    pub fn value_from_end(&self, offset: usize) -> Option<f64> {
        if offset == 0 || offset > self.observations.len() {
            return None;
        }
        self.observations
            .get(self.observations.len() - offset)
            .map(|o| o.value)
    }

    /// Mean of the target over the `window` most recent rows. `None` when
    /// the series holds fewer than `window` rows.
    pub fn tail_mean(&self, window: usize) -> Option<f64> {
        if window == 0 || window > self.observations.len() {
            return None;
        }
        let tail = &self.observations[self.observations.len() - window..];
        let sum: f64 = tail.iter().map(|o| o.value).sum();
        Some(sum / window as f64)
    }
}
