use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::ml::engine::ForecastError;
use crate::models::SeriesFrame;

/// A supported model feature. The set is closed: any other name a model
/// was trained on is rejected before the first prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Hour of day, 0-23.
    Hour,
    /// Day of week, Monday = 0 through Sunday = 6.
    Dow,
    /// 1.0 on Saturday and Sunday, else 0.0.
    IsWeekend,
    /// sin(2*pi*hour/24).
    SinH,
    /// cos(2*pi*hour/24).
    CosH,
    /// Target value one hour back.
    Lag1,
    /// Target value two hours back.
    Lag2,
    /// Target value 24 hours back.
    Lag24,
    /// Mean of the 24 most recent target values.
    Roll24,
}

impl Feature {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hour" => Some(Self::Hour),
            "dow" => Some(Self::Dow),
            "is_weekend" => Some(Self::IsWeekend),
            "sin_h" => Some(Self::SinH),
            "cos_h" => Some(Self::CosH),
            "lag1" => Some(Self::Lag1),
            "lag2" => Some(Self::Lag2),
            "lag24" => Some(Self::Lag24),
            "roll24" => Some(Self::Roll24),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Dow => "dow",
            Self::IsWeekend => "is_weekend",
            Self::SinH => "sin_h",
            Self::CosH => "cos_h",
            Self::Lag1 => "lag1",
            Self::Lag2 => "lag2",
            Self::Lag24 => "lag24",
            Self::Roll24 => "roll24",
        }
    }

    /// How many trailing observations the rule reads.
    pub fn lookback(&self) -> usize {
        match self {
            Self::Lag1 => 1,
            Self::Lag2 => 2,
            Self::Lag24 | Self::Roll24 => 24,
            _ => 0,
        }
    }

    /// Evaluate the rule for a step at `timestamp` against the current
    /// series tail.
    ///
    /// Every rule is a pure function of the timestamp and the series, so
    /// evaluation order never matters. In particular `IsWeekend` reads the
    /// weekday straight from the timestamp rather than from a previously
    /// computed `dow` entry. Returns `None` only when the series is
    /// shorter than the rule's lookback.
    pub fn evaluate(&self, timestamp: NaiveDateTime, series: &SeriesFrame) -> Option<f64> {
        let value = match self {
            Self::Hour => f64::from(timestamp.hour()),
            Self::Dow => f64::from(day_of_week(timestamp)),
            Self::IsWeekend => {
                if day_of_week(timestamp) >= 5 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::SinH => (2.0 * PI * f64::from(timestamp.hour()) / 24.0).sin(),
            Self::CosH => (2.0 * PI * f64::from(timestamp.hour()) / 24.0).cos(),
            Self::Lag1 => series.value_from_end(1)?,
            Self::Lag2 => series.value_from_end(2)?,
            Self::Lag24 => series.value_from_end(24)?,
            Self::Roll24 => series.tail_mean(24)?,
        };
        Some(value)
    }
}

/// Day of week with Monday = 0, matching the engineered training data.
fn day_of_week(timestamp: NaiveDateTime) -> u32 {
    timestamp.weekday().num_days_from_monday()
}

/// Resolve requested names against the closed feature set, failing on the
/// first unknown name.
pub fn resolve(names: &[String]) -> Result<Vec<Feature>, ForecastError> {
    names
        .iter()
        .map(|name| {
            Feature::parse(name).ok_or_else(|| ForecastError::UnsupportedFeature(name.clone()))
        })
        .collect()
}

/// Largest lookback any of `features` requires.
pub fn max_lookback(features: &[Feature]) -> usize {
    features.iter().map(Feature::lookback).max().unwrap_or(0)
}
