//! Engineered-history loading.
//!
//! The training pipeline exports an hourly CSV whose first column is the
//! timestamp index and whose `y` column is the target; every other column
//! is an engineered feature kept on the row as loaded. The forecast loop
//! relies on one-hour spacing, so gaps, duplicates, and disorder are
//! rejected here instead of surfacing as silent bad lags later.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::models::{FeatureRow, Observation, SeriesFrame};

/// Name of the target column in the engineered export.
pub const TARGET_COLUMN: &str = "y";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no 'y' column")]
    MissingTarget,
    #[error("row {row}: bad timestamp '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("row {row}: bad value '{value}' in column '{column}'")]
    Numeric {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row}: timestamp {found} does not follow {previous} by one hour")]
    Gap {
        row: usize,
        previous: NaiveDateTime,
        found: NaiveDateTime,
    },
    #[error("dataset is empty")]
    Empty,
}

/// Load the engineered history CSV into a [`SeriesFrame`].
pub fn load_history(path: &Path) -> Result<SeriesFrame, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_history(BufReader::new(file))
}

/// Parse engineered history from any CSV source.
pub fn read_history<R: Read>(reader: R) -> Result<SeriesFrame, DatasetError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let target_idx = headers
        .iter()
        .position(|h| h == TARGET_COLUMN)
        .ok_or(DatasetError::MissingTarget)?;
    if target_idx == 0 {
        // Column 0 is the timestamp index, never the target.
        return Err(DatasetError::MissingTarget);
    }

    let mut observations: Vec<Observation> = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        // 1-based file line, counting the header.
        let row = i + 2;

        let raw_ts = record.get(0).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DatasetError::Timestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        if let Some(previous) = observations.last().map(|o| o.timestamp) {
            if timestamp - previous != Duration::hours(1) {
                return Err(DatasetError::Gap {
                    row,
                    previous,
                    found: timestamp,
                });
            }
        }

        let mut target = None;
        let mut features = FeatureRow::new();
        for (idx, field) in record.iter().enumerate().skip(1) {
            let column = headers.get(idx).unwrap_or_default();
            let parsed: f64 = field.trim().parse().map_err(|_| DatasetError::Numeric {
                row,
                column: column.to_string(),
                value: field.to_string(),
            })?;
            if !parsed.is_finite() {
                return Err(DatasetError::Numeric {
                    row,
                    column: column.to_string(),
                    value: field.to_string(),
                });
            }
            if idx == target_idx {
                target = Some(parsed);
            } else {
                features.insert(column.to_string(), parsed);
            }
        }

        let value = target.ok_or(DatasetError::MissingTarget)?;
        observations.push(Observation::with_features(timestamp, value, features));
    }

    if observations.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(SeriesFrame::from_observations(observations))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use chrono::NaiveDate;

    fn parse(csv_text: &str) -> Result<SeriesFrame, DatasetError> {
        read_history(csv_text.as_bytes())
    }

    #[test]
    fn test_loads_target_and_feature_columns() {
        let series = parse(
            ",y,hour,lag1\n\
             2025-06-01 00:00:00,10.0,0,9.5\n\
             2025-06-01 01:00:00,11.0,1,10.0\n\
             2025-06-01 02:00:00,12.0,2,11.0\n",
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.last_timestamp(),
            NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(2, 0, 0)
        );
        assert_eq!(series.value_from_end(1), Some(12.0));

        let last = series.observations().last().unwrap();
        assert_eq!(last.features.get("hour"), Some(&2.0));
        assert_eq!(last.features.get("lag1"), Some(&11.0));
        assert!(!last.features.contains_key("y"));
    }

    #[test]
    fn test_accepts_t_separated_timestamps() {
        let series = parse(
            "timestamp,y\n\
             2025-06-01T00:00:00,1.0\n\
             2025-06-01T01:00:00,2.0\n",
        )
        .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_rejects_an_hourly_gap() {
        let err = parse(
            ",y\n\
             2025-06-01 00:00:00,1.0\n\
             2025-06-01 01:00:00,2.0\n\
             2025-06-01 03:00:00,3.0\n",
        )
        .unwrap_err();
        match err {
            DatasetError::Gap { row, .. } => assert_eq!(row, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let err = parse(
            ",y\n\
             2025-06-01 00:00:00,1.0\n\
             2025-06-01 00:00:00,2.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::Gap { row: 3, .. }));
    }

    #[test]
    fn test_rejects_missing_target_column() {
        let err = parse(
            ",hour\n\
             2025-06-01 00:00:00,0\n",
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::MissingTarget));
    }

    #[test]
    fn test_rejects_bad_numeric_value() {
        let err = parse(
            ",y,hour\n\
             2025-06-01 00:00:00,1.0,zero\n",
        )
        .unwrap_err();
        match err {
            DatasetError::Numeric { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "hour");
                assert_eq!(value, "zero");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_finite_value() {
        let err = parse(
            ",y\n\
             2025-06-01 00:00:00,NaN\n",
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::Numeric { .. }));
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        let err = parse(
            ",y\n\
             June first,1.0\n",
        )
        .unwrap_err();
        match err {
            DatasetError::Timestamp { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "June first");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_header_only_file() {
        assert!(matches!(parse(",y\n"), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_load_history_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ",y,hour").unwrap();
        writeln!(file, "2025-06-01 00:00:00,10.0,0").unwrap();
        writeln!(file, "2025-06-01 01:00:00,11.0,1").unwrap();

        let series = load_history(file.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.value_from_end(2), Some(10.0));
    }

    #[test]
    fn test_load_history_missing_file() {
        let err = load_history(Path::new("/nonexistent/history.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Open { .. }));
    }
}
