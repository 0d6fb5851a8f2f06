use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day of hourly forecast values. This is the unit that gets
/// persisted and served back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Envelope returned by `POST /forecast`.
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub status: String,
    pub message: String,
    pub data: Vec<DayForecast>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_forecast_serializes_date_as_iso_string() {
        let day = DayForecast {
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            values: vec![11.0, 12.5],
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2025-07-01");
        assert_eq!(json["values"][1], 12.5);
    }

    #[test]
    fn test_response_envelope_shape() {
        let response = ForecastResponse {
            status: "success".into(),
            message: "Forecast saved".into(),
            data: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Forecast saved");
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
