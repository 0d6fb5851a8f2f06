use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ml::ForecastError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: ApiError,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiError {
                code: "BAD_REQUEST".into(),
                message: msg.into(),
            },
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ApiError {
                code: "INTERNAL_ERROR".into(),
                message: msg.into(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        Self::internal("Database error")
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        tracing::error!("Forecast error: {}", err);
        match err {
            ForecastError::UnsupportedFeature(_) | ForecastError::InsufficientHistory { .. } => {
                Self::bad_request(err.to_string())
            }
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ModelError;

    #[test]
    fn test_configuration_errors_map_to_bad_request() {
        let err = AppError::from(ForecastError::UnsupportedFeature("foo".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.body.message.contains("foo"));

        let err = AppError::from(ForecastError::InsufficientHistory {
            required: 24,
            available: 5,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_prediction_errors_map_to_internal() {
        let err = AppError::from(ForecastError::Prediction {
            step: 3,
            source: ModelError::Failed("boom".into()),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "INTERNAL_ERROR");

        let err = AppError::from(ForecastError::NonFinite { step: 0 });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
