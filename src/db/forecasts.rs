use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::DayForecast;

/// Date-keyed forecast documents: one row per calendar day, the hourly
/// values stored as a JSON array.
pub struct ForecastRepo;

impl ForecastRepo {
    /// Create or replace the values stored for one date.
    pub async fn upsert(pool: &SqlitePool, day: &DayForecast) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO forecasts (date, hourly_values)
               VALUES (?1, ?2)
               ON CONFLICT(date) DO UPDATE
               SET hourly_values = excluded.hourly_values,
                   updated_at = datetime('now')"#,
        )
        .bind(day.date.to_string())
        .bind(Json(&day.values))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Persist a whole run's day buckets in one transaction, so a failure
    /// partway through never leaves a half-written forecast behind.
    pub async fn upsert_batch(pool: &SqlitePool, days: &[DayForecast]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for day in days {
            sqlx::query(
                r#"INSERT INTO forecasts (date, hourly_values)
                   VALUES (?1, ?2)
                   ON CONFLICT(date) DO UPDATE
                   SET hourly_values = excluded.hourly_values,
                       updated_at = datetime('now')"#,
            )
            .bind(day.date.to_string())
            .bind(Json(&day.values))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Values stored under an exact date key, if any.
    pub async fn get_values(pool: &SqlitePool, date: &str) -> Result<Option<Vec<f64>>, sqlx::Error> {
        let row: Option<(Json<Vec<f64>>,)> =
            sqlx::query_as("SELECT hourly_values FROM forecasts WHERE date = ?1")
                .bind(date)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(Json(values),)| values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    // A pooled :memory: connection gets its own database, so the test
    // pool is capped at a single connection.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../migrations/001_initial_schema.sql"))
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn day(date: (i32, u32, u32), values: Vec<f64>) -> DayForecast {
        DayForecast {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            values,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_read_back() {
        let pool = test_pool().await;
        let forecast = day((2025, 7, 1), vec![11.0, 12.5, 13.0]);

        ForecastRepo::upsert(&pool, &forecast).await.unwrap();

        let values = ForecastRepo::get_values(&pool, "2025-07-01").await.unwrap();
        assert_eq!(values, Some(vec![11.0, 12.5, 13.0]));
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_values() {
        let pool = test_pool().await;
        ForecastRepo::upsert(&pool, &day((2025, 7, 1), vec![1.0]))
            .await
            .unwrap();
        ForecastRepo::upsert(&pool, &day((2025, 7, 1), vec![2.0, 3.0]))
            .await
            .unwrap();

        let values = ForecastRepo::get_values(&pool, "2025-07-01").await.unwrap();
        assert_eq!(values, Some(vec![2.0, 3.0]));
    }

    #[tokio::test]
    async fn test_missing_date_reads_none() {
        let pool = test_pool().await;
        let values = ForecastRepo::get_values(&pool, "2030-01-01").await.unwrap();
        assert_eq!(values, None);
    }

    #[tokio::test]
    async fn test_batch_writes_every_day() {
        let pool = test_pool().await;
        let days = vec![
            day((2025, 7, 1), vec![1.0; 24]),
            day((2025, 7, 2), vec![2.0; 6]),
        ];

        ForecastRepo::upsert_batch(&pool, &days).await.unwrap();

        assert_eq!(
            ForecastRepo::get_values(&pool, "2025-07-01")
                .await
                .unwrap()
                .map(|v| v.len()),
            Some(24)
        );
        assert_eq!(
            ForecastRepo::get_values(&pool, "2025-07-02").await.unwrap(),
            Some(vec![2.0; 6])
        );
    }

    // End to end: a real model document drives the engine and the result
    // lands in the store.
    #[tokio::test]
    async fn test_forecast_run_persists_and_reads_back() {
        use crate::ml::{load_model_str, ForecastEngine};
        use crate::models::{Observation, SeriesFrame};
        use chrono::Duration;

        let model = load_model_str(
            r#"{
                "model_type": "linear_regression",
                "model_name": "step_up",
                "feature_names": ["lag1"],
                "coefficients": [1.0],
                "intercept": 1.0
            }"#,
        )
        .unwrap();

        let start = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let history = SeriesFrame::from_observations(
            (0..24)
                .map(|i| Observation::new(start + Duration::hours(i), 10.0))
                .collect(),
        );

        let days = ForecastEngine::new()
            .run(
                model.as_ref(),
                &history,
                &["lag1".to_string()],
                history.len(),
            )
            .unwrap();

        let pool = test_pool().await;
        ForecastRepo::upsert_batch(&pool, &days).await.unwrap();

        let values = ForecastRepo::get_values(&pool, "2025-07-01")
            .await
            .unwrap()
            .unwrap();
        let expected: Vec<f64> = (11..=34).map(f64::from).collect();
        assert_eq!(values, expected);
    }
}
