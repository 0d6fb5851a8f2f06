#![allow(dead_code)]

mod config;
mod db;
mod errors;
mod handlers;
mod ml;
mod models;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::ml::{dataset, features, load_model};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hourcast=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded");

    // Connect to SQLite
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!("Connected to forecast store");

    // Run migrations
    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await?;
    tracing::info!("Database migrations applied");

    // Load the trained model and the engineered history
    let model = load_model(Path::new(&config.forecast.model_path))?;
    tracing::info!(model = model.name(), "Model loaded");

    let history = dataset::load_history(Path::new(&config.forecast.history_path))?;
    tracing::info!(observations = history.len(), "History loaded");

    // Surface feature or lookback misconfiguration now instead of on the
    // first request.
    let resolved = features::resolve(model.feature_names())?;
    let required = features::max_lookback(&resolved).max(1);
    if history.len() < required {
        anyhow::bail!(
            "history has {} observations but the model's features need {}",
            history.len(),
            required
        );
    }

    // Create shared state
    let feature_names = Arc::new(model.feature_names().to_vec());
    let state = AppState {
        pool,
        model: Arc::from(model),
        history: Arc::new(history),
        feature_names,
        horizon: config.forecast.horizon,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/forecast", post(handlers::forecasts::generate))
        .route("/forecast/:date", get(handlers::forecasts::get_by_date))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting hourcast server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
