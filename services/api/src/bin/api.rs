//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GeminiAdapter, GeminiSettings, OfficeExporter},
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_adapter = Arc::new(DbAdapter::connect(&config.database_url, 5).await?);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let generator = Arc::new(GeminiAdapter::new(GeminiSettings {
        api_key: config.gemini_api_key.clone(),
        model: config.gemini_model.clone(),
        base_url: config.gemini_base_url.clone(),
        timeout: config.generation_timeout,
    })?);
    let exporter = Arc::new(OfficeExporter::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        generator,
        exporter,
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
