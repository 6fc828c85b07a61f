//! HTTP server: loads config, prepares the database, serves the API.

use devcatalog::{build_router, ensure_database_exists, ensure_tables, AppConfig, AppState, PgDeveloperStore, PgUserStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("devcatalog=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    tracing::info!("DB connection successful");
    ensure_tables(&pool).await?;

    let port = config.port;
    let environment = config.environment;
    let state = AppState::new(
        Arc::new(PgDeveloperStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool)),
        config,
    );
    let app = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(?environment, "listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
