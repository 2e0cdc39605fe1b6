use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filekeep::config::Config;
use filekeep::db::Database;
use filekeep::error::AppError;
use filekeep::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filekeep=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting filekeep...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let state = AppState::new(config.clone(), db);

    // Bootstrap client for basic auth
    if let (Some(client_id), Some(client_secret)) =
        (&config.auth.client_id, &config.auth.client_secret)
    {
        match state.basic_auth.register_client(client_id, client_secret).await {
            Ok(()) | Err(AppError::ResourceExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
    } else if config.auth.enabled {
        tracing::warn!("Basic auth is enabled but no bootstrap client is configured");
    }

    // Build router
    let app = create_router(state);

    // Start server
    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
