//! Demo server: loads the entity declaration file named by ENTITY_CONFIG and serves it.
//!
//! ```text
//! ENTITY_CONFIG=demos/entities.yaml DATABASE_URL=postgres://localhost/shop cargo run --example server
//! ```

use pivot_rest::{app, load_registry, AppState, Settings};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pivot_rest=info".parse()?))
        .init();

    let settings = Settings::from_env();
    let registry = load_registry(&settings.entity_config).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;

    let state = AppState::new(pool, registry).with_config_path(settings.entity_config.clone());
    let app = app(state, settings.max_body_bytes);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
