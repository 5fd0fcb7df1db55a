//! Common routes: health, readiness, version.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
    entities: usize,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    let entities = state.with_registry(|r| r.len()).unwrap_or(0);
    let db_ok = sqlx::query("SELECT 1").fetch_optional(&state.pool).await.is_ok();
    if db_ok && entities > 0 {
        (
            StatusCode::OK,
            Json(ReadyBody {
                status: "ok",
                database: "ok",
                entities,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: if db_ok { "ok" } else { "unavailable" },
                entities,
            }),
        )
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version, GET /info.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/info", get(version))
}

/// Common routes plus readiness (database reachable and at least one entity registered).
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
        .merge(common_routes())
}
