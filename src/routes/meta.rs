//! Registry introspection routes, mounted outside the entity namespace.

use crate::handlers::meta::{list_entities, reload, resolve_path};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn meta_routes(state: AppState) -> Router {
    Router::new()
        .route("/_meta/resolve/*path", get(resolve_path))
        .route("/_meta/entities", get(list_entities))
        .route("/_meta/reload", post(reload))
        .with_state(state)
}
