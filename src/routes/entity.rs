//! Entity routes: one wildcard route; the handler resolves the path against the registry.

use crate::error::{AppError, ResolutionError};
use crate::handlers::{delete_path, get_path, patch_path, post_path, put_path};
use crate::state::AppState;
use axum::{routing::any, routing::get, Router};

async fn empty_path() -> AppError {
    ResolutionError::EmptyPath.into()
}

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/", any(empty_path))
        .route(
            "/*path",
            get(get_path)
                .post(post_path)
                .patch(patch_path)
                .put(put_path)
                .delete(delete_path),
        )
        .with_state(state)
}
