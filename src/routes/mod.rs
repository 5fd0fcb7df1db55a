//! Router assembly.

mod common;
mod entity;
mod meta;

pub use common::{common_routes, common_routes_with_ready};
pub use entity::entity_routes;
pub use meta::meta_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Prefix of the entity namespace.
pub const API_PREFIX: &str = "/api/v1";

/// Full application: common and meta routes at the root, entities under [`API_PREFIX`].
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(meta_routes(state.clone()))
        .nest(API_PREFIX, entity_routes(state))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
}
