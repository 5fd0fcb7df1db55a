//! Resolve the wildcard path of an entity request into a [`RouteContext`].

use crate::error::AppError;
use crate::state::{AppState, RouteContext};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// Extractor for the `*path` wildcard of entity routes, resolved against the current registry.
#[derive(Clone, Debug)]
pub struct ResolvedRoute(pub RouteContext);

#[async_trait]
impl FromRequestParts<AppState> for ResolvedRoute {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(path) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        state.route_context(&path).map(ResolvedRoute)
    }
}
