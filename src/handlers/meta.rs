//! Registry introspection and reload.

use crate::config::{FieldMeta, RelationDecl};
use crate::error::AppError;
use crate::path::{EntityTypeRef, ResolvedPath};
use crate::response::{success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

/// Resolve a path without touching the database.
pub async fn resolve_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let resolved: ResolvedPath = state.resolve(&path)?;
    Ok(success_one(StatusCode::OK, resolved))
}

#[derive(Serialize)]
pub struct EntitySummary {
    #[serde(rename = "type")]
    pub type_ref: EntityTypeRef,
    pub type_name: String,
    pub path: String,
    pub storage_name: String,
    pub primary_key: String,
    pub operations: Vec<String>,
    pub fields: Vec<FieldMeta>,
    pub relations: Vec<RelationDecl>,
}

pub async fn list_entities(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entities = state.with_registry(|registry| {
        registry
            .entities()
            .map(|e| EntitySummary {
                type_ref: e.type_ref.clone(),
                type_name: e.type_ref.to_string(),
                path: e.path.clone(),
                storage_name: e.storage_name.clone(),
                primary_key: e.primary_key.clone(),
                operations: e.operations.clone(),
                fields: e.fields.clone(),
                relations: registry.relations_for(&e.type_ref).into_iter().cloned().collect(),
            })
            .collect::<Vec<_>>()
    })?;
    Ok(success_many(entities))
}

#[derive(Serialize)]
pub struct ReloadSummary {
    pub entities: usize,
}

pub async fn reload(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entities = state.reload().await?;
    Ok(success_one(StatusCode::OK, ReloadSummary { entities }))
}
