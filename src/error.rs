//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures while turning a URL path into a [`crate::path::ResolvedPath`].
/// All of them are caller-input errors and none is retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("empty path")]
    EmptyPath,
    #[error("malformed path: {0}")]
    MalformedPath(String),
    #[error("malformed relation path: no parent entity before id '{0}'")]
    MalformedRelationPath(String),
    #[error("unknown entity type: {type_name} (path '{path}')")]
    UnknownEntityType { type_name: String, path: String },
    #[error("relation '{relation}' not declared on {parent}")]
    RelationNotFound { parent: String, relation: String },
    #[error("identifier out of range: {0}")]
    IdentifierOutOfRange(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate entity type: {0}")]
    DuplicateEntity(String),
    #[error("duplicate relation '{relation}' on {entity}")]
    DuplicateRelation { entity: String, relation: String },
    #[error("invalid identifier for {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ResolutionError {
    /// Status and stable client-facing code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ResolutionError::EmptyPath => (StatusCode::BAD_REQUEST, "empty_path"),
            ResolutionError::MalformedPath(_) | ResolutionError::MalformedRelationPath(_) => {
                (StatusCode::BAD_REQUEST, "malformed_path")
            }
            ResolutionError::IdentifierOutOfRange(_) => (StatusCode::BAD_REQUEST, "invalid_identifier"),
            ResolutionError::UnknownEntityType { .. } => (StatusCode::NOT_FOUND, "unknown_entity"),
            ResolutionError::RelationNotFound { .. } => (StatusCode::NOT_FOUND, "relation_not_found"),
        }
    }

    /// Message for clients: names the path segment, never the internal type name.
    fn public_message(&self) -> String {
        match self {
            ResolutionError::UnknownEntityType { path, .. } => format!("unknown entity: {}", path),
            ResolutionError::RelationNotFound { relation, .. } => format!("relation not found: {}", relation),
            other => other.to_string(),
        }
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Resolution(e) => e.status_and_code(),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::Database(db) if db.is_unique_violation() => (StatusCode::CONFLICT, "conflict"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Resolution(e) => e.public_message(),
            AppError::Db(_) if status.is_server_error() => "database error".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
