//! Shared application state for all routes. The registry is reloadable without restart.

use crate::config::{load_registry, EntityRegistry, RegisteredEntity};
use crate::error::{AppError, ConfigError};
use crate::path::{ResolvedPath, RouteResolver};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Swapped as a whole on reload; readers never see a partially built registry.
    pub registry: Arc<RwLock<EntityRegistry>>,
    /// Declaration file used by reload; `None` disables reload.
    pub config_path: Option<Arc<PathBuf>>,
}

/// Everything a handler needs about one request path, copied out of the registry.
#[derive(Clone, Debug)]
pub struct RouteContext {
    pub resolved: ResolvedPath,
    /// Entity whose rows are addressed (child for relation paths).
    pub entity: RegisteredEntity,
    /// Parent entity for relation paths.
    pub parent: Option<RegisteredEntity>,
    pub schema: String,
}

impl AppState {
    pub fn new(pool: PgPool, registry: EntityRegistry) -> Self {
        AppState {
            pool,
            registry: Arc::new(RwLock::new(registry)),
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(Arc::new(path.into()));
        self
    }

    /// Run `f` against the current registry under a read guard. Never hold the guard across `.await`.
    pub fn with_registry<T>(&self, f: impl FnOnce(&EntityRegistry) -> T) -> Result<T, AppError> {
        let guard = self
            .registry
            .read()
            .map_err(|_| ConfigError::Load("registry lock poisoned".into()))?;
        Ok(f(&guard))
    }

    pub fn resolve(&self, path: &str) -> Result<ResolvedPath, AppError> {
        self.with_registry(|registry| RouteResolver::new(registry).resolve_str(path))?
            .map_err(AppError::from)
    }

    /// Resolve and copy out the registered entities the handlers work with.
    pub fn route_context(&self, path: &str) -> Result<RouteContext, AppError> {
        self.with_registry(|registry| -> Result<RouteContext, AppError> {
            let resolved = RouteResolver::new(registry).resolve_str(path)?;
            let entity = registry
                .entity(resolved.entity_type())
                .cloned()
                .ok_or_else(|| AppError::NotFound(resolved.full_path().to_string()))?;
            let parent = match &resolved {
                ResolvedPath::Main(_) => None,
                ResolvedPath::Relation(rel) => Some(
                    registry
                        .entity(&rel.parent_entity_type)
                        .cloned()
                        .ok_or_else(|| AppError::NotFound(rel.main_path.clone()))?,
                ),
            };
            Ok(RouteContext {
                resolved,
                entity,
                parent,
                schema: registry.schema().to_string(),
            })
        })?
    }

    /// Load and build a new registry from the declaration file, then swap it in.
    /// On any error the current registry stays in place.
    pub async fn reload(&self) -> Result<usize, AppError> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("reload disabled: no config path".into()))?;
        let new_registry = match load_registry(path).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "registry reload rejected");
                return Err(e.into());
            }
        };
        let count = new_registry.len();
        let mut guard = self
            .registry
            .write()
            .map_err(|_| ConfigError::Load("registry lock poisoned".into()))?;
        *guard = new_registry;
        drop(guard);
        tracing::info!(entities = count, path = %path.display(), "registry reloaded");
        Ok(count)
    }
}
