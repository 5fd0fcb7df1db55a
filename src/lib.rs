//! Pivot REST: a path-driven REST backend. Nested URL paths such as
//! `catalog/product/42/images/7` are resolved onto configured entity types and
//! relations, then served as CRUD over PostgreSQL.

pub mod case;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod path;
pub mod pluralize;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use config::{load_registry, parse_config, resolve, ConfigFormat, EntitiesConfig, EntityRegistry};
pub use error::{AppError, ConfigError, ResolutionError};
pub use path::{EntityTypeRef, ResolvedPath, RouteResolver};
pub use response::{success_many, success_one};
pub use routes::{app, common_routes, common_routes_with_ready, entity_routes, meta_routes, API_PREFIX};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
