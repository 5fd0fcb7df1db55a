//! Entity handlers for any resolved path: main collections/members and relation collections/members.
//! One handler per HTTP method; the resolved shape decides the operation.

use crate::case::{to_snake_case, value_keys_to_camel_case};
use crate::config::{is_valid_identifier, InputKind, RegisteredEntity, RelationKind, View};
use crate::error::{AppError, ResolutionError};
use crate::extractors::ResolvedRoute;
use crate::path::{MainResolution, RelationResolution, ResolvedPath};
use crate::response::{success_many, success_one};
use crate::service::{CrudService, RequestValidator};
use crate::sql::{ListQuery, PivotRef, Scope, SortDir, TableRef};
use crate::state::{AppState, RouteContext};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn require(entity: &RegisteredEntity, operation: &str) -> Result<(), AppError> {
    if entity.allows(operation) {
        Ok(())
    } else {
        Err(AppError::MethodNotAllowed(format!("{} not allowed on {}", operation, entity.path)))
    }
}

fn db_id(id: u64) -> Result<i64, AppError> {
    i64::try_from(id).map_err(|_| ResolutionError::IdentifierOutOfRange(id.to_string()).into())
}

fn parent_of(ctx: &RouteContext) -> Result<&RegisteredEntity, AppError> {
    ctx.parent
        .as_ref()
        .ok_or_else(|| AppError::NotFound(ctx.resolved.full_path().to_string()))
}

fn main_table<'a>(ctx: &'a RouteContext) -> TableRef<'a> {
    TableRef::new(&ctx.schema, &ctx.entity.storage_name, &ctx.entity)
}

/// Child rows live in the relation's storage, which may differ from the related entity's own.
fn relation_table<'a>(ctx: &'a RouteContext, rel: &'a RelationResolution) -> TableRef<'a> {
    TableRef::new(&ctx.schema, &rel.storage_name, &ctx.entity)
}

fn parent_table<'a>(ctx: &'a RouteContext, rel: &'a RelationResolution) -> Result<TableRef<'a>, AppError> {
    Ok(TableRef::new(&ctx.schema, &rel.parent_storage_name, parent_of(ctx)?))
}

fn relation_scope(rel: &RelationResolution) -> Result<Scope<'_>, AppError> {
    let parent_id = db_id(rel.parent_id)?;
    Ok(match &rel.kind {
        RelationKind::HasMany { foreign_key } => Scope::ForeignKey {
            column: foreign_key,
            parent_id,
        },
        RelationKind::BelongsToMany {
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
        } => Scope::Pivot {
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_id,
        },
    })
}

fn pivot_of<'a>(ctx: &'a RouteContext, rel: &'a RelationResolution) -> Option<PivotRef<'a>> {
    match &rel.kind {
        RelationKind::BelongsToMany {
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
        } => Some(PivotRef {
            schema: &ctx.schema,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
        }),
        RelationKind::HasMany { .. } => None,
    }
}

/// 404 unless the parent row exists.
async fn ensure_parent(state: &AppState, ctx: &RouteContext, rel: &RelationResolution) -> Result<(), AppError> {
    let table = parent_table(ctx, rel)?;
    if CrudService::exists(&state.pool, &table, db_id(rel.parent_id)?).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("{}/{}", rel.main_path, rel.parent_id)))
    }
}

/// Request body → column map: object only, keys snake_cased, declared fields only when the entity has field metadata.
pub(crate) fn body_to_map(value: Value, entity: &RegisteredEntity) -> Result<BTreeMap<String, Value>, AppError> {
    let Value::Object(obj) = value else {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    };
    let mut out = BTreeMap::new();
    for (key, v) in obj {
        let column = to_snake_case(&key);
        if !is_valid_identifier(&column) {
            return Err(AppError::BadRequest(format!("invalid field name '{}'", key)));
        }
        if entity.has_field_metadata() && column != entity.primary_key && entity.field(&column).is_none() {
            return Err(AppError::Validation(format!("unknown field '{}'", key)));
        }
        out.insert(column, v);
    }
    Ok(out)
}

/// Query-string value typed by the field's declared input kind; anything else stays a string.
fn query_value(entity: &RegisteredEntity, column: &str, raw: &str) -> Result<Value, AppError> {
    match entity.field(column).map(|f| f.input_kind) {
        Some(InputKind::Number) => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number))
            .ok_or_else(|| AppError::BadRequest(format!("filter '{}' must be a number", column))),
        Some(InputKind::Boolean) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(AppError::BadRequest(format!("filter '{}' must be true or false", column))),
        },
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn parse_u32(name: &str, raw: &str) -> Result<u32, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", name)))
}

/// `limit`, `offset`, `sort=field|-field`; every other key is an exact-match filter.
pub(crate) fn list_query(params: HashMap<String, String>, entity: &RegisteredEntity) -> Result<ListQuery, AppError> {
    let mut list = ListQuery {
        limit: DEFAULT_LIMIT,
        ..ListQuery::default()
    };
    let mut filters: BTreeMap<String, Value> = BTreeMap::new();
    for (key, raw) in params {
        match key.as_str() {
            "limit" => list.limit = parse_u32("limit", &raw)?.min(MAX_LIMIT),
            "offset" => list.offset = parse_u32("offset", &raw)?,
            "sort" => {
                let (name, dir) = match raw.strip_prefix('-') {
                    Some(rest) => (rest, SortDir::Desc),
                    None => (raw.as_str(), SortDir::Asc),
                };
                let column = to_snake_case(name);
                let allowed = column == entity.primary_key
                    || if entity.has_field_metadata() {
                        entity.field(&column).map(|f| f.sortable).unwrap_or(false)
                    } else {
                        is_valid_identifier(&column)
                    };
                if !allowed {
                    return Err(AppError::BadRequest(format!("cannot sort by '{}'", name)));
                }
                list.sort = Some((column, dir));
            }
            _ => {
                let column = to_snake_case(&key);
                let allowed = if entity.has_field_metadata() {
                    column == entity.primary_key || entity.field(&column).map(|f| f.filterable).unwrap_or(false)
                } else {
                    is_valid_identifier(&column)
                };
                if !allowed {
                    return Err(AppError::BadRequest(format!("cannot filter by '{}'", key)));
                }
                let value = query_value(entity, &column, &raw)?;
                filters.insert(column, value);
            }
        }
    }
    list.filters = filters.into_iter().collect();
    Ok(list)
}

/// Shape a row for output: primary key plus fields displayable in `view`, keys camelCased.
pub(crate) fn present(mut row: Value, entity: &RegisteredEntity, view: View) -> Value {
    if entity.has_field_metadata() {
        if let Value::Object(map) = &mut row {
            map.retain(|k, _| {
                *k == entity.primary_key
                    || entity
                        .field(k)
                        .map(|f| f.displayable_in.contains(&view))
                        .unwrap_or(false)
            });
        }
    }
    value_keys_to_camel_case(&mut row);
    row
}

fn present_all(rows: Vec<Value>, entity: &RegisteredEntity) -> Vec<Value> {
    rows.into_iter().map(|r| present(r, entity, View::List)).collect()
}

fn not_found(ctx: &RouteContext) -> AppError {
    AppError::NotFound(ctx.resolved.full_path().to_string())
}

fn method_not_allowed(method: &str, ctx: &RouteContext) -> AppError {
    AppError::MethodNotAllowed(format!("{} {}", method, ctx.resolved.full_path()))
}

pub async fn get_path(
    State(state): State<AppState>,
    ResolvedRoute(ctx): ResolvedRoute,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    match &ctx.resolved {
        ResolvedPath::Main(MainResolution { member_id: None, .. }) => {
            require(&ctx.entity, "list")?;
            let list = list_query(params, &ctx.entity)?;
            let rows = CrudService::list(&state.pool, &main_table(&ctx), &Scope::All, &list).await?;
            Ok(success_many(present_all(rows, &ctx.entity)).into_response())
        }
        ResolvedPath::Main(MainResolution { member_id: Some(id), .. }) => {
            require(&ctx.entity, "read")?;
            let row = CrudService::read(&state.pool, &main_table(&ctx), db_id(*id)?, &Scope::All)
                .await?
                .ok_or_else(|| not_found(&ctx))?;
            Ok(success_one(StatusCode::OK, present(row, &ctx.entity, View::Detail)).into_response())
        }
        ResolvedPath::Relation(rel) => {
            require(&ctx.entity, if rel.relation_id.is_some() { "read" } else { "list" })?;
            ensure_parent(&state, &ctx, rel).await?;
            let table = relation_table(&ctx, rel);
            let scope = relation_scope(rel)?;
            match rel.relation_id {
                None => {
                    let list = list_query(params, &ctx.entity)?;
                    let rows = CrudService::list(&state.pool, &table, &scope, &list).await?;
                    Ok(success_many(present_all(rows, &ctx.entity)).into_response())
                }
                Some(id) => {
                    let row = CrudService::read(&state.pool, &table, db_id(id)?, &scope)
                        .await?
                        .ok_or_else(|| not_found(&ctx))?;
                    Ok(success_one(StatusCode::OK, present(row, &ctx.entity, View::Detail)).into_response())
                }
            }
        }
    }
}

pub async fn post_path(
    State(state): State<AppState>,
    ResolvedRoute(ctx): ResolvedRoute,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    match &ctx.resolved {
        ResolvedPath::Main(MainResolution { member_id: None, .. }) => {
            require(&ctx.entity, "create")?;
            let body = body_to_map(body, &ctx.entity)?;
            RequestValidator::validate(&body, &ctx.entity.validation)?;
            let row = CrudService::create(&state.pool, &main_table(&ctx), &body).await?;
            Ok(success_one(StatusCode::CREATED, present(row, &ctx.entity, View::Detail)).into_response())
        }
        ResolvedPath::Relation(rel) if rel.relation_id.is_none() => {
            require(&ctx.entity, "create")?;
            ensure_parent(&state, &ctx, rel).await?;
            let mut body = body_to_map(body, &ctx.entity)?;
            let table = relation_table(&ctx, rel);
            let parent_id = db_id(rel.parent_id)?;
            let row = match &rel.kind {
                RelationKind::HasMany { foreign_key } => {
                    body.insert(foreign_key.clone(), Value::from(parent_id));
                    RequestValidator::validate(&body, &ctx.entity.validation)?;
                    CrudService::create(&state.pool, &table, &body).await?
                }
                RelationKind::BelongsToMany { .. } => {
                    RequestValidator::validate(&body, &ctx.entity.validation)?;
                    let pivot = pivot_of(&ctx, rel).ok_or_else(|| not_found(&ctx))?;
                    CrudService::create_attached(&state.pool, &table, &body, &pivot, parent_id).await?
                }
            };
            Ok(success_one(StatusCode::CREATED, present(row, &ctx.entity, View::Detail)).into_response())
        }
        _ => Err(method_not_allowed("POST", &ctx)),
    }
}

pub async fn patch_path(
    State(state): State<AppState>,
    ResolvedRoute(ctx): ResolvedRoute,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let (table, id, scope) = match &ctx.resolved {
        ResolvedPath::Main(MainResolution { member_id: Some(id), .. }) => {
            require(&ctx.entity, "update")?;
            (main_table(&ctx), *id, Scope::All)
        }
        ResolvedPath::Relation(rel) => match rel.relation_id {
            Some(id) => {
                require(&ctx.entity, "update")?;
                ensure_parent(&state, &ctx, rel).await?;
                (relation_table(&ctx, rel), id, relation_scope(rel)?)
            }
            None => return Err(method_not_allowed("PATCH", &ctx)),
        },
        _ => return Err(method_not_allowed("PATCH", &ctx)),
    };
    let mut body = body_to_map(body, &ctx.entity)?;
    // scoped rows keep their parent
    if let Scope::ForeignKey { column, .. } = scope {
        body.remove(column);
    }
    RequestValidator::validate_partial(&body, &ctx.entity.validation)?;
    let row = CrudService::update(&state.pool, &table, db_id(id)?, &body, &scope)
        .await?
        .ok_or_else(|| not_found(&ctx))?;
    Ok(success_one(StatusCode::OK, present(row, &ctx.entity, View::Detail)).into_response())
}

/// Attach an existing child to the parent (belongs_to_many only).
pub async fn put_path(State(state): State<AppState>, ResolvedRoute(ctx): ResolvedRoute) -> Result<Response, AppError> {
    let ResolvedPath::Relation(rel) = &ctx.resolved else {
        return Err(method_not_allowed("PUT", &ctx));
    };
    let Some(related_id) = rel.relation_id else {
        return Err(method_not_allowed("PUT", &ctx));
    };
    let Some(pivot) = pivot_of(&ctx, rel) else {
        return Err(AppError::BadRequest(format!(
            "relation '{}' is has_many; create children with POST",
            rel.relation_name
        )));
    };
    require(parent_of(&ctx)?, "update")?;
    ensure_parent(&state, &ctx, rel).await?;
    let table = relation_table(&ctx, rel);
    let related_id = db_id(related_id)?;
    let row = CrudService::read(&state.pool, &table, related_id, &Scope::All)
        .await?
        .ok_or_else(|| not_found(&ctx))?;
    let created = CrudService::attach(&state.pool, &pivot, db_id(rel.parent_id)?, related_id).await?;
    tracing::info!(
        parent = %rel.parent_entity_type,
        relation = %rel.relation_name,
        parent_id = rel.parent_id,
        related_id,
        created,
        "attached"
    );
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok(success_one(status, present(row, &ctx.entity, View::Detail)).into_response())
}

pub async fn delete_path(State(state): State<AppState>, ResolvedRoute(ctx): ResolvedRoute) -> Result<Response, AppError> {
    match &ctx.resolved {
        ResolvedPath::Main(MainResolution { member_id: Some(id), .. }) => {
            require(&ctx.entity, "delete")?;
            CrudService::delete(&state.pool, &main_table(&ctx), db_id(*id)?, &Scope::All)
                .await?
                .ok_or_else(|| not_found(&ctx))?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        ResolvedPath::Relation(rel) => {
            let Some(related_id) = rel.relation_id else {
                return Err(method_not_allowed("DELETE", &ctx));
            };
            let related_id = db_id(related_id)?;
            let pivot = pivot_of(&ctx, rel);
            match pivot {
                Some(_) => require(parent_of(&ctx)?, "update")?,
                None => require(&ctx.entity, "delete")?,
            }
            ensure_parent(&state, &ctx, rel).await?;
            match pivot {
                Some(pivot) => {
                    if !CrudService::detach(&state.pool, &pivot, db_id(rel.parent_id)?, related_id).await? {
                        return Err(not_found(&ctx));
                    }
                    tracing::info!(
                        parent = %rel.parent_entity_type,
                        relation = %rel.relation_name,
                        parent_id = rel.parent_id,
                        related_id,
                        "detached"
                    );
                }
                None => {
                    let scope = relation_scope(rel)?;
                    CrudService::delete(&state.pool, &relation_table(&ctx, rel), related_id, &scope)
                        .await?
                        .ok_or_else(|| not_found(&ctx))?;
                }
            }
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        _ => Err(method_not_allowed("DELETE", &ctx)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, resolve, ConfigFormat};
    use serde_json::json;

    fn product() -> RegisteredEntity {
        let config = parse_config(
            r#"
entities:
  - path: catalog/product
    fields:
      - name: title
        filterable: true
        sortable: true
      - name: stock_count
        input_kind: number
        filterable: true
      - name: active
        input_kind: boolean
        filterable: true
      - name: cost_price
        displayable_in: [form]
"#,
            ConfigFormat::Yaml,
        )
        .unwrap();
        resolve(&config).unwrap().entities().next().unwrap().clone()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_body_keys_snake_cased_and_checked() {
        let e = product();
        let body = body_to_map(json!({ "stockCount": 3, "title": "Lamp" }), &e).unwrap();
        assert_eq!(body.get("stock_count"), Some(&json!(3)));
        assert!(matches!(
            body_to_map(json!({ "colour": "red" }), &e),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(body_to_map(json!([1, 2]), &e), Err(AppError::BadRequest(_))));
        assert!(matches!(
            body_to_map(json!({ "a b": 1 }), &e),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_list_query_types_filters() {
        let e = product();
        let list = list_query(
            params(&[("stockCount", "4"), ("active", "true"), ("title", "42"), ("limit", "5000")]),
            &e,
        )
        .unwrap();
        assert_eq!(list.limit, MAX_LIMIT);
        assert_eq!(
            list.filters,
            vec![
                ("active".to_string(), json!(true)),
                ("stock_count".to_string(), json!(4)),
                ("title".to_string(), json!("42")),
            ]
        );
    }

    #[test]
    fn test_list_query_keeps_untyped_filters_as_text() {
        let config = parse_config(r#"{ "entities": [{ "path": "tag" }] }"#, ConfigFormat::Json).unwrap();
        let registry = resolve(&config).unwrap();
        let tag = registry.entities().next().unwrap();
        let list = list_query(params(&[("sku", "123"), ("flag", "true"), ("id", "abc")]), tag).unwrap();
        assert_eq!(
            list.filters,
            vec![
                ("flag".to_string(), json!("true")),
                ("id".to_string(), json!("abc")),
                ("sku".to_string(), json!("123")),
            ]
        );
    }

    #[test]
    fn test_list_query_rejects_mistyped_filters() {
        let e = product();
        assert!(matches!(
            list_query(params(&[("stockCount", "many")]), &e),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            list_query(params(&[("active", "yes")]), &e),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_list_query_rejects_unlisted_columns() {
        let e = product();
        assert!(list_query(params(&[("cost_price", "1")]), &e).is_err());
        assert!(list_query(params(&[("sort", "stock_count")]), &e).is_err());
        assert!(list_query(params(&[("offset", "-1")]), &e).is_err());
        let list = list_query(params(&[("sort", "-title")]), &e).unwrap();
        assert_eq!(list.sort, Some(("title".to_string(), SortDir::Desc)));
        assert_eq!(list.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_present_filters_by_view_and_camel_cases() {
        let e = product();
        let row = json!({ "id": 1, "title": "Lamp", "stock_count": 2, "cost_price": 5, "secret": "x" });
        let out = present(row, &e, View::List);
        assert_eq!(out, json!({ "id": 1, "title": "Lamp", "stockCount": 2 }));
    }

    #[test]
    fn test_present_without_metadata_keeps_all_columns() {
        let config = parse_config(r#"{ "entities": [{ "path": "tag" }] }"#, ConfigFormat::Json).unwrap();
        let registry = resolve(&config).unwrap();
        let tag = registry.entities().next().unwrap();
        let out = present(json!({ "id": 1, "tag_name": "red" }), tag, View::Detail);
        assert_eq!(out, json!({ "id": 1, "tagName": "red" }));
    }
}
