//! Generic CRUD execution against PostgreSQL. Rows come back as one JSON column.

use crate::error::AppError;
use crate::sql::{self, bind_all, ListQuery, PivotRef, QueryBuf, Scope, TableRef};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Row};
use std::collections::BTreeMap;

pub struct CrudService;

impl CrudService {
    pub async fn list(
        pool: &PgPool,
        table: &TableRef<'_>,
        scope: &Scope<'_>,
        list: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(table, scope, list);
        fetch_all(pool, &q).await
    }

    /// Fetch one row by primary key within scope.
    pub async fn read(
        pool: &PgPool,
        table: &TableRef<'_>,
        id: i64,
        scope: &Scope<'_>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(table, id, scope);
        fetch_optional(pool, &q).await
    }

    pub async fn exists(pool: &PgPool, table: &TableRef<'_>, id: i64) -> Result<bool, AppError> {
        let q = sql::exists_by_id(table, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_one(pool).await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    /// Insert one row. Returns created row.
    pub async fn create(
        pool: &PgPool,
        table: &TableRef<'_>,
        body: &BTreeMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = sql::insert(table, body);
        fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Insert one row and link it to `parent_id` through the pivot, in one transaction.
    pub async fn create_attached(
        pool: &PgPool,
        table: &TableRef<'_>,
        body: &BTreeMap<String, Value>,
        pivot: &PivotRef<'_>,
        parent_id: i64,
    ) -> Result<Value, AppError> {
        let mut tx = pool.begin().await?;
        let q = sql::insert(table, body);
        let row = fetch_optional(&mut *tx, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        let related_id = row
            .get(&table.entity.primary_key)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "created row has no integer '{}'; cannot link it",
                    table.entity.primary_key
                ))
            })?;
        execute(&mut *tx, &sql::attach(pivot, parent_id, related_id)).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Update one row by id within scope. Returns updated row.
    pub async fn update(
        pool: &PgPool,
        table: &TableRef<'_>,
        id: i64,
        body: &BTreeMap<String, Value>,
        scope: &Scope<'_>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(table, id, body, scope);
        fetch_optional(pool, &q).await
    }

    /// Delete one row by id within scope. Returns deleted row or None.
    pub async fn delete(
        pool: &PgPool,
        table: &TableRef<'_>,
        id: i64,
        scope: &Scope<'_>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::delete(table, id, scope);
        fetch_optional(pool, &q).await
    }

    /// Link two rows. Returns false when the link already existed.
    pub async fn attach(pool: &PgPool, pivot: &PivotRef<'_>, parent_id: i64, related_id: i64) -> Result<bool, AppError> {
        Ok(execute(pool, &sql::attach(pivot, parent_id, related_id)).await? > 0)
    }

    /// Unlink two rows. Returns false when no link existed.
    pub async fn detach(pool: &PgPool, pivot: &PivotRef<'_>, parent_id: i64, related_id: i64) -> Result<bool, AppError> {
        Ok(execute(pool, &sql::detach(pivot, parent_id, related_id)).await? > 0)
    }
}

async fn fetch_optional<'c, E>(executor: E, q: &QueryBuf) -> Result<Option<Value>, AppError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let row = bind_all(sqlx::query(&q.sql), &q.params)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|r| r.try_get::<Value, _>(0)).transpose()?)
}

async fn fetch_all<'c, E>(executor: E, q: &QueryBuf) -> Result<Vec<Value>, AppError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(executor).await?;
    rows.iter()
        .map(|r| r.try_get::<Value, _>(0).map_err(AppError::from))
        .collect()
}

async fn execute<'c, E>(executor: E, q: &QueryBuf) -> Result<u64, AppError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let done = bind_all(sqlx::query(&q.sql), &q.params).execute(executor).await?;
    Ok(done.rows_affected())
}
