//! Convert serde_json::Value to types that sqlx can bind.
//! Strings are always bound as text; a field's `pg_type` cast in the SQL converts them server-side.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PgBindValue::I64(i),
                // u64 beyond i64 and floats
                None => PgBindValue::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    pub fn bind_to<'q>(self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            PgBindValue::Null => query.bind(None::<String>),
            PgBindValue::Bool(b) => query.bind(b),
            PgBindValue::I64(n) => query.bind(n),
            PgBindValue::F64(n) => query.bind(n),
            PgBindValue::String(s) => query.bind(s),
            PgBindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = PgBindValue::from_json(p).bind_to(query);
    }
    query
}
