//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for resolved paths.
//! Every statement returns rows as a single JSON column (`row_to_json`) so no column list is needed.

use crate::config::{InputKind, RegisteredEntity};
use serde_json::Value;
use std::collections::BTreeMap;

/// Alias of the addressed table in every statement.
const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL (safe: only from config or validated request keys).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn main_col(col: &str) -> String {
    format!("{}.{}", MAIN_ALIAS, quoted(col))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Storage location plus the entity declaration (primary key, field casts).
#[derive(Clone, Copy)]
pub struct TableRef<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub entity: &'a RegisteredEntity,
}

impl<'a> TableRef<'a> {
    pub fn new(schema: &'a str, table: &'a str, entity: &'a RegisteredEntity) -> Self {
        TableRef { schema, table, entity }
    }

    fn qualified(&self) -> String {
        qualified_table(self.schema, self.table)
    }

    fn pk(&self) -> &str {
        &self.entity.primary_key
    }

    /// `$n` or `$n::type` when the field declares a SQL type.
    fn placeholder(&self, column: &str, n: u32) -> String {
        self.entity
            .pg_type(column)
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }

    /// Exact-match condition for a list filter. Columns without a declared type
    /// are compared as text against a text parameter.
    fn filter_condition(&self, column: &str, n: u32) -> String {
        let typed = self
            .entity
            .field(column)
            .map(|f| f.pg_type.is_some() || matches!(f.input_kind, InputKind::Number | InputKind::Boolean))
            .unwrap_or(false);
        if typed {
            format!("{} = {}", main_col(column), self.placeholder(column, n))
        } else {
            format!("{}::text = ${}", main_col(column), n)
        }
    }
}

/// Restricts rows to those reachable from one parent row.
#[derive(Clone, Copy, Debug)]
pub enum Scope<'a> {
    All,
    /// Related rows carry `column = parent_id`.
    ForeignKey { column: &'a str, parent_id: i64 },
    /// Related rows are linked through `pivot_table`.
    Pivot {
        pivot_table: &'a str,
        foreign_pivot_key: &'a str,
        related_pivot_key: &'a str,
        parent_id: i64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// List parameters; filters are exact-match and already restricted to allowed columns.
/// Filter values for untyped columns must be strings.
#[derive(Clone, Debug)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub sort: Option<(String, SortDir)>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filters: Vec::new(),
            sort: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Condition limiting `main` to the scope, or None for `Scope::All`.
fn scope_condition(t: &TableRef<'_>, scope: &Scope<'_>, q: &mut QueryBuf) -> Option<String> {
    match scope {
        Scope::All => None,
        Scope::ForeignKey { column, parent_id } => {
            let n = q.push_param(Value::from(*parent_id));
            Some(format!("{} = ${}", main_col(column), n))
        }
        Scope::Pivot {
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_id,
        } => {
            let n = q.push_param(Value::from(*parent_id));
            Some(format!(
                "EXISTS (SELECT 1 FROM {} pivot WHERE pivot.{} = ${} AND pivot.{} = {})",
                qualified_table(t.schema, pivot_table),
                quoted(foreign_pivot_key),
                n,
                quoted(related_pivot_key),
                main_col(t.pk())
            ))
        }
    }
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT list in scope with exact-match filters, ORDER BY sort column (then pk), LIMIT/OFFSET.
pub fn select_list(t: &TableRef<'_>, scope: &Scope<'_>, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts: Vec<String> = scope_condition(t, scope, &mut q).into_iter().collect();
    for (col, val) in &list.filters {
        let n = q.push_param(val.clone());
        where_parts.push(t.filter_condition(col, n));
    }
    let order_clause = match &list.sort {
        Some((col, dir)) if col != t.pk() => format!(
            " ORDER BY {} {}, {}",
            main_col(col),
            if *dir == SortDir::Desc { "DESC" } else { "ASC" },
            main_col(t.pk())
        ),
        Some((_, SortDir::Desc)) => format!(" ORDER BY {} DESC", main_col(t.pk())),
        _ => format!(" ORDER BY {}", main_col(t.pk())),
    };
    q.sql = format!(
        "SELECT row_to_json({alias}) AS \"row\" FROM {} {alias}{}{} LIMIT {} OFFSET {}",
        t.qualified(),
        where_clause(&where_parts),
        order_clause,
        list.limit.min(1000),
        list.offset,
        alias = MAIN_ALIAS,
    );
    q
}

/// SELECT one row by primary key, within scope.
pub fn select_by_id(t: &TableRef<'_>, id: i64, scope: &Scope<'_>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    let mut where_parts = vec![format!("{} = ${}", main_col(t.pk()), n)];
    where_parts.extend(scope_condition(t, scope, &mut q));
    q.sql = format!(
        "SELECT row_to_json({alias}) AS \"row\" FROM {} {alias}{}",
        t.qualified(),
        where_clause(&where_parts),
        alias = MAIN_ALIAS,
    );
    q
}

/// SELECT whether a row with this primary key exists.
pub fn exists_by_id(t: &TableRef<'_>, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ${})",
        t.qualified(),
        quoted(t.pk()),
        n
    );
    q
}

/// INSERT the body's columns; an empty body inserts DEFAULT VALUES.
pub fn insert(t: &TableRef<'_>, body: &BTreeMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (col, val) in body {
        let n = q.push_param(val.clone());
        cols.push(quoted(col));
        placeholders.push(t.placeholder(col, n));
    }
    let values = if cols.is_empty() {
        "DEFAULT VALUES".to_string()
    } else {
        format!("({}) VALUES ({})", cols.join(", "), placeholders.join(", "))
    };
    q.sql = format!(
        "INSERT INTO {} AS {alias} {} RETURNING row_to_json({alias}) AS \"row\"",
        t.qualified(),
        values,
        alias = MAIN_ALIAS,
    );
    q
}

/// UPDATE by id within scope: SET only body columns (never the primary key).
/// An empty SET degrades to a scoped SELECT so the caller still gets the row back.
pub fn update(t: &TableRef<'_>, id: i64, body: &BTreeMap<String, Value>, scope: &Scope<'_>) -> QueryBuf {
    let sets: Vec<(&String, &Value)> = body.iter().filter(|(k, _)| k.as_str() != t.pk()).collect();
    if sets.is_empty() {
        return select_by_id(t, id, scope);
    }
    let mut q = QueryBuf::new();
    let set_clause = sets
        .into_iter()
        .map(|(col, val)| {
            let n = q.push_param(val.clone());
            format!("{} = {}", quoted(col), t.placeholder(col, n))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let n = q.push_param(Value::from(id));
    let mut where_parts = vec![format!("{} = ${}", main_col(t.pk()), n)];
    where_parts.extend(scope_condition(t, scope, &mut q));
    q.sql = format!(
        "UPDATE {} AS {alias} SET {}{} RETURNING row_to_json({alias}) AS \"row\"",
        t.qualified(),
        set_clause,
        where_clause(&where_parts),
        alias = MAIN_ALIAS,
    );
    q
}

/// DELETE by id within scope.
pub fn delete(t: &TableRef<'_>, id: i64, scope: &Scope<'_>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    let mut where_parts = vec![format!("{} = ${}", main_col(t.pk()), n)];
    where_parts.extend(scope_condition(t, scope, &mut q));
    q.sql = format!(
        "DELETE FROM {} AS {alias}{} RETURNING row_to_json({alias}) AS \"row\"",
        t.qualified(),
        where_clause(&where_parts),
        alias = MAIN_ALIAS,
    );
    q
}

/// Pivot row location for attach/detach.
#[derive(Clone, Copy, Debug)]
pub struct PivotRef<'a> {
    pub schema: &'a str,
    pub pivot_table: &'a str,
    pub foreign_pivot_key: &'a str,
    pub related_pivot_key: &'a str,
}

/// INSERT pivot row unless it already exists (idempotent attach).
pub fn attach(p: &PivotRef<'_>, parent_id: i64, related_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let a = q.push_param(Value::from(parent_id));
    let b = q.push_param(Value::from(related_id));
    let table = qualified_table(p.schema, p.pivot_table);
    let (fk, rk) = (quoted(p.foreign_pivot_key), quoted(p.related_pivot_key));
    q.sql = format!(
        "INSERT INTO {table} ({fk}, {rk}) SELECT ${a}, ${b} WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {fk} = ${a} AND {rk} = ${b})"
    );
    q
}

/// DELETE pivot row(s) linking parent and related.
pub fn detach(p: &PivotRef<'_>, parent_id: i64, related_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let a = q.push_param(Value::from(parent_id));
    let b = q.push_param(Value::from(related_id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${} AND {} = ${}",
        qualified_table(p.schema, p.pivot_table),
        quoted(p.foreign_pivot_key),
        a,
        quoted(p.related_pivot_key),
        b
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, resolve, ConfigFormat, EntityRegistry};

    fn registry() -> EntityRegistry {
        let config = parse_config(
            r#"{
                "entities": [{
                    "path": "catalog/product",
                    "fields": [
                        { "name": "title", "filterable": true, "sortable": true },
                        { "name": "price", "pg_type": "numeric" }
                    ]
                }]
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();
        resolve(&config).unwrap()
    }

    fn with_table<T>(f: impl FnOnce(TableRef<'_>) -> T) -> T {
        let registry = registry();
        let entity = registry.entities().next().unwrap();
        f(TableRef::new("public", "product", entity))
    }

    #[test]
    fn test_select_list_with_filters_sort_and_fk_scope() {
        with_table(|t| {
            let list = ListQuery {
                filters: vec![("title".into(), Value::from("x"))],
                sort: Some(("title".into(), SortDir::Desc)),
                limit: 5000,
                offset: 10,
            };
            let scope = Scope::ForeignKey {
                column: "category_id",
                parent_id: 3,
            };
            let q = select_list(&t, &scope, &list);
            assert_eq!(
                q.sql,
                "SELECT row_to_json(main) AS \"row\" FROM \"public\".\"product\" main \
                 WHERE main.\"category_id\" = $1 AND main.\"title\"::text = $2 \
                 ORDER BY main.\"title\" DESC, main.\"id\" LIMIT 1000 OFFSET 10"
            );
            assert_eq!(q.params, vec![Value::from(3), Value::from("x")]);
        });
    }

    #[test]
    fn test_select_by_id_in_pivot_scope() {
        with_table(|t| {
            let scope = Scope::Pivot {
                pivot_table: "product_tag",
                foreign_pivot_key: "tag_id",
                related_pivot_key: "product_id",
                parent_id: 9,
            };
            let q = select_by_id(&t, 4, &scope);
            assert_eq!(
                q.sql,
                "SELECT row_to_json(main) AS \"row\" FROM \"public\".\"product\" main \
                 WHERE main.\"id\" = $1 AND EXISTS (SELECT 1 FROM \"public\".\"product_tag\" pivot \
                 WHERE pivot.\"tag_id\" = $2 AND pivot.\"product_id\" = main.\"id\")"
            );
            assert_eq!(q.params, vec![Value::from(4), Value::from(9)]);
        });
    }

    #[test]
    fn test_insert_casts_declared_types() {
        with_table(|t| {
            let mut body = BTreeMap::new();
            body.insert("price".to_string(), Value::from("9.50"));
            body.insert("title".to_string(), Value::from("Lamp"));
            let q = insert(&t, &body);
            assert_eq!(
                q.sql,
                "INSERT INTO \"public\".\"product\" AS main (\"price\", \"title\") VALUES ($1::numeric, $2) \
                 RETURNING row_to_json(main) AS \"row\""
            );
        });
    }

    #[test]
    fn test_insert_empty_body_uses_defaults() {
        with_table(|t| {
            let q = insert(&t, &BTreeMap::new());
            assert!(q.sql.contains("DEFAULT VALUES"));
            assert!(q.params.is_empty());
        });
    }

    #[test]
    fn test_update_skips_primary_key_and_scopes() {
        with_table(|t| {
            let mut body = BTreeMap::new();
            body.insert("id".to_string(), Value::from(99));
            body.insert("title".to_string(), Value::from("New"));
            let scope = Scope::ForeignKey {
                column: "category_id",
                parent_id: 3,
            };
            let q = update(&t, 7, &body, &scope);
            assert_eq!(
                q.sql,
                "UPDATE \"public\".\"product\" AS main SET \"title\" = $1 \
                 WHERE main.\"id\" = $2 AND main.\"category_id\" = $3 RETURNING row_to_json(main) AS \"row\""
            );
            assert_eq!(q.params, vec![Value::from("New"), Value::from(7), Value::from(3)]);
        });
    }

    #[test]
    fn test_update_without_columns_is_select() {
        with_table(|t| {
            let q = update(&t, 7, &BTreeMap::new(), &Scope::All);
            assert!(q.sql.starts_with("SELECT row_to_json(main)"));
        });
    }

    #[test]
    fn test_attach_is_idempotent_insert() {
        let p = PivotRef {
            schema: "public",
            pivot_table: "product_tag",
            foreign_pivot_key: "product_id",
            related_pivot_key: "tag_id",
        };
        let q = attach(&p, 1, 2);
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"product_tag\" (\"product_id\", \"tag_id\") SELECT $1, $2"));
        assert!(q.sql.contains("WHERE NOT EXISTS"));
        let q = detach(&p, 1, 2);
        assert_eq!(
            q.sql,
            "DELETE FROM \"public\".\"product_tag\" WHERE \"product_id\" = $1 AND \"tag_id\" = $2"
        );
    }

    #[test]
    fn test_filters_cast_only_declared_types() {
        with_table(|t| {
            let list = ListQuery {
                filters: vec![
                    ("id".into(), Value::from("abc")),
                    ("price".into(), Value::from("9.50")),
                    ("sku".into(), Value::from("123")),
                ],
                ..ListQuery::default()
            };
            let q = select_list(&t, &Scope::All, &list);
            assert_eq!(
                q.sql,
                "SELECT row_to_json(main) AS \"row\" FROM \"public\".\"product\" main \
                 WHERE main.\"id\"::text = $1 AND main.\"price\" = $2::numeric AND main.\"sku\"::text = $3 \
                 ORDER BY main.\"id\" LIMIT 100 OFFSET 0"
            );
            assert_eq!(q.params, vec![Value::from("abc"), Value::from("9.50"), Value::from("123")]);
        });
    }

    #[test]
    fn test_quoted_escapes_quotes() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }
}
