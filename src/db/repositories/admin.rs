//! Moderation listing repository
//!
//! A single query builder serves every moderated table. Each table is
//! described by a static [`AdminTable`]: the `FROM` clause (with joins), the
//! displayed columns and their value kinds. Rows come back as JSON objects
//! keyed by column name.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::ListParams;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::Row;
use std::sync::Arc;

/// Value kind of a displayed column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    Bool,
    Timestamp,
}

/// A displayed column: output name, SQL expression, kind
#[derive(Debug, Clone, Copy)]
pub struct AdminColumn {
    pub name: &'static str,
    pub expr: &'static str,
    pub kind: ColumnKind,
}

/// Static description of a moderated table
#[derive(Debug)]
pub struct AdminTable {
    /// `FROM` clause; the main table is aliased `t`
    pub from: &'static str,
    pub columns: &'static [AdminColumn],
}

/// A value bound into a listing filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
}

/// Search and filter conditions for one listing request
#[derive(Debug, Clone, Default)]
pub struct AdminListQuery {
    /// Case-insensitive substring search over these expressions
    pub search: Option<(Vec<&'static str>, String)>,
    /// Exact-match filters: (SQL expression, value)
    pub filters: Vec<(&'static str, FilterValue)>,
}

enum Bind {
    Text(String),
    Bool(bool),
    Int(i64),
}

impl AdminListQuery {
    fn where_clause(&self) -> (String, Vec<Bind>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some((exprs, term)) = &self.search {
            if !exprs.is_empty() {
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                let alternatives: Vec<String> = exprs
                    .iter()
                    .map(|expr| format!("LOWER({}) LIKE ? ESCAPE '!'", expr))
                    .collect();
                conditions.push(format!("({})", alternatives.join(" OR ")));
                binds.extend(exprs.iter().map(|_| Bind::Text(pattern.clone())));
            }
        }

        for (expr, value) in &self.filters {
            conditions.push(format!("{} = ?", expr));
            binds.push(match value {
                FilterValue::Bool(flag) => Bind::Bool(*flag),
                FilterValue::Int(id) => Bind::Int(*id),
            });
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, binds)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// Moderation listing repository trait
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Count rows of `table` matching `query`
    async fn count(&self, table: &AdminTable, query: &AdminListQuery) -> Result<i64>;

    /// One page of rows, newest ID first
    async fn list(
        &self,
        table: &AdminTable,
        query: &AdminListQuery,
        params: &ListParams,
    ) -> Result<Vec<Map<String, Value>>>;
}

/// SQLx-based moderation listing repository
pub struct SqlxAdminRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! bind_all {
    ($query:expr, $binds:expr) => {{
        let mut query = $query;
        for bind in $binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Bool(flag) => query.bind(flag),
                Bind::Int(id) => query.bind(id),
            };
        }
        query
    }};
}

#[async_trait]
impl AdminRepository for SqlxAdminRepository {
    async fn count(&self, table: &AdminTable, query: &AdminListQuery) -> Result<i64> {
        let (where_clause, binds) = query.where_clause();
        let sql = format!("SELECT COUNT(*) FROM {} {}", table.from, where_clause);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = bind_all!(sqlx::query(&sql), binds)
                    .fetch_one(sqlite(&self.pool)?)
                    .await
                    .context("Failed to count moderation rows")?;
                Ok(row.get(0))
            }
            DatabaseDriver::Mysql => {
                let row = bind_all!(sqlx::query(&sql), binds)
                    .fetch_one(mysql(&self.pool)?)
                    .await
                    .context("Failed to count moderation rows")?;
                Ok(row.get(0))
            }
        }
    }

    async fn list(
        &self,
        table: &AdminTable,
        query: &AdminListQuery,
        params: &ListParams,
    ) -> Result<Vec<Map<String, Value>>> {
        let (where_clause, binds) = query.where_clause();
        let select: Vec<String> = table
            .columns
            .iter()
            .map(|column| column.expr.to_string())
            .collect();
        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY t.id DESC LIMIT ? OFFSET ?",
            select.join(", "),
            table.from,
            where_clause
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_all!(sqlx::query(&sql), binds)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list moderation rows")?;
                rows.iter()
                    .map(|row| row_to_json_sqlite(row, table.columns))
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = bind_all!(sqlx::query(&sql), binds)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list moderation rows")?;
                rows.iter()
                    .map(|row| row_to_json_mysql(row, table.columns))
                    .collect()
            }
        }
    }
}

fn row_to_json_sqlite(
    row: &sqlx::sqlite::SqliteRow,
    columns: &[AdminColumn],
) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for (idx, column) in columns.iter().enumerate() {
        let value = match column.kind {
            ColumnKind::Int => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
            ColumnKind::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::from),
            ColumnKind::Bool => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|ts| Value::from(ts.to_rfc3339())),
        };
        object.insert(column.name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(object)
}

fn row_to_json_mysql(
    row: &sqlx::mysql::MySqlRow,
    columns: &[AdminColumn],
) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for (idx, column) in columns.iter().enumerate() {
        let value = match column.kind {
            ColumnKind::Int => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
            ColumnKind::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::from),
            ColumnKind::Bool => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|ts| Value::from(ts.to_rfc3339())),
        };
        object.insert(column.name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::*;

    static LOCATIONS: AdminTable = AdminTable {
        from: "locations t",
        columns: &[
            AdminColumn { name: "id", expr: "t.id", kind: ColumnKind::Int },
            AdminColumn { name: "name", expr: "t.name", kind: ColumnKind::Text },
            AdminColumn { name: "is_published", expr: "t.is_published", kind: ColumnKind::Bool },
            AdminColumn { name: "created_at", expr: "t.created_at", kind: ColumnKind::Timestamp },
        ],
    };

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off!"), "50!%!_off!!");
    }

    #[tokio::test]
    async fn test_search_and_filter() {
        let pool = migrated_pool().await;
        insert_location(&pool, "Paris", true).await;
        insert_location(&pool, "Parma", false).await;
        insert_location(&pool, "Berlin", true).await;
        let repo = SqlxAdminRepository::new(pool);

        let search = AdminListQuery {
            search: Some((vec!["t.name"], "PAR".to_string())),
            filters: vec![],
        };
        assert_eq!(repo.count(&LOCATIONS, &search).await.unwrap(), 2);

        let filtered = AdminListQuery {
            search: Some((vec!["t.name"], "par".to_string())),
            filters: vec![("t.is_published", FilterValue::Bool(true))],
        };
        let rows = repo
            .list(&LOCATIONS, &filtered, &ListParams::new(1, 20))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Paris");
        assert_eq!(rows[0]["is_published"], true);
        assert!(rows[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_literal_wildcards() {
        let pool = migrated_pool().await;
        insert_location(&pool, "First", true).await;
        insert_location(&pool, "100% Second", true).await;
        let repo = SqlxAdminRepository::new(pool);

        let rows = repo
            .list(&LOCATIONS, &AdminListQuery::default(), &ListParams::new(1, 20))
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], "100% Second");
        assert_eq!(rows[1]["name"], "First");

        let percent = AdminListQuery {
            search: Some((vec!["t.name"], "%".to_string())),
            filters: vec![],
        };
        assert_eq!(repo.count(&LOCATIONS, &percent).await.unwrap(), 1);
    }
}
