//! Location repository
//!
//! Deleting a location clears `location_id` on its posts (`ON DELETE SET NULL`).

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::Location;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, location: &Location) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List all locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;

    /// Set the moderation flag; returns false if the row does not exist
    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    /// Delete a location; returns false if the row does not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_LOCATION: &str = "SELECT id, name, is_published, created_at FROM locations";

const INSERT_LOCATION: &str =
    "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)";

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, location: &Location) -> Result<Location> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_LOCATION)
                .bind(&location.name)
                .bind(location.is_published)
                .bind(location.created_at)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create location")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_LOCATION)
                .bind(&location.name)
                .bind(location.is_published)
                .bind(location.created_at)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create location")?
                .last_insert_id() as i64,
        };

        Ok(Location {
            id,
            ..location.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let sql = format!("{} WHERE id = ?", SELECT_LOCATION);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get location by ID")?;
                Ok(row.as_ref().map(row_to_location_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get location by ID")?;
                Ok(row.as_ref().map(row_to_location_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Location>> {
        let sql = format!("{} ORDER BY name, id", SELECT_LOCATION);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list locations")?;
                Ok(rows.iter().map(row_to_location_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list locations")?;
                Ok(rows.iter().map(row_to_location_mysql).collect())
            }
        }
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let sql = "UPDATE locations SET is_published = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to update location")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to update location")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM locations WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Location {
    Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxLocationRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxLocationRepository::new(pool)
    }

    #[tokio::test]
    async fn test_location_crud() {
        let repo = setup_test_repo().await;

        let berlin = repo.create(&Location::new("Berlin".into())).await.unwrap();
        repo.create(&Location::new("Amsterdam".into())).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Amsterdam", "Berlin"]);

        assert!(repo.set_published(berlin.id, false).await.unwrap());
        assert!(!repo.get_by_id(berlin.id).await.unwrap().unwrap().is_published);

        assert!(repo.delete(berlin.id).await.unwrap());
        assert!(repo.get_by_id(berlin.id).await.unwrap().is_none());
    }
}
