//! Comment repository
//!
//! Comments are looked up either by ID alone (moderation) or by the
//! `(id, post, author)` triple used for owner-only edits and deletes.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{AuthorSummary, Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment; `id` on the input is ignored
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Find a comment only if it belongs to `post_id` and was written by `author_id`
    async fn get_owned(&self, id: i64, post_id: i64, author_id: i64) -> Result<Option<Comment>>;

    async fn update_text(&self, id: i64, text: &str) -> Result<bool>;

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Published comments of a post, oldest first
    async fn list_published_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_comment(&self, sql: &str, binds: &[i64]) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = query.bind(*value);
                }
                let row = query
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_sqlite))
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql);
                for value in binds {
                    query = query.bind(*value);
                }
                let row = query
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_mysql))
            }
        }
    }
}

const SELECT_COMMENT: &str =
    "SELECT id, text, is_published, created_at, author_id, post_id FROM comments";

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (text, is_published, created_at, author_id, post_id)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_PUBLISHED_FOR_POST: &str = r#"
    SELECT c.id, c.text, c.is_published, c.created_at, c.author_id, c.post_id,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name
    FROM comments c
    JOIN users u ON u.id = c.author_id
    WHERE c.post_id = ? AND c.is_published = 1
    ORDER BY c.created_at ASC, c.id ASC
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_COMMENT)
                .bind(&comment.text)
                .bind(comment.is_published)
                .bind(comment.created_at)
                .bind(comment.author_id)
                .bind(comment.post_id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_COMMENT)
                .bind(&comment.text)
                .bind(comment.is_published)
                .bind(comment.created_at)
                .bind(comment.author_id)
                .bind(comment.post_id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE id = ?", SELECT_COMMENT);
        self.fetch_one_comment(&sql, &[id]).await
    }

    async fn get_owned(&self, id: i64, post_id: i64, author_id: i64) -> Result<Option<Comment>> {
        let sql = format!(
            "{} WHERE id = ? AND post_id = ? AND author_id = ?",
            SELECT_COMMENT
        );
        self.fetch_one_comment(&sql, &[id, post_id, author_id]).await
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<bool> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to update comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let sql = "UPDATE comments SET is_published = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to update comment moderation flag")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to update comment moderation flag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_published_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(SELECT_PUBLISHED_FOR_POST)
                    .bind(post_id)
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: row_to_comment_sqlite(row),
                        author: AuthorSummary {
                            id: row.get("author_id"),
                            username: row.get("author_username"),
                            first_name: row.get("author_first_name"),
                            last_name: row.get("author_last_name"),
                        },
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(SELECT_PUBLISHED_FOR_POST)
                    .bind(post_id)
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: row_to_comment_mysql(row),
                        author: AuthorSummary {
                            id: row.get("author_id"),
                            username: row.get("author_username"),
                            first_name: row.get("author_first_name"),
                            last_name: row.get("author_last_name"),
                        },
                    })
                    .collect())
            }
        }
    }
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        post_id: row.get("post_id"),
    }
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        post_id: row.get("post_id"),
    }
}
