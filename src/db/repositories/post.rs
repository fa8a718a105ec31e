//! Post repository
//!
//! Database operations for posts, including the paginated feed queries.
//!
//! Feed rows are joined with their author, category and location and carry
//! the number of published comments. The public predicate
//! ([`PUBLIC_POST_PREDICATE`]) is the SQL rendition of
//! `services::visibility::is_publicly_visible`; the two must agree.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{
    AuthorSummary, CategorySummary, ListParams, LocationSummary, Post, PostWithMeta,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::database::HasArguments;
use sqlx::query::Query;
use sqlx::{Database, Encode, Row, Type};
use std::sync::Arc;

/// Public visibility as a SQL condition over `posts p`, `categories cat` and
/// `locations loc` (both LEFT JOINed). Binds one parameter: the current time.
///
/// A missing category or location yields NULL, which never satisfies `= 1`.
pub const PUBLIC_POST_PREDICATE: &str =
    "p.is_published = 1 AND p.pub_date <= ? AND cat.is_published = 1 AND loc.is_published = 1";

const POST_JOINS: &str = r#"
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories cat ON cat.id = p.category_id
    LEFT JOIN locations loc ON loc.id = p.location_id
"#;

const SELECT_POST_META: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.is_published, p.created_at,
           p.author_id, p.location_id, p.category_id, p.image,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           cat.title AS category_title,
           cat.slug AS category_slug,
           cat.is_published AS category_is_published,
           loc.name AS location_name,
           loc.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments c
             WHERE c.post_id = p.id AND c.is_published = 1) AS comment_count
"#;

const SELECT_POST: &str = r#"
    SELECT id, title, text, pub_date, is_published, created_at,
           author_id, location_id, category_id, image
    FROM posts
"#;

const INSERT_POST: &str = r#"
    INSERT INTO posts (title, text, pub_date, is_published, created_at,
                       author_id, location_id, category_id, image)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title = ?, text = ?, pub_date = ?, is_published = ?,
        location_id = ?, category_id = ?, image = ?
    WHERE id = ?
"#;

/// Which posts a feed query covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Restrict to posts publicly visible at this instant
    pub visible_at: Option<DateTime<Utc>>,
    /// Restrict to one category
    pub category_id: Option<i64>,
    /// Restrict to one author
    pub author_id: Option<i64>,
}

impl PostFilter {
    /// Posts anyone may see at `now`
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            visible_at: Some(now),
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn by_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    fn where_clause(&self) -> String {
        let mut conditions = Vec::new();
        if self.visible_at.is_some() {
            conditions.push(PUBLIC_POST_PREDICATE);
        }
        if self.category_id.is_some() {
            conditions.push("p.category_id = ?");
        }
        if self.author_id.is_some() {
            conditions.push("p.author_id = ?");
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }
}

/// Bind the filter parameters in the order `where_clause` emits them
fn bind_filter<'q, DB>(
    mut query: Query<'q, DB, <DB as HasArguments<'q>>::Arguments>,
    filter: &PostFilter,
) -> Query<'q, DB, <DB as HasArguments<'q>>::Arguments>
where
    DB: Database,
    DateTime<Utc>: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
{
    if let Some(now) = filter.visible_at {
        query = query.bind(now);
    }
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(author_id) = filter.author_id {
        query = query.bind(author_id);
    }
    query
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post; `id` on the input is ignored
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get a bare post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post by ID only if `author_id` wrote it
    async fn get_by_id_and_author(&self, id: i64, author_id: i64) -> Result<Option<Post>>;

    /// Get a post joined with author, category, location and comment count
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Save editable fields; author and `created_at` never change
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Set the moderation flag; returns false if the row does not exist
    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    /// Re-link a post to another category (or none)
    async fn set_category(&self, id: i64, category_id: Option<i64>) -> Result<bool>;

    /// Delete a post and, by cascade, its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count posts matching the filter
    async fn count(&self, filter: &PostFilter) -> Result<i64>;

    /// One page of posts matching the filter, newest `pub_date` first
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<Vec<PostWithMeta>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn execute_update(&self, sql: &str, context: &'static str, binds: UpdateBinds) -> Result<u64> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = match binds {
                    UpdateBinds::Flag(flag, id) => sqlx::query(sql).bind(flag).bind(id),
                    UpdateBinds::Link(link, id) => sqlx::query(sql).bind(link).bind(id),
                    UpdateBinds::Id(id) => sqlx::query(sql).bind(id),
                };
                query.execute(sqlite(&self.pool)?).await.context(context)?.rows_affected()
            }
            DatabaseDriver::Mysql => {
                let query = match binds {
                    UpdateBinds::Flag(flag, id) => sqlx::query(sql).bind(flag).bind(id),
                    UpdateBinds::Link(link, id) => sqlx::query(sql).bind(link).bind(id),
                    UpdateBinds::Id(id) => sqlx::query(sql).bind(id),
                };
                query.execute(mysql(&self.pool)?).await.context(context)?.rows_affected()
            }
        };
        Ok(affected)
    }
}

enum UpdateBinds {
    Flag(bool, i64),
    Link(Option<i64>, i64),
    Id(i64),
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_POST)
                .bind(&post.title)
                .bind(&post.text)
                .bind(post.pub_date)
                .bind(post.is_published)
                .bind(post.created_at)
                .bind(post.author_id)
                .bind(post.location_id)
                .bind(post.category_id)
                .bind(&post.image)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(INSERT_POST)
                .bind(&post.title)
                .bind(&post.text)
                .bind(post.pub_date)
                .bind(post.is_published)
                .bind(post.created_at)
                .bind(post.author_id)
                .bind(post.location_id)
                .bind(post.category_id)
                .bind(&post.image)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        Ok(Post {
            id,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE id = ?", SELECT_POST);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get post by ID")?;
                Ok(row.as_ref().map(row_to_post_mysql))
            }
        }
    }

    async fn get_by_id_and_author(&self, id: i64, author_id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE id = ? AND author_id = ?", SELECT_POST);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(author_id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get post by ID and author")?;
                Ok(row.as_ref().map(row_to_post_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(author_id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get post by ID and author")?;
                Ok(row.as_ref().map(row_to_post_mysql))
            }
        }
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!("{} {} WHERE p.id = ?", SELECT_POST_META, POST_JOINS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get post details")?;
                Ok(row.as_ref().map(row_to_post_meta_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get post details")?;
                Ok(row.as_ref().map(row_to_post_meta_mysql))
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(UPDATE_POST)
                    .bind(&post.title)
                    .bind(&post.text)
                    .bind(post.pub_date)
                    .bind(post.is_published)
                    .bind(post.location_id)
                    .bind(post.category_id)
                    .bind(&post.image)
                    .bind(post.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(UPDATE_POST)
                    .bind(&post.title)
                    .bind(&post.text)
                    .bind(post.pub_date)
                    .bind(post.is_published)
                    .bind(post.location_id)
                    .bind(post.category_id)
                    .bind(&post.image)
                    .bind(post.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update post")?;
            }
        }
        Ok(post.clone())
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let affected = self
            .execute_update(
                "UPDATE posts SET is_published = ? WHERE id = ?",
                "Failed to update post moderation flag",
                UpdateBinds::Flag(is_published, id),
            )
            .await?;
        Ok(affected > 0)
    }

    async fn set_category(&self, id: i64, category_id: Option<i64>) -> Result<bool> {
        let affected = self
            .execute_update(
                "UPDATE posts SET category_id = ? WHERE id = ?",
                "Failed to update post category",
                UpdateBinds::Link(category_id, id),
            )
            .await?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .execute_update(
                "DELETE FROM posts WHERE id = ?",
                "Failed to delete post",
                UpdateBinds::Id(id),
            )
            .await?;
        Ok(affected > 0)
    }

    async fn count(&self, filter: &PostFilter) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories cat ON cat.id = p.category_id \
             LEFT JOIN locations loc ON loc.id = p.location_id {}",
            filter.where_clause()
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = bind_filter(sqlx::query(&sql), filter)
                    .fetch_one(sqlite(&self.pool)?)
                    .await
                    .context("Failed to count posts")?;
                Ok(row.get(0))
            }
            DatabaseDriver::Mysql => {
                let row = bind_filter(sqlx::query(&sql), filter)
                    .fetch_one(mysql(&self.pool)?)
                    .await
                    .context("Failed to count posts")?;
                Ok(row.get(0))
            }
        }
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<Vec<PostWithMeta>> {
        let sql = format!(
            "{} {} {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
            SELECT_POST_META,
            POST_JOINS,
            filter.where_clause()
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = bind_filter(sqlx::query(&sql), filter)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(sqlite(&self.pool)?)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_meta_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = bind_filter(sqlx::query(&sql), filter)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(mysql(&self.pool)?)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_meta_mysql).collect())
            }
        }
    }
}

// ============================================================================
// SQLite row mapping
// ============================================================================

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
    }
}

fn row_to_post_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> PostWithMeta {
    let post = row_to_post_sqlite(row);
    let author = AuthorSummary {
        id: post.author_id,
        username: row.get("author_username"),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
    };
    let category = post.category_id.map(|id| CategorySummary {
        id,
        title: row.get("category_title"),
        slug: row.get("category_slug"),
        is_published: row.get("category_is_published"),
    });
    let location = post.location_id.map(|id| LocationSummary {
        id,
        name: row.get("location_name"),
        is_published: row.get("location_is_published"),
    });

    PostWithMeta {
        post,
        author,
        category,
        location,
        comment_count: row.get("comment_count"),
    }
}

// ============================================================================
// MySQL row mapping
// ============================================================================

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        author_id: row.get("author_id"),
        location_id: row.get("location_id"),
        category_id: row.get("category_id"),
        image: row.get("image"),
    }
}

fn row_to_post_meta_mysql(row: &sqlx::mysql::MySqlRow) -> PostWithMeta {
    let post = row_to_post_mysql(row);
    let author = AuthorSummary {
        id: post.author_id,
        username: row.get("author_username"),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
    };
    let category = post.category_id.map(|id| CategorySummary {
        id,
        title: row.get("category_title"),
        slug: row.get("category_slug"),
        is_published: row.get("category_is_published"),
    });
    let location = post.location_id.map(|id| LocationSummary {
        id,
        name: row.get("location_name"),
        is_published: row.get("location_is_published"),
    });

    PostWithMeta {
        post,
        author,
        category,
        location,
        comment_count: row.get("comment_count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    #[test]
    fn test_where_clause_composition() {
        assert_eq!(PostFilter::default().where_clause(), "");
        assert_eq!(
            PostFilter::default().by_author(1).where_clause(),
            "WHERE p.author_id = ?"
        );
        let clause = PostFilter::public(Utc::now()).in_category(2).by_author(3).where_clause();
        assert!(clause.starts_with("WHERE p.is_published = 1"));
        assert!(clause.ends_with("p.category_id = ? AND p.author_id = ?"));
    }

    #[tokio::test]
    async fn test_create_get_update_post() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let category = insert_category(&pool, "travel", true).await;

        let mut post = repo
            .create(&new_post(author, Some(category), None, Utc::now()))
            .await
            .expect("Failed to create post");
        assert!(post.id > 0);

        post.title = "Edited".to_string();
        post.image = Some("posts/a.png".to_string());
        repo.update(&post).await.expect("Failed to update post");

        let found = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Edited");
        assert_eq!(found.image.as_deref(), Some("posts/a.png"));
        assert_eq!(found.author_id, author);
    }

    #[tokio::test]
    async fn test_get_by_id_and_author() {
        let (pool, repo) = setup().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let post = repo.create(&new_post(alice, None, None, Utc::now())).await.unwrap();

        assert!(repo.get_by_id_and_author(post.id, alice).await.unwrap().is_some());
        assert!(repo.get_by_id_and_author(post.id, bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_meta_includes_relations_and_published_comment_count() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Paris", false).await;
        let post = repo
            .create(&new_post(author, Some(category), Some(location), Utc::now()))
            .await
            .unwrap();

        insert_comment(&pool, post.id, author, true).await;
        insert_comment(&pool, post.id, author, true).await;
        insert_comment(&pool, post.id, author, false).await;

        let meta = repo.get_with_meta(post.id).await.unwrap().unwrap();
        assert_eq!(meta.author.username, "alice");
        assert_eq!(meta.category.as_ref().unwrap().slug, "travel");
        assert_eq!(meta.location.as_ref().unwrap().name, "Paris");
        assert!(!meta.location.as_ref().unwrap().is_published);
        assert_eq!(meta.comment_count, 2);
    }

    #[tokio::test]
    async fn test_public_filter_hides_future_and_unlinked_posts() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Paris", true).await;
        let now = Utc::now();

        let visible = repo
            .create(&new_post(author, Some(category), Some(location), now - Duration::hours(1)))
            .await
            .unwrap();
        repo.create(&new_post(author, Some(category), Some(location), now + Duration::hours(1)))
            .await
            .unwrap();
        repo.create(&new_post(author, None, Some(location), now - Duration::hours(1)))
            .await
            .unwrap();
        repo.create(&new_post(author, Some(category), None, now - Duration::hours(1)))
            .await
            .unwrap();

        let filter = PostFilter::public(now);
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        let items = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].post.id, visible.id);

        let own = PostFilter::default().by_author(author);
        assert_eq!(repo.count(&own).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_list_orders_by_pub_date_desc_and_paginates() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let base = Utc::now() - Duration::days(30);

        for day in 0..12 {
            repo.create(&new_post(author, None, None, base + Duration::days(day)))
                .await
                .unwrap();
        }

        let filter = PostFilter::default().by_author(author);
        let first = repo.list(&filter, &ListParams::new(1, 10)).await.unwrap();
        let second = repo.list(&filter, &ListParams::new(2, 10)).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 2);
        assert!(first
            .windows(2)
            .all(|pair| pair[0].post.pub_date >= pair[1].post.pub_date));
        assert!(first[9].post.pub_date > second[0].post.pub_date);
    }

    #[tokio::test]
    async fn test_deleting_category_and_location_nulls_links() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Paris", true).await;
        let post = repo
            .create(&new_post(author, Some(category), Some(location), Utc::now()))
            .await
            .unwrap();

        let sqlite_pool = pool.as_sqlite().unwrap();
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category)
            .execute(sqlite_pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(location)
            .execute(sqlite_pool)
            .await
            .unwrap();

        let found = repo.get_by_id(post.id).await.unwrap().expect("post must survive");
        assert_eq!(found.category_id, None);
        assert_eq!(found.location_id, None);
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_to_comments() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let post = repo.create(&new_post(author, None, None, Utc::now())).await.unwrap();
        insert_comment(&pool, post.id, author, true).await;
        insert_comment(&pool, post.id, author, false).await;

        assert!(repo.delete(post.id).await.unwrap());
        assert!(!repo.delete(post.id).await.unwrap());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post.id)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_moderation_updates() {
        let (pool, repo) = setup().await;
        let author = insert_user(&pool, "alice").await;
        let category = insert_category(&pool, "travel", true).await;
        let post = repo.create(&new_post(author, None, None, Utc::now())).await.unwrap();

        assert!(repo.set_published(post.id, false).await.unwrap());
        assert!(repo.set_category(post.id, Some(category)).await.unwrap());

        let found = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert!(!found.is_published);
        assert_eq!(found.category_id, Some(category));
        assert!(!repo.set_published(9999, true).await.unwrap());
    }
}
