//! Fixtures shared by repository and service tests

use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::Post;
use chrono::{DateTime, Utc};

/// In-memory SQLite pool with all migrations applied
pub async fn migrated_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

pub async fn insert_user(pool: &DynDatabasePool, username: &str) -> i64 {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, '', '', 'hash', 'author', ?, ?)
        "#,
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(now)
    .bind(now)
    .execute(pool.as_sqlite().expect("SQLite test pool"))
    .await
    .expect("Failed to create test user")
    .last_insert_rowid()
}

pub async fn insert_category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> i64 {
    sqlx::query(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(format!("Category {}", slug))
    .bind("Description")
    .bind(slug)
    .bind(is_published)
    .bind(Utc::now())
    .execute(pool.as_sqlite().expect("SQLite test pool"))
    .await
    .expect("Failed to create test category")
    .last_insert_rowid()
}

pub async fn insert_location(pool: &DynDatabasePool, name: &str, is_published: bool) -> i64 {
    sqlx::query("INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(is_published)
        .bind(Utc::now())
        .execute(pool.as_sqlite().expect("SQLite test pool"))
        .await
        .expect("Failed to create test location")
        .last_insert_rowid()
}

pub async fn insert_comment(
    pool: &DynDatabasePool,
    post_id: i64,
    author_id: i64,
    is_published: bool,
) -> i64 {
    sqlx::query(
        "INSERT INTO comments (text, is_published, created_at, author_id, post_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("A comment")
    .bind(is_published)
    .bind(Utc::now())
    .bind(author_id)
    .bind(post_id)
    .execute(pool.as_sqlite().expect("SQLite test pool"))
    .await
    .expect("Failed to create test comment")
    .last_insert_rowid()
}

/// Unsaved published post
pub fn new_post(
    author_id: i64,
    category_id: Option<i64>,
    location_id: Option<i64>,
    pub_date: DateTime<Utc>,
) -> Post {
    Post {
        id: 0,
        title: "A post".to_string(),
        text: "Some text".to_string(),
        pub_date,
        is_published: true,
        created_at: Utc::now(),
        author_id,
        location_id,
        category_id,
        image: None,
    }
}
