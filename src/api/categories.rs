//! Category feed page

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::api::common::{insert_page, PagePath, PageQuery};
use crate::api::middleware::AppState;
use crate::api::responses::{PageContext, PageResult};

pub fn router() -> Router<AppState> {
    Router::new().route("/category/{slug}", get(category_posts))
}

/// GET /category/{slug} - 404 for unknown and unpublished categories
async fn category_posts(
    State(state): State<AppState>,
    page: PageContext,
    PagePath(slug): PagePath<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let feed = state
        .feed_service
        .list_category_feed(&slug, query.list_params(), Utc::now())
        .await?;

    let mut context = TeraContext::new();
    context.insert("category", &feed.category);
    insert_page(&mut context, &feed.posts);
    Ok(page.render("blog/category.html", &context))
}
