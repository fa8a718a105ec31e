//! Static pages

use axum::{routing::get, Router};
use tera::Context as TeraContext;

use crate::api::middleware::AppState;
use crate::api::responses::{PageContext, PageResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pages/about", get(about))
        .route("/pages/rules", get(rules))
}

async fn about(page: PageContext) -> PageResult {
    Ok(page.render("pages/about.html", &TeraContext::new()))
}

async fn rules(page: PageContext) -> PageResult {
    Ok(page.render("pages/rules.html", &TeraContext::new()))
}
