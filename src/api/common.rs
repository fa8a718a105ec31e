//! Common handler utilities and shared types

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::responses::PageError;
use crate::models::{ListParams, PagedResult, POSTS_PER_PAGE};

/// Path parameters of a page; a malformed id is a missing page
#[derive(Debug)]
pub struct PagePath<T>(pub T);

impl<T, S> FromRequestParts<S> for PagePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PagePath(value))
            .map_err(|_| PageError::NotFound)
    }
}

/// `?page=` of the feed pages, kept raw so garbage falls back to page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn list_params(&self) -> ListParams {
        ListParams::from_query(self.page.as_deref(), POSTS_PER_PAGE)
    }
}

/// Put a page of items into the template context as `posts` and `page`
pub fn insert_page<T: Serialize>(context: &mut TeraContext, result: &PagedResult<T>) {
    context.insert("posts", &result.items);
    context.insert("page", &result.page_info());
}

/// Accept only local redirect targets.
///
/// Anything that could leave the site (`//host`, `http://…`, `/\host`)
/// falls back to `/`.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\") =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Path of a profile page
pub fn profile_path(username: &str) -> String {
    format!("/profile/{}", urlencoding::encode(username))
}

/// Path of a post detail page
pub fn post_path(post_id: i64) -> String {
    format!("/posts/{}", post_id)
}
