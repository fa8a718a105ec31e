//! Comment pages
//!
//! Every successful action goes back to the post. Editing and deleting
//! somebody else's comment, or a comment under another post, is a 404.
//! A rejected comment is shown again on the comment page, for any existing
//! post.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::common::{post_path, PagePath};
use crate::api::middleware::{AppState, LoginRequired};
use crate::api::responses::{see_other, PageContext, PageResult};
use crate::models::{Comment, CommentForm};
use crate::services::{FieldErrors, ServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comment", post(add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}",
            get(edit_comment_form).post(edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}",
            get(delete_comment_form).post(delete_comment),
        )
}

/// POST /posts/{id}/comment
async fn add_comment(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath(post_id): PagePath<i64>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    match state
        .comment_service
        .create_or_update_comment(post_id, None, &form, &user)
        .await
    {
        Ok(_) => Ok(see_other(&post_path(post_id))),
        Err(ServiceError::Validation(errors)) => Ok(render_comment_page(
            &page,
            StatusCode::BAD_REQUEST,
            "create",
            post_id,
            None,
            &form,
            &errors,
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit_comment/{comment_id}
async fn edit_comment_form(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath((post_id, comment_id)): PagePath<(i64, i64)>,
) -> PageResult {
    let comment = state
        .comment_service
        .get_comment_for_owner(post_id, comment_id, &user)
        .await?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    Ok(render_comment_page(&page, StatusCode::OK, "edit", post_id, Some(&comment), &form, &FieldErrors::new()))
}

/// POST /posts/{id}/edit_comment/{comment_id}
async fn edit_comment(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath((post_id, comment_id)): PagePath<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    match state
        .comment_service
        .create_or_update_comment(post_id, Some(comment_id), &form, &user)
        .await
    {
        Ok(_) => Ok(see_other(&post_path(post_id))),
        Err(ServiceError::Validation(errors)) => {
            let comment = state
                .comment_service
                .get_comment_for_owner(post_id, comment_id, &user)
                .await?;
            Ok(render_comment_page(&page, StatusCode::BAD_REQUEST, "edit", post_id, Some(&comment), &form, &errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete_comment/{comment_id} - confirmation page
async fn delete_comment_form(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath((post_id, comment_id)): PagePath<(i64, i64)>,
) -> PageResult {
    let comment = state
        .comment_service
        .get_comment_for_owner(post_id, comment_id, &user)
        .await?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    Ok(render_comment_page(&page, StatusCode::OK, "delete", post_id, Some(&comment), &form, &FieldErrors::new()))
}

/// POST /posts/{id}/delete_comment/{comment_id}
async fn delete_comment(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    PagePath((post_id, comment_id)): PagePath<(i64, i64)>,
) -> PageResult {
    state
        .comment_service
        .delete_comment(post_id, comment_id, &user)
        .await?;
    Ok(see_other(&post_path(post_id)))
}

fn render_comment_page(
    page: &PageContext,
    status: StatusCode,
    mode: &str,
    post_id: i64,
    comment: Option<&Comment>,
    form: &CommentForm,
    errors: &FieldErrors,
) -> axum::response::Response {
    let mut context = TeraContext::new();
    context.insert("mode", mode);
    context.insert("post_id", &post_id);
    if let Some(comment) = comment {
        context.insert("comment", comment);
    }
    context.insert("form", form);
    context.insert("errors", errors);
    page.render_with_status(status, "blog/comment.html", &context)
}
