//! Post pages
//!
//! - GET / - global feed
//! - GET /posts/{id} - post detail with comments
//! - GET/POST /posts/create - new post (login required)
//! - GET/POST /posts/{id}/edit - edit own post; others are sent back to the post
//! - GET/POST /posts/{id}/delete - confirm and delete own post

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::api::common::{insert_page, post_path, profile_path, PagePath, PageQuery};
use crate::api::middleware::{AppState, LoginRequired, Viewer};
use crate::api::responses::{see_other, PageContext, PageResult};
use crate::api::upload::read_post_form;
use crate::models::{CommentForm, Post, PostForm};
use crate::services::{FieldErrors, ServiceError, UpdateOutcome};

/// Build the post router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/posts/create", get(create_form).post(create))
        .route("/posts/{id}", get(detail))
        .route("/posts/{id}/edit", get(edit_form).post(edit))
        .route("/posts/{id}/delete", get(delete_form).post(delete))
}

/// GET / - publicly visible posts, newest first
async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let posts = state
        .feed_service
        .list_global_feed(query.list_params(), Utc::now())
        .await?;

    let mut context = TeraContext::new();
    insert_page(&mut context, &posts);
    Ok(page.render("blog/index.html", &context))
}

/// GET /posts/{id}
async fn detail(
    State(state): State<AppState>,
    page: PageContext,
    viewer: Viewer,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    let detail = state
        .feed_service
        .get_post_detail(id, viewer.user(), Utc::now())
        .await?;

    let mut context = TeraContext::new();
    context.insert("post", &detail.post);
    context.insert("comments", &detail.comments);
    context.insert("form", &CommentForm::default());
    context.insert("errors", &FieldErrors::new());
    Ok(page.render("blog/detail.html", &context))
}

/// GET /posts/create
async fn create_form(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(_user): LoginRequired,
) -> PageResult {
    render_post_form(&state, &page, StatusCode::OK, "create", &PostForm::default(), &FieldErrors::new(), None).await
}

/// POST /posts/create - on success go to the author's profile
async fn create(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    multipart: Multipart,
) -> PageResult {
    let (form, image) = read_post_form(multipart).await?;
    match state.post_service.create_post(&user, &form, image).await {
        Ok(_) => Ok(see_other(&profile_path(&user.username))),
        Err(ServiceError::Validation(errors)) => {
            render_post_form(&state, &page, StatusCode::BAD_REQUEST, "create", &form, &errors, None).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit
async fn edit_form(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    match state.post_service.get_post_for_edit(id, &user).await? {
        UpdateOutcome::Allowed(post) => {
            let form = PostForm::from(&post);
            render_post_form(&state, &page, StatusCode::OK, "edit", &form, &FieldErrors::new(), Some(&post)).await
        }
        UpdateOutcome::Redirect { post_id } => Ok(see_other(&post_path(post_id))),
    }
}

/// POST /posts/{id}/edit - on success go to the post
async fn edit(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath(id): PagePath<i64>,
    multipart: Multipart,
) -> PageResult {
    let (form, image) = read_post_form(multipart).await?;
    match state.post_service.update_post(id, &user, &form, image).await {
        Ok(UpdateOutcome::Allowed(post)) => Ok(see_other(&post_path(post.id))),
        Ok(UpdateOutcome::Redirect { post_id }) => Ok(see_other(&post_path(post_id))),
        Err(ServiceError::Validation(errors)) => {
            // The form re-renders against the stored post for its image state
            let post = match state.post_service.get_post_for_edit(id, &user).await? {
                UpdateOutcome::Allowed(post) => post,
                UpdateOutcome::Redirect { post_id } => return Ok(see_other(&post_path(post_id))),
            };
            render_post_form(&state, &page, StatusCode::BAD_REQUEST, "edit", &form, &errors, Some(&post)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete - confirmation page
async fn delete_form(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    let post = state.post_service.get_post_for_delete(id, &user).await?;

    let mut context = TeraContext::new();
    context.insert("mode", "delete");
    context.insert("form", &PostForm::from(&post));
    context.insert("errors", &FieldErrors::new());
    context.insert("post", &post);
    Ok(page.render("blog/create.html", &context))
}

/// POST /posts/{id}/delete - on success go to the author's profile
async fn delete(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    state.post_service.delete_post(id, &user).await?;
    Ok(see_other(&profile_path(&user.username)))
}

async fn render_post_form(
    state: &AppState,
    page: &PageContext,
    status: StatusCode,
    mode: &str,
    form: &PostForm,
    errors: &FieldErrors,
    post: Option<&Post>,
) -> PageResult<Response> {
    let choices = state.post_service.form_choices().await?;

    let mut context = TeraContext::new();
    context.insert("mode", mode);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", &choices.categories);
    context.insert("locations", &choices.locations);
    if let Some(post) = post {
        context.insert("post", post);
    }
    Ok(page.render_with_status(status, "blog/create.html", &context))
}
