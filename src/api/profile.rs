//! Profile pages
//!
//! - GET /profile/{username} - the author's posts; the owner also sees
//!   unpublished and scheduled ones
//! - GET/POST /edit_profile - edit the viewer's own account

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Form, Router,
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::api::common::{insert_page, profile_path, PagePath, PageQuery};
use crate::api::middleware::{AppState, LoginRequired, Viewer};
use crate::api::responses::{see_other, PageContext, PageResult};
use crate::models::ProfileInput;
use crate::services::{FieldErrors, UserServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}", get(profile))
        .route("/edit_profile", get(edit_profile_form).post(edit_profile))
}

/// GET /profile/{username}
async fn profile(
    State(state): State<AppState>,
    page: PageContext,
    viewer: Viewer,
    PagePath(username): PagePath<String>,
    Query(query): Query<PageQuery>,
) -> PageResult {
    let feed = state
        .feed_service
        .list_profile_feed(&username, viewer.user(), query.list_params(), Utc::now())
        .await?;
    let is_owner = viewer.user().is_some_and(|user| user.id == feed.profile.id);

    let mut context = TeraContext::new();
    context.insert("profile", &feed.profile);
    context.insert("profile_name", &feed.profile.display_name());
    context.insert("is_owner", &is_owner);
    insert_page(&mut context, &feed.posts);
    Ok(page.render("blog/profile.html", &context))
}

/// GET /edit_profile
async fn edit_profile_form(page: PageContext, LoginRequired(user): LoginRequired) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("form", &ProfileInput::from(&user));
    context.insert("errors", &FieldErrors::new());
    Ok(page.render("blog/user.html", &context))
}

/// POST /edit_profile - on success go to the (possibly renamed) profile
async fn edit_profile(
    State(state): State<AppState>,
    page: PageContext,
    LoginRequired(user): LoginRequired,
    Form(form): Form<ProfileInput>,
) -> PageResult {
    match state.user_service.update_profile(&user, form.clone()).await {
        Ok(updated) => Ok(see_other(&profile_path(&updated.username))),
        Err(UserServiceError::ValidationError(errors)) => {
            let mut context = TeraContext::new();
            context.insert("form", &form);
            context.insert("errors", &errors);
            Ok(page.render_with_status(StatusCode::BAD_REQUEST, "blog/user.html", &context))
        }
        Err(e) => Err(e.into()),
    }
}
