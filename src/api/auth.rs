//! Authentication pages
//!
//! - GET/POST /auth/login - login form; success sets the `session` cookie
//!   and goes to `next`
//! - GET/POST /auth/registration - sign-up form; the new account is logged
//!   in straight away (the very first account becomes admin)
//! - POST /auth/logout - drop the session and clear the cookie

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::common::safe_next;
use crate::api::middleware::{clear_session_cookie, extract_session_token, AppState};
use crate::api::responses::{see_other_with_cookie, PageContext, PageResult};
use crate::models::RegisterInput;
use crate::services::{FieldErrors, LoginInput, UserServiceError};

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_form).post(login))
        .route("/auth/registration", get(registration_form).post(register))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form fields
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// GET /auth/login
async fn login_form(page: PageContext, Query(query): Query<NextQuery>) -> PageResult {
    Ok(render_login(&page, StatusCode::OK, None, &safe_next(query.next.as_deref()), ""))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    page: PageContext,
    Form(body): Form<LoginRequest>,
) -> PageResult {
    let next = safe_next(body.next.as_deref());
    let input = LoginInput {
        username: body.username.clone(),
        password: body.password,
    };

    match state.user_service.login(input).await {
        Ok(session) => {
            tracing::info!(user_id = session.user_id, "User logged in");
            Ok(see_other_with_cookie(&next, state.session_cookie(&session)))
        }
        Err(UserServiceError::AuthenticationError(message)) => Ok(render_login(
            &page,
            StatusCode::BAD_REQUEST,
            Some(&message),
            &next,
            &body.username,
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/registration
async fn registration_form(page: PageContext) -> PageResult {
    Ok(render_registration(&page, StatusCode::OK, "", "", &FieldErrors::new()))
}

/// POST /auth/registration
async fn register(
    State(state): State<AppState>,
    page: PageContext,
    Form(input): Form<RegisterInput>,
) -> PageResult {
    let (username, email) = (input.username.clone(), input.email.clone());

    match state.user_service.register(input).await {
        Ok(user) => {
            let session = state.user_service.start_session(user.id).await?;
            Ok(see_other_with_cookie("/", state.session_cookie(&session)))
        }
        Err(UserServiceError::ValidationError(errors)) => Ok(render_registration(
            &page,
            StatusCode::BAD_REQUEST,
            &username,
            &email,
            &errors,
        )),
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok(see_other_with_cookie("/", clear_session_cookie()))
}

fn render_login(
    page: &PageContext,
    status: StatusCode,
    error: Option<&str>,
    next: &str,
    username: &str,
) -> axum::response::Response {
    let mut context = TeraContext::new();
    context.insert("error", &error);
    context.insert("next", next);
    context.insert("username", username);
    page.render_with_status(status, "registration/login.html", &context)
}

fn render_registration(
    page: &PageContext,
    status: StatusCode,
    username: &str,
    email: &str,
    errors: &FieldErrors,
) -> axum::response::Response {
    // Passwords are never echoed back
    let form = serde_json::json!({ "username": username, "email": email });

    let mut context = TeraContext::new();
    context.insert("form", &form);
    context.insert("errors", errors);
    page.render_with_status(status, "registration/registration_form.html", &context)
}
