//! HTTP middleware and extractors
//!
//! Contains:
//! - Session resolution (the `session` cookie, or a bearer token for the JSON API)
//! - Viewer extractors for pages that are open to everyone or need a login
//! - Admin authorization for the moderation API
//! - Rejection of cross-origin form posts

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Config, SessionConfig, SiteConfig, UploadConfig};
use crate::db::repositories::{
    SqlxAdminRepository, SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository,
    SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Session, User};
use crate::services::{
    AdminService, CommentService, FeedService, PostService, UserService,
};
use crate::theme::ThemeEngine;

/// Name of the login cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub feed_service: Arc<FeedService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub admin_service: Arc<AdminService>,
    pub theme_engine: Arc<ThemeEngine>,
    pub upload_config: Arc<UploadConfig>,
    pub site: Arc<SiteConfig>,
    pub session_config: Arc<SessionConfig>,
}

impl AppState {
    /// Wire repositories, services and the template engine onto `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let location_repo = SqlxLocationRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let admin_repo = SqlxAdminRepository::boxed(pool.clone());
        let upload_config = Arc::new(config.upload.clone());

        let user_service = UserService::with_session_expiration(
            user_repo.clone(),
            session_repo,
            config.session.expiration_days,
        );
        let feed_service = FeedService::new(
            post_repo.clone(),
            category_repo.clone(),
            user_repo,
            comment_repo.clone(),
        );
        let post_service = PostService::new(
            post_repo.clone(),
            category_repo.clone(),
            location_repo.clone(),
            upload_config.clone(),
        );
        let comment_service = CommentService::new(comment_repo.clone(), post_repo.clone());
        let admin_service = AdminService::new(
            admin_repo,
            category_repo,
            location_repo,
            post_repo,
            comment_repo,
        );
        let theme_engine = ThemeEngine::new(config.templates.path.as_deref())?;

        Ok(Self {
            pool,
            user_service: Arc::new(user_service),
            feed_service: Arc::new(feed_service),
            post_service: Arc::new(post_service),
            comment_service: Arc::new(comment_service),
            admin_service: Arc::new(admin_service),
            theme_engine: Arc::new(theme_engine),
            upload_config,
            site: Arc::new(config.site.clone()),
            session_config: Arc::new(config.session.clone()),
        })
    }

    /// `Set-Cookie` value carrying a fresh session
    pub fn session_cookie(&self, session: &Session) -> HeaderValue {
        let max_age = self.user_service.session_lifetime().num_seconds().max(0);
        let secure = if self.session_config.cookie_secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            SESSION_COOKIE, session.id, max_age, secure
        );
        // Session ids are hex, so this never fails
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_session_cookie())
    }
}

/// `Set-Cookie` value deleting the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Logged-in user resolved by [`optional_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Whoever is looking at the page, if logged in
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Logged-in user for pages behind the login form.
///
/// Anonymous visitors are redirected to `/auth/login?next=<path>`.
#[derive(Debug, Clone)]
pub struct LoginRequired(pub User);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|authenticated| authenticated.0.clone()),
        ))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for LoginRequired {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(authenticated) => Ok(LoginRequired(authenticated.0.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&format!(
                    "/auth/login?next={}",
                    urlencoding::encode(next)
                )))
            }
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for the JSON API
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract the session token: a bearer token first, then the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("session="))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolve the viewer on every request.
///
/// Unknown or expired sessions leave the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Admin authorization middleware for the moderation API
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// Marker left on a response rejected by [`reject_cross_origin`]
#[derive(Debug, Clone, Copy)]
pub struct CrossOriginRejected;

/// Reject state-changing requests whose `Origin` (or `Referer`) names
/// another host than the one being addressed.
pub async fn reject_cross_origin(request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) || is_same_origin(request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "Rejected cross-origin request"
    );
    let mut response = StatusCode::FORBIDDEN.into_response();
    response.extensions_mut().insert(CrossOriginRejected);
    response
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn is_same_origin(headers: &HeaderMap) -> bool {
    let source = headers
        .get(header::ORIGIN)
        .or_else(|| headers.get(header::REFERER))
        .and_then(|value| value.to_str().ok());
    let Some(source) = source else {
        // Non-browser clients send neither header
        return true;
    };
    let Some(host) = headers.get(header::HOST).and_then(|value| value.to_str().ok()) else {
        return false;
    };

    let authority = source
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(source)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    authority.eq_ignore_ascii_case(host)
}
