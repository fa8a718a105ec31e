//! Shared HTML response types
//!
//! Handlers render pages through [`PageContext`] and fail with [`PageError`].
//! A `PageError` only marks its response; [`render_error_pages`] turns the
//! marked response into the 404/403/500 page so that errors raised anywhere
//! (extractors, middleware, the router fallback) look the same.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, AuthenticatedUser, CrossOriginRejected};
use crate::services::{ServiceError, UserServiceError};
use crate::theme::{StandardTemplateVars, ThemeEngine};

/// Everything needed to render a page for the current request
#[derive(Clone)]
pub struct PageContext {
    theme: Arc<ThemeEngine>,
    vars: StandardTemplateVars,
}

impl PageContext {
    pub fn new(theme: Arc<ThemeEngine>, vars: StandardTemplateVars) -> Self {
        Self { theme, vars }
    }

    /// Render `template` with status 200
    pub fn render(&self, template: &str, context: &TeraContext) -> Response {
        self.render_with_status(StatusCode::OK, template, context)
    }

    pub fn render_with_status(
        &self,
        status: StatusCode,
        template: &str,
        context: &TeraContext,
    ) -> Response {
        let html = self
            .theme
            .render_with_fallback(template, context, &self.vars);
        (status, Html(html)).into_response()
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|authenticated| &authenticated.0);
        let vars = StandardTemplateVars::new(state.site.name.clone(), parts.uri.path())
            .with_user(user);
        Ok(Self::new(state.theme_engine.clone(), vars))
    }
}

/// A request that ends on an error page
#[derive(Debug)]
pub enum PageError {
    NotFound,
    Internal(anyhow::Error),
}

/// Marker left on responses produced by [`PageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorPage {
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorPage {
    fn template(self) -> &'static str {
        match self {
            ErrorPage::NotFound => "pages/404.html",
            ErrorPage::Forbidden => "pages/403csrf.html",
            ErrorPage::Internal => "pages/500.html",
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, page) = match self {
            PageError::NotFound => (StatusCode::NOT_FOUND, ErrorPage::NotFound),
            PageError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorPage::Internal)
            }
        };
        let mut response = status.into_response();
        response.extensions_mut().insert(page);
        response
    }
}

impl From<ServiceError> for PageError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound => PageError::NotFound,
            ServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled validation failure: {}", errors))
            }
            ServiceError::Internal(e) => PageError::Internal(e),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => PageError::Internal(e),
            other => PageError::Internal(anyhow::anyhow!("Unhandled user error: {}", other)),
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(e: anyhow::Error) -> Self {
        PageError::Internal(e)
    }
}

pub type PageResult<T = Response> = Result<T, PageError>;

/// Replace marked error responses with the rendered error page
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let page = match PageContext::from_request_parts(&mut parts, &state).await {
        Ok(page) => page,
        Err(never) => match never {},
    };
    let response = next.run(Request::from_parts(parts, body)).await;

    let marker = if response.extensions().get::<CrossOriginRejected>().is_some() {
        Some(ErrorPage::Forbidden)
    } else {
        response.extensions().get::<ErrorPage>().copied()
    };
    match marker {
        Some(error_page) => {
            page.render_with_status(response.status(), error_page.template(), &TeraContext::new())
        }
        None => response,
    }
}

/// 303 redirect after a successful form submission
pub fn see_other(location: &str) -> Response {
    Redirect::to(location).into_response()
}

/// 303 redirect that also sets (or clears) the session cookie
pub fn see_other_with_cookie(location: &str, cookie: HeaderValue) -> Response {
    let mut response = see_other(location);
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    response
}

/// Router fallback
pub async fn not_found() -> PageError {
    PageError::NotFound
}
