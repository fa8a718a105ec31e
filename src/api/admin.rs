//! Moderation API endpoints
//!
//! JSON API for admins, mounted under `/api/admin`:
//! - GET /{model} - listing with `q`, `is_published`, `category` and `page`
//! - POST /{model} - create a category or a location
//! - PATCH /{model}/{id} - in-place edit of `list_editable` fields
//! - DELETE /{model}/{id} - delete a row
//!
//! `{model}` is the singular or plural model name (`post` or `posts`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateCategoryInput, CreateLocationInput, PageInfo};
use crate::services::{find_model, AdminListRequest, ServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{model}", get(list_rows).post(create_row))
        .route("/{model}/{id}", patch(update_row).delete(delete_row))
}

/// Response for a listing
#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub model: &'static str,
    pub list_editable: &'static [&'static str],
    pub items: Vec<Map<String, Value>>,
    pub page: PageInfo,
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound => ApiError::not_found("Not found"),
            ServiceError::Validation(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid input",
                serde_json::to_value(&errors).unwrap_or(Value::Null),
            ),
            ServiceError::Internal(e) => {
                tracing::error!("Moderation request failed: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// GET /api/admin/{model}
async fn list_rows(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    Query(request): Query<AdminListRequest>,
) -> Result<Json<AdminListResponse>, ApiError> {
    let model = find_model(&model_name).ok_or_else(|| ApiError::not_found("Unknown model"))?;
    let rows = state.admin_service.list(model.name, &request).await?;

    Ok(Json(AdminListResponse {
        model: model.name,
        list_editable: model.list_editable,
        page: rows.page_info(),
        items: rows.items,
    }))
}

/// POST /api/admin/{model} - only categories and locations can be created here
async fn create_row(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(model_name): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let model = find_model(&model_name).ok_or_else(|| ApiError::not_found("Unknown model"))?;

    let created = match model.name {
        "category" => {
            let input: CreateCategoryInput = parse_body(body)?;
            serde_json::to_value(state.admin_service.create_category(input).await?)
        }
        "location" => {
            let input: CreateLocationInput = parse_body(body)?;
            serde_json::to_value(state.admin_service.create_location(input).await?)
        }
        _ => {
            return Err(ApiError::new(
                "METHOD_NOT_ALLOWED",
                format!("{} rows cannot be created here", model.name),
            ))
        }
    }
    .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::debug!(admin_id = user.id, model = model.name, "Row created");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// PATCH /api/admin/{model}/{id}
async fn update_row(
    State(state): State<AppState>,
    Path((model_name, id)): Path<(String, i64)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<StatusCode, ApiError> {
    state.admin_service.patch(&model_name, id, &changes).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/{model}/{id}
async fn delete_row(
    State(state): State<AppState>,
    Path((model_name, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    state.admin_service.delete(&model_name, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::validation_error(e.to_string()))
}
