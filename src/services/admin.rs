//! Moderation service
//!
//! Each moderated model is registered once in [`ADMIN_MODELS`]: which columns
//! the listing shows, which of them may be edited in place, which are
//! searched and which can be filtered on. Listings go through the generic
//! [`AdminRepository`]; edits and deletes go through the typed repositories.

use crate::db::repositories::{
    AdminColumn, AdminListQuery, AdminRepository, AdminTable, CategoryRepository, ColumnKind,
    CommentRepository, FilterValue, LocationRepository, PostRepository,
};
use crate::models::{
    Category, CreateCategoryInput, CreateLocationInput, ListParams, Location, PagedResult,
};
use crate::services::error::{FieldErrors, ServiceError, ServiceResult};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Rows per moderation page
pub const ADMIN_PAGE_SIZE: u32 = 20;

/// Shown in place of a missing value
pub const EMPTY_VALUE_DISPLAY: &str = "Not set";

const NAME_MAX_LEN: usize = 256;

static SLUG_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Location,
    Category,
    Post,
    Comment,
}

/// How a list filter parameter is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Bool,
    Id,
}

/// A `list_filter` entry: query parameter, SQL expression, value kind
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub param: &'static str,
    pub expr: &'static str,
    pub kind: FilterKind,
}

/// Registration of one moderated model
#[derive(Debug)]
pub struct AdminModel {
    pub kind: ModelKind,
    pub name: &'static str,
    pub plural: &'static str,
    pub table: AdminTable,
    pub list_editable: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub list_filter: &'static [ListFilter],
}

const IS_PUBLISHED_FILTER: ListFilter = ListFilter {
    param: "is_published",
    expr: "t.is_published",
    kind: FilterKind::Bool,
};

pub static ADMIN_MODELS: [AdminModel; 4] = [
    AdminModel {
        kind: ModelKind::Location,
        name: "location",
        plural: "locations",
        table: AdminTable {
            from: "locations t",
            columns: &[
                AdminColumn { name: "id", expr: "t.id", kind: ColumnKind::Int },
                AdminColumn { name: "name", expr: "t.name", kind: ColumnKind::Text },
                AdminColumn { name: "is_published", expr: "t.is_published", kind: ColumnKind::Bool },
                AdminColumn { name: "created_at", expr: "t.created_at", kind: ColumnKind::Timestamp },
            ],
        },
        list_editable: &["is_published"],
        search_fields: &["t.name"],
        list_filter: &[IS_PUBLISHED_FILTER],
    },
    AdminModel {
        kind: ModelKind::Category,
        name: "category",
        plural: "categories",
        table: AdminTable {
            from: "categories t",
            columns: &[
                AdminColumn { name: "id", expr: "t.id", kind: ColumnKind::Int },
                AdminColumn { name: "title", expr: "t.title", kind: ColumnKind::Text },
                AdminColumn { name: "slug", expr: "t.slug", kind: ColumnKind::Text },
                AdminColumn { name: "is_published", expr: "t.is_published", kind: ColumnKind::Bool },
                AdminColumn { name: "created_at", expr: "t.created_at", kind: ColumnKind::Timestamp },
            ],
        },
        list_editable: &["is_published"],
        search_fields: &["t.title", "t.slug"],
        list_filter: &[IS_PUBLISHED_FILTER],
    },
    AdminModel {
        kind: ModelKind::Post,
        name: "post",
        plural: "posts",
        table: AdminTable {
            from: "posts t \
                   JOIN users u ON u.id = t.author_id \
                   LEFT JOIN locations loc ON loc.id = t.location_id \
                   LEFT JOIN categories cat ON cat.id = t.category_id",
            columns: &[
                AdminColumn { name: "id", expr: "t.id", kind: ColumnKind::Int },
                AdminColumn { name: "title", expr: "t.title", kind: ColumnKind::Text },
                AdminColumn { name: "pub_date", expr: "t.pub_date", kind: ColumnKind::Timestamp },
                AdminColumn { name: "is_published", expr: "t.is_published", kind: ColumnKind::Bool },
                AdminColumn { name: "author", expr: "u.username", kind: ColumnKind::Text },
                AdminColumn { name: "location", expr: "loc.name", kind: ColumnKind::Text },
                AdminColumn { name: "category", expr: "cat.title", kind: ColumnKind::Text },
                AdminColumn { name: "category_id", expr: "t.category_id", kind: ColumnKind::Int },
                AdminColumn { name: "created_at", expr: "t.created_at", kind: ColumnKind::Timestamp },
            ],
        },
        list_editable: &["is_published", "category"],
        search_fields: &["t.title", "u.username", "loc.name"],
        list_filter: &[
            IS_PUBLISHED_FILTER,
            ListFilter {
                param: "category",
                expr: "t.category_id",
                kind: FilterKind::Id,
            },
        ],
    },
    AdminModel {
        kind: ModelKind::Comment,
        name: "comment",
        plural: "comments",
        table: AdminTable {
            from: "comments t \
                   JOIN users u ON u.id = t.author_id \
                   JOIN posts p ON p.id = t.post_id",
            columns: &[
                AdminColumn { name: "id", expr: "t.id", kind: ColumnKind::Int },
                AdminColumn { name: "text", expr: "t.text", kind: ColumnKind::Text },
                AdminColumn { name: "author", expr: "u.username", kind: ColumnKind::Text },
                AdminColumn { name: "post", expr: "p.title", kind: ColumnKind::Text },
                AdminColumn { name: "is_published", expr: "t.is_published", kind: ColumnKind::Bool },
                AdminColumn { name: "created_at", expr: "t.created_at", kind: ColumnKind::Timestamp },
            ],
        },
        list_editable: &["is_published"],
        search_fields: &["t.text", "u.username", "p.title"],
        list_filter: &[IS_PUBLISHED_FILTER],
    },
];

/// Look a model up by singular or plural name
pub fn find_model(name: &str) -> Option<&'static AdminModel> {
    ADMIN_MODELS
        .iter()
        .find(|model| model.name == name || model.plural == name)
}

/// Query parameters of a listing request, as received
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AdminListRequest {
    pub q: Option<String>,
    pub is_published: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
}

impl AdminListRequest {
    fn filter_value(&self, param: &str) -> Option<&str> {
        let raw = match param {
            "is_published" => self.is_published.as_deref(),
            "category" => self.category.as_deref(),
            _ => None,
        };
        raw.map(str::trim).filter(|value| !value.is_empty())
    }
}

pub struct AdminService {
    admin_repo: Arc<dyn AdminRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl AdminService {
    pub fn new(
        admin_repo: Arc<dyn AdminRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            admin_repo,
            category_repo,
            location_repo,
            post_repo,
            comment_repo,
        }
    }

    /// One page of rows, newest first, with search and filters applied
    pub async fn list(
        &self,
        model_name: &str,
        request: &AdminListRequest,
    ) -> ServiceResult<PagedResult<Map<String, Value>>> {
        let model = find_model(model_name).ok_or(ServiceError::NotFound)?;
        let query = build_query(model, request)?;

        let total = self
            .admin_repo
            .count(&model.table, &query)
            .await
            .context("Failed to count moderation rows")?;
        let params =
            ListParams::from_query(request.page.as_deref(), ADMIN_PAGE_SIZE).clamp_to(total);
        let rows = self
            .admin_repo
            .list(&model.table, &query, &params)
            .await
            .context("Failed to list moderation rows")?;

        let items = rows.into_iter().map(fill_empty_values).collect();
        Ok(PagedResult::new(items, total, &params))
    }

    /// Apply in-place edits; only `list_editable` fields are accepted
    pub async fn patch(
        &self,
        model_name: &str,
        id: i64,
        changes: &Map<String, Value>,
    ) -> ServiceResult<()> {
        let model = find_model(model_name).ok_or(ServiceError::NotFound)?;

        let mut errors = FieldErrors::new();
        if changes.is_empty() {
            errors.add("__all__", "No fields to update.");
        }
        for field in changes.keys() {
            if !model.list_editable.contains(&field.as_str()) {
                errors.add(field, "This field is not editable.");
            }
        }
        let is_published = match changes.get("is_published") {
            None => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(_) => {
                errors.add("is_published", "Must be true or false.");
                None
            }
        };
        let category = match changes.get("category") {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => {
                let found = match value.as_i64() {
                    Some(category_id) => self.category_exists(category_id).await?.then_some(category_id),
                    None => None,
                };
                if found.is_none() {
                    errors.add("category", "Select a valid choice.");
                }
                found.map(Some)
            }
        };
        errors.into_result()?;

        let mut found = true;
        if let Some(flag) = is_published {
            found &= self.set_published(model.kind, id, flag).await?;
        }
        if let Some(category_id) = category {
            found &= self
                .post_repo
                .set_category(id, category_id)
                .await
                .context("Failed to update post category")?;
        }
        if !found {
            return Err(ServiceError::NotFound);
        }

        tracing::info!(model = model.name, id, "Moderation edit applied");
        Ok(())
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> ServiceResult<Category> {
        let mut errors = FieldErrors::new();
        let title = input.title.trim().to_string();
        let slug = input.slug.trim().to_string();
        require_name("title", &title, &mut errors);
        if input.description.trim().is_empty() {
            errors.add("description", "This field is required.");
        }
        if slug.is_empty() {
            errors.add("slug", "This field is required.");
        } else if !SLUG_RE.as_ref().is_some_and(|re| re.is_match(&slug)) {
            errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        } else if self
            .category_repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check slug")?
            .is_some()
        {
            errors.add("slug", "Category with this slug already exists.");
        }
        errors.into_result()?;

        let mut category = Category::new(title, input.description.trim().to_string(), slug);
        category.is_published = input.is_published;
        let created = self
            .category_repo
            .create(&category)
            .await
            .context("Failed to create category")?;
        tracing::info!(category_id = created.id, slug = %created.slug, "Category created");
        Ok(created)
    }

    pub async fn create_location(&self, input: CreateLocationInput) -> ServiceResult<Location> {
        let mut errors = FieldErrors::new();
        let name = input.name.trim().to_string();
        require_name("name", &name, &mut errors);
        errors.into_result()?;

        let mut location = Location::new(name);
        location.is_published = input.is_published;
        let created = self
            .location_repo
            .create(&location)
            .await
            .context("Failed to create location")?;
        tracing::info!(location_id = created.id, "Location created");
        Ok(created)
    }

    pub async fn delete(&self, model_name: &str, id: i64) -> ServiceResult<()> {
        let model = find_model(model_name).ok_or(ServiceError::NotFound)?;
        let deleted = match model.kind {
            ModelKind::Location => self.location_repo.delete(id).await,
            ModelKind::Category => self.category_repo.delete(id).await,
            ModelKind::Post => self.post_repo.delete(id).await,
            ModelKind::Comment => self.comment_repo.delete(id).await,
        }
        .context("Failed to delete row")?;

        if !deleted {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(model = model.name, id, "Row deleted by moderator");
        Ok(())
    }

    async fn set_published(&self, kind: ModelKind, id: i64, flag: bool) -> ServiceResult<bool> {
        let updated = match kind {
            ModelKind::Location => self.location_repo.set_published(id, flag).await,
            ModelKind::Category => self.category_repo.set_published(id, flag).await,
            ModelKind::Post => self.post_repo.set_published(id, flag).await,
            ModelKind::Comment => self.comment_repo.set_published(id, flag).await,
        }
        .context("Failed to update moderation flag")?;
        Ok(updated)
    }

    async fn category_exists(&self, id: i64) -> ServiceResult<bool> {
        let found = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?;
        Ok(found.is_some())
    }
}

fn build_query(model: &AdminModel, request: &AdminListRequest) -> ServiceResult<AdminListQuery> {
    let mut query = AdminListQuery::default();
    let mut errors = FieldErrors::new();

    if let Some(term) = request.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query.search = Some((model.search_fields.to_vec(), term.to_string()));
    }

    for filter in model.list_filter {
        let Some(raw) = request.filter_value(filter.param) else {
            continue;
        };
        let value = match filter.kind {
            FilterKind::Bool => parse_bool(raw).map(FilterValue::Bool),
            FilterKind::Id => raw.parse::<i64>().ok().map(FilterValue::Int),
        };
        match value {
            Some(value) => query.filters.push((filter.expr, value)),
            None => errors.add(filter.param, "Invalid filter value."),
        }
    }

    errors.into_result()?;
    Ok(query)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn fill_empty_values(mut row: Map<String, Value>) -> Map<String, Value> {
    for value in row.values_mut() {
        if value.is_null() {
            *value = Value::from(EMPTY_VALUE_DISPLAY);
        }
    }
    row
}

fn require_name(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if value.chars().count() > NAME_MAX_LEN {
        errors.add(field, "Ensure this value has at most 256 characters.");
    }
}
