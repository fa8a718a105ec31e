//! Category model
//!
//! Thematic grouping of posts, addressed publicly by its slug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier (latin letters, digits, hyphen, underscore)
    pub slug: String,
    /// Moderation flag; hidden categories hide their posts too
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new published Category. The ID is assigned by the database.
    pub fn new(title: String, description: String, slug: String) -> Self {
        Self {
            id: 0,
            title,
            description,
            slug,
            is_published: true,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a category through the moderation API
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

fn default_true() -> bool {
    true
}

/// Category fields carried alongside a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

impl From<&Category> for CategorySummary {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            title: category.title.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published,
        }
    }
}
