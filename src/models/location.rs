//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic tag attached to posts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Location {
    /// Create a new published Location. The ID is assigned by the database.
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            is_published: true,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating a location through the moderation API
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationInput {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

fn default_true() -> bool {
    true
}

/// Location fields carried alongside a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            is_published: location.is_published,
        }
    }
}
