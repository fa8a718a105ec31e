//! Post model
//!
//! A post belongs to its author and optionally links a category and a
//! location. Both links are nullable: deleting the category or location
//! clears the link instead of deleting the post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategorySummary, LocationSummary};

/// Format used by `<input type="datetime-local">`
pub const PUB_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Publication time; a future value schedules the post
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Stored image path relative to the upload directory
    pub image: Option<String>,
}

/// Author fields carried alongside posts and comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Post joined with its author, category, location and published comment count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub category: Option<CategorySummary>,
    pub location: Option<LocationSummary>,
    /// Number of published comments
    pub comment_count: i64,
}

/// What to do with a post's image on save
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(String),
    Clear,
}

/// Validated post fields, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub image: ImageChange,
}

/// Raw post form as submitted by the browser
///
/// Kept as strings so a failed submission can be re-rendered verbatim.
/// `is_published` is not part of it: only moderators hide or show a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub clear_image: bool,
}

impl Default for PostForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            pub_date: Utc::now().format(PUB_DATE_FORMAT).to_string(),
            category: String::new(),
            location: String::new(),
            clear_image: false,
        }
    }
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(PUB_DATE_FORMAT).to_string(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            clear_image: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_form_from_post_uses_datetime_local_format() {
        let post = Post {
            id: 1,
            title: "T".into(),
            text: "body".into(),
            pub_date: Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap(),
            is_published: false,
            created_at: Utc::now(),
            author_id: 1,
            location_id: None,
            category_id: Some(7),
            image: None,
        };

        let form = PostForm::from(&post);
        assert_eq!(form.pub_date, "2024-03-05T14:30");
        assert_eq!(form.category, "7");
        assert_eq!(form.location, "");
    }

    #[test]
    fn test_post_with_meta_serializes_flat() {
        let meta = PostWithMeta {
            post: Post {
                id: 3,
                title: "Hello".into(),
                text: "World".into(),
                pub_date: Utc::now(),
                is_published: true,
                created_at: Utc::now(),
                author_id: 1,
                location_id: None,
                category_id: None,
                image: None,
            },
            author: AuthorSummary {
                id: 1,
                username: "alice".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
            category: None,
            location: None,
            comment_count: 2,
        };

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["author"]["username"], "alice");
        assert_eq!(value["comment_count"], 2);
        assert!(value["category"].is_null());
    }
}
