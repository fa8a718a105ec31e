//! Visibility rules for posts and comments
//!
//! A post is public when it is published, its `pub_date` has passed and both
//! its category and its location exist and are published. A missing link
//! counts as unpublished. Authors always see their own posts.
//!
//! The feeds evaluate the public branch in SQL
//! ([`crate::db::repositories::PUBLIC_POST_PREDICATE`]); the tests below keep
//! both renditions in agreement.

use crate::models::{Comment, PostWithMeta, User};
use chrono::{DateTime, Utc};

/// Whether `viewer` may see `post` at `now`
pub fn is_post_visible(post: &PostWithMeta, viewer: Option<&User>, now: DateTime<Utc>) -> bool {
    if viewer.is_some_and(|user| user.id == post.post.author_id) {
        return true;
    }
    is_publicly_visible(post, now)
}

/// Whether anyone at all may see `post` at `now`
pub fn is_publicly_visible(post: &PostWithMeta, now: DateTime<Utc>) -> bool {
    post.post.is_published
        && post.post.pub_date <= now
        && post.category.as_ref().is_some_and(|c| c.is_published)
        && post.location.as_ref().is_some_and(|l| l.is_published)
}

/// Comments are shown iff published, whoever is looking
pub fn is_comment_visible(comment: &Comment) -> bool {
    comment.is_published
}
