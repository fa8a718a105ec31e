//! Feed service
//!
//! Paginated post listings (global, per category, per author) and the post
//! detail view. Every listed post carries its published comment count.

use crate::db::repositories::{
    CategoryRepository, CommentRepository, PostFilter, PostRepository, UserRepository,
};
use crate::models::{Category, CommentWithAuthor, ListParams, PagedResult, PostWithMeta, User};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::visibility::{is_comment_visible, is_post_visible};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Posts of one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryFeed {
    pub category: Category,
    pub posts: PagedResult<PostWithMeta>,
}

/// Posts of one author
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFeed {
    pub profile: User,
    pub posts: PagedResult<PostWithMeta>,
}

/// A post with its visible comments, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostWithMeta,
    pub comments: Vec<CommentWithAuthor>,
}

pub struct FeedService {
    post_repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    user_repo: Arc<dyn UserRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl FeedService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        user_repo: Arc<dyn UserRepository>,
        comment_repo: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            user_repo,
            comment_repo,
        }
    }

    /// Publicly visible posts, newest first. Authors get no bypass here.
    pub async fn list_global_feed(
        &self,
        requested: ListParams,
        now: DateTime<Utc>,
    ) -> ServiceResult<PagedResult<PostWithMeta>> {
        self.paged(&PostFilter::public(now), requested).await
    }

    /// Publicly visible posts of a published category
    pub async fn list_category_feed(
        &self,
        slug: &str,
        requested: ListParams,
        now: DateTime<Utc>,
    ) -> ServiceResult<CategoryFeed> {
        let category = self
            .category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category")?
            .filter(|category| category.is_published)
            .ok_or(ServiceError::NotFound)?;

        let filter = PostFilter::public(now).in_category(category.id);
        let posts = self.paged(&filter, requested).await?;
        Ok(CategoryFeed { category, posts })
    }

    /// Posts by `username`; the owner sees all of them, everyone else only
    /// the publicly visible ones
    pub async fn list_profile_feed(
        &self,
        username: &str,
        viewer: Option<&User>,
        requested: ListParams,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProfileFeed> {
        let profile = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get profile user")?
            .ok_or(ServiceError::NotFound)?;

        let is_owner = viewer.is_some_and(|user| user.id == profile.id);
        let filter = if is_owner {
            PostFilter::default()
        } else {
            PostFilter::public(now)
        }
        .by_author(profile.id);

        let posts = self.paged(&filter, requested).await?;
        Ok(ProfileFeed { profile, posts })
    }

    /// A single post as `viewer` may see it at `now`
    pub async fn get_post_detail(
        &self,
        id: i64,
        viewer: Option<&User>,
        now: DateTime<Utc>,
    ) -> ServiceResult<PostDetail> {
        let post = self
            .post_repo
            .get_with_meta(id)
            .await
            .context("Failed to get post")?
            .filter(|post| is_post_visible(post, viewer, now))
            .ok_or(ServiceError::NotFound)?;

        let comments = self
            .comment_repo
            .list_published_for_post(id)
            .await
            .context("Failed to list comments")?
            .into_iter()
            .filter(|c| is_comment_visible(&c.comment))
            .collect();

        Ok(PostDetail { post, comments })
    }

    async fn paged(
        &self,
        filter: &PostFilter,
        requested: ListParams,
    ) -> ServiceResult<PagedResult<PostWithMeta>> {
        let total = self
            .post_repo
            .count(filter)
            .await
            .context("Failed to count posts")?;
        let params = requested.clamp_to(total);
        let items = self
            .post_repo
            .list(filter, &params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }
}
