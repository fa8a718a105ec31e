//! Comment service
//!
//! Any logged-in user may comment on an existing post. Editing and deleting
//! look the comment up by `(id, post, author)`: a comment on another post or
//! by someone else is reported as not found.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentForm, User};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comment_repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    /// Create a comment (`comment_id == None`) or edit the viewer's own one
    pub async fn create_or_update_comment(
        &self,
        post_id: i64,
        comment_id: Option<i64>,
        form: &CommentForm,
        viewer: &User,
    ) -> ServiceResult<Comment> {
        self.ensure_post_exists(post_id).await?;

        let existing = match comment_id {
            Some(id) => Some(self.owned(post_id, id, viewer).await?),
            None => None,
        };

        let text = form.text.trim();
        if text.is_empty() {
            return Err(ServiceError::invalid("text", "This field is required."));
        }

        match existing {
            Some(comment) => {
                self.comment_repo
                    .update_text(comment.id, text)
                    .await
                    .context("Failed to update comment")?;
                tracing::debug!(comment_id = comment.id, post_id, "Comment updated");
                Ok(Comment {
                    text: text.to_string(),
                    ..comment
                })
            }
            None => {
                let comment = Comment {
                    id: 0,
                    text: text.to_string(),
                    is_published: true,
                    created_at: Utc::now(),
                    author_id: viewer.id,
                    post_id,
                };
                let created = self
                    .comment_repo
                    .create(&comment)
                    .await
                    .context("Failed to create comment")?;
                tracing::debug!(comment_id = created.id, post_id, "Comment created");
                Ok(created)
            }
        }
    }

    /// The viewer's comment, for the edit and delete pages
    pub async fn get_comment_for_owner(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &User,
    ) -> ServiceResult<Comment> {
        self.ensure_post_exists(post_id).await?;
        self.owned(post_id, comment_id, viewer).await
    }

    pub async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        viewer: &User,
    ) -> ServiceResult<()> {
        let comment = self.get_comment_for_owner(post_id, comment_id, viewer).await?;
        if !self
            .comment_repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?
        {
            return Err(ServiceError::NotFound);
        }
        tracing::debug!(comment_id, post_id, "Comment deleted");
        Ok(())
    }

    async fn ensure_post_exists(&self, post_id: i64) -> ServiceResult<()> {
        self.post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .ok_or(ServiceError::NotFound)?;
        Ok(())
    }

    async fn owned(&self, post_id: i64, comment_id: i64, viewer: &User) -> ServiceResult<Comment> {
        let comment = self
            .comment_repo
            .get_owned(comment_id, post_id, viewer.id)
            .await
            .context("Failed to get comment")?
            .ok_or(ServiceError::NotFound)?;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::models::UserRole;

    struct Fixture {
        service: CommentService,
        comments: SqlxCommentRepository,
        post: i64,
        other_post: i64,
        a: User,
        b: User,
        c: User,
    }

    fn as_user(id: i64, username: &str) -> User {
        let mut user = User::new(username.into(), String::new(), String::new(), UserRole::Author);
        user.id = id;
        user
    }

    async fn setup() -> Fixture {
        let pool = migrated_pool().await;
        let a = as_user(insert_user(&pool, "a").await, "a");
        let b = as_user(insert_user(&pool, "b").await, "b");
        let c = as_user(insert_user(&pool, "c").await, "c");
        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts.create(&new_post(a.id, None, None, Utc::now())).await.unwrap().id;
        let other_post = posts.create(&new_post(a.id, None, None, Utc::now())).await.unwrap().id;
        Fixture {
            service: CommentService::new(
                SqlxCommentRepository::boxed(pool.clone()),
                SqlxPostRepository::boxed(pool.clone()),
            ),
            comments: SqlxCommentRepository::new(pool),
            post,
            other_post,
            a,
            b,
            c,
        }
    }

    fn form(text: &str) -> CommentForm {
        CommentForm { text: text.into() }
    }

    #[tokio::test]
    async fn test_create_forces_author_and_post() {
        let fx = setup().await;
        let comment = fx
            .service
            .create_or_update_comment(fx.post, None, &form("  Nice post  "), &fx.b)
            .await
            .unwrap();

        assert_eq!(comment.author_id, fx.b.id);
        assert_eq!(comment.post_id, fx.post);
        assert_eq!(comment.text, "Nice post");
        assert!(comment.is_published);
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let fx = setup().await;
        let result = fx
            .service
            .create_or_update_comment(fx.post, None, &form("   "), &fx.b)
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(e)) if e.contains("text")));
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_not_found() {
        let fx = setup().await;
        let result = fx
            .service
            .create_or_update_comment(999, None, &form("hello"), &fx.b)
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn test_edit_only_own_comment_on_same_post() {
        let fx = setup().await;
        let comment = fx
            .service
            .create_or_update_comment(fx.post, None, &form("first"), &fx.b)
            .await
            .unwrap();

        let by_other = fx
            .service
            .create_or_update_comment(fx.post, Some(comment.id), &form("edited"), &fx.c)
            .await;
        let wrong_post = fx
            .service
            .create_or_update_comment(fx.other_post, Some(comment.id), &form("edited"), &fx.b)
            .await;
        assert!(matches!(by_other, Err(ServiceError::NotFound)));
        assert!(matches!(wrong_post, Err(ServiceError::NotFound)));

        let edited = fx
            .service
            .create_or_update_comment(fx.post, Some(comment.id), &form("edited"), &fx.b)
            .await
            .unwrap();
        assert_eq!(edited.id, comment.id);
        assert_eq!(fx.comments.get_by_id(comment.id).await.unwrap().unwrap().text, "edited");
    }

    #[tokio::test]
    async fn test_third_party_cannot_delete_comment() {
        // B comments on A's post; neither C nor the post author A may delete it
        let fx = setup().await;
        let comment = fx
            .service
            .create_or_update_comment(fx.post, None, &form("mine"), &fx.b)
            .await
            .unwrap();

        for intruder in [&fx.c, &fx.a] {
            assert!(matches!(
                fx.service.delete_comment(fx.post, comment.id, intruder).await,
                Err(ServiceError::NotFound)
            ));
        }
        assert!(fx.comments.get_by_id(comment.id).await.unwrap().is_some());

        fx.service.delete_comment(fx.post, comment.id, &fx.b).await.unwrap();
        assert!(fx.comments.get_by_id(comment.id).await.unwrap().is_none());
        assert!(matches!(
            fx.service.get_comment_for_owner(fx.post, comment.id, &fx.b).await,
            Err(ServiceError::NotFound)
        ));
    }
}
