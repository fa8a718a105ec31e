//! Post service
//!
//! Creating, editing and deleting posts. Only the author may change a post:
//!
//! - editing someone else's post yields [`UpdateOutcome::Redirect`] back to it,
//!   with nothing written;
//! - deleting looks the post up by `(id, author)`, so a foreign post and a
//!   missing one give the same [`ServiceError::NotFound`].

use crate::config::UploadConfig;
use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::models::{
    Category, ImageChange, Location, Post, PostFields, PostForm, User, PUB_DATE_FORMAT,
};
use crate::services::error::{FieldErrors, ServiceError, ServiceResult, UpdateOutcome};
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Directory under the upload root holding post images
pub const POST_IMAGE_DIR: &str = "post_images";

const TITLE_MAX_LEN: usize = 256;

/// Formats accepted for `pub_date`, tried in order
const PUB_DATE_INPUT_FORMATS: &[&str] = &[PUB_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// An image file received with the post form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Choices offered by the post form
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostFormChoices {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
    upload: Arc<UploadConfig>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
        upload: Arc<UploadConfig>,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            location_repo,
            upload,
        }
    }

    /// Categories and locations for the form's select boxes
    pub async fn form_choices(&self) -> ServiceResult<PostFormChoices> {
        let categories = self
            .category_repo
            .list()
            .await
            .context("Failed to list categories")?;
        let locations = self
            .location_repo
            .list()
            .await
            .context("Failed to list locations")?;
        Ok(PostFormChoices {
            categories,
            locations,
        })
    }

    /// Create a post authored by `viewer`
    pub async fn create_post(
        &self,
        viewer: &User,
        form: &PostForm,
        image: Option<ImageUpload>,
    ) -> ServiceResult<Post> {
        let fields = self.validate(form, image.as_ref()).await?;
        let image_path = match image {
            Some(upload) => Some(self.store_image(&upload).await?),
            None => None,
        };

        let post = Post {
            id: 0,
            title: fields.title,
            text: fields.text,
            pub_date: fields.pub_date,
            is_published: true,
            created_at: Utc::now(),
            author_id: viewer.id,
            location_id: fields.location_id,
            category_id: Some(fields.category_id),
            image: image_path,
        };
        let created = self
            .post_repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = created.id, author_id = viewer.id, "Post created");
        Ok(created)
    }

    /// The post to prefill the edit form with
    pub async fn get_post_for_edit(&self, id: i64, viewer: &User) -> ServiceResult<UpdateOutcome<Post>> {
        let post = self.existing(id).await?;
        if post.author_id != viewer.id {
            return Ok(UpdateOutcome::Redirect { post_id: id });
        }
        Ok(UpdateOutcome::Allowed(post))
    }

    /// Save the form onto the post if `viewer` wrote it
    pub async fn update_post(
        &self,
        id: i64,
        viewer: &User,
        form: &PostForm,
        image: Option<ImageUpload>,
    ) -> ServiceResult<UpdateOutcome<Post>> {
        let existing = match self.get_post_for_edit(id, viewer).await? {
            UpdateOutcome::Allowed(post) => post,
            redirect => return Ok(redirect),
        };

        let mut fields = self.validate(form, image.as_ref()).await?;
        fields.image = match image {
            Some(upload) => ImageChange::Replace(self.store_image(&upload).await?),
            None if form.clear_image => ImageChange::Clear,
            None => ImageChange::Keep,
        };
        let image_path = match &fields.image {
            ImageChange::Keep => existing.image.clone(),
            ImageChange::Replace(path) => Some(path.clone()),
            ImageChange::Clear => None,
        };

        let post = Post {
            title: fields.title,
            text: fields.text,
            pub_date: fields.pub_date,
            location_id: fields.location_id,
            category_id: Some(fields.category_id),
            image: image_path,
            ..existing.clone()
        };
        let updated = self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        if fields.image != ImageChange::Keep {
            if let Some(old) = existing.image.as_deref() {
                self.remove_image(old).await;
            }
        }

        tracing::info!(post_id = id, "Post updated");
        Ok(UpdateOutcome::Allowed(updated))
    }

    /// The post shown on the delete confirmation page
    pub async fn get_post_for_delete(&self, id: i64, viewer: &User) -> ServiceResult<Post> {
        let post = self
            .post_repo
            .get_by_id_and_author(id, viewer.id)
            .await
            .context("Failed to get post")?
            .ok_or(ServiceError::NotFound)?;
        Ok(post)
    }

    /// Delete `viewer`'s post together with its comments and image
    pub async fn delete_post(&self, id: i64, viewer: &User) -> ServiceResult<()> {
        let post = self.get_post_for_delete(id, viewer).await?;
        if !self
            .post_repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?
        {
            return Err(ServiceError::NotFound);
        }
        if let Some(image) = post.image.as_deref() {
            self.remove_image(image).await;
        }

        tracing::info!(post_id = id, author_id = viewer.id, "Post deleted");
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn existing(&self, id: i64) -> ServiceResult<Post> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(ServiceError::NotFound)?;
        Ok(post)
    }

    async fn validate(&self, form: &PostForm, image: Option<&ImageUpload>) -> ServiceResult<PostFields> {
        let mut errors = FieldErrors::new();

        let title = form.title.trim().to_string();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title.chars().count() > TITLE_MAX_LEN {
            errors.add("title", "Ensure this value has at most 256 characters.");
        }

        let text = form.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", "This field is required.");
        }

        let pub_date = parse_pub_date(&form.pub_date);
        if pub_date.is_none() {
            let message = if form.pub_date.trim().is_empty() {
                "This field is required."
            } else {
                "Enter a valid date/time."
            };
            errors.add("pub_date", message);
        }

        let category_id = match form.category.trim() {
            "" => {
                errors.add("category", "This field is required.");
                None
            }
            raw => {
                let found = match raw.parse::<i64>() {
                    Ok(id) => self.category_exists(id).await?.then_some(id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.add("category", "Select a valid choice.");
                }
                found
            }
        };

        let location_id = match form.location.trim() {
            "" => None,
            raw => {
                let found = match raw.parse::<i64>() {
                    Ok(id) => self.location_exists(id).await?.then_some(id),
                    Err(_) => None,
                };
                if found.is_none() {
                    errors.add("location", "Select a valid choice.");
                }
                found
            }
        };

        if let Some(upload) = image {
            if !self.upload.is_type_allowed(&upload.content_type) {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            } else if upload.data.len() as u64 > self.upload.max_file_size {
                errors.add(
                    "image",
                    format!(
                        "File too large. Maximum size is {} MB.",
                        self.upload.max_file_size / 1024 / 1024
                    ),
                );
            }
        }

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(PostFields {
                title,
                text,
                pub_date,
                category_id,
                location_id,
                image: ImageChange::Keep,
            }),
            _ => Err(ServiceError::Validation(errors)),
        }
    }

    async fn category_exists(&self, id: i64) -> ServiceResult<bool> {
        let found = self
            .category_repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?;
        Ok(found.is_some())
    }

    async fn location_exists(&self, id: i64) -> ServiceResult<bool> {
        let found = self
            .location_repo
            .get_by_id(id)
            .await
            .context("Failed to get location")?;
        Ok(found.is_some())
    }

    /// Write the image under the upload root; returns the path relative to it
    async fn store_image(&self, upload: &ImageUpload) -> ServiceResult<String> {
        let dir = self.upload.path.join(POST_IMAGE_DIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {:?}", dir))?;

        let file_name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            self.upload.get_extension(&upload.content_type)
        );
        fs::write(dir.join(&file_name), &upload.data)
            .await
            .with_context(|| format!("Failed to save image {}", upload.file_name))?;

        Ok(format!("{}/{}", POST_IMAGE_DIR, file_name))
    }

    async fn remove_image(&self, relative: &str) {
        // Stored paths are generated by store_image; never follow anything else
        let Some(name) = relative.strip_prefix(&format!("{}/", POST_IMAGE_DIR)) else {
            return;
        };
        if name.contains('/') || name.contains("..") {
            return;
        }
        let path = self.upload.path.join(POST_IMAGE_DIR).join(Path::new(name));
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!("Failed to remove image {:?}: {}", path, e);
        }
    }
}

/// Parse a `datetime-local` value as UTC
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    PUB_DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::UserRole;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    struct Fixture {
        pool: DynDatabasePool,
        service: PostService,
        posts: SqlxPostRepository,
        alice: User,
        bob: User,
        category: i64,
        location: i64,
        media: TempDir,
    }

    fn as_user(id: i64, username: &str) -> User {
        let mut user = User::new(username.into(), String::new(), String::new(), UserRole::Author);
        user.id = id;
        user
    }

    async fn setup() -> Fixture {
        let pool = migrated_pool().await;
        let media = TempDir::new().unwrap();
        let upload = UploadConfig {
            path: media.path().to_path_buf(),
            ..UploadConfig::default()
        };
        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
            Arc::new(upload),
        );
        let alice = as_user(insert_user(&pool, "alice").await, "alice");
        let bob = as_user(insert_user(&pool, "bob").await, "bob");
        let category = insert_category(&pool, "travel", true).await;
        let location = insert_location(&pool, "Island", true).await;
        Fixture {
            posts: SqlxPostRepository::new(pool.clone()),
            pool,
            service,
            alice,
            bob,
            category,
            location,
            media,
        }
    }

    impl Fixture {
        fn form(&self, title: &str) -> PostForm {
            PostForm {
                title: title.into(),
                text: "Body".into(),
                pub_date: "2024-05-01T10:30".into(),
                category: self.category.to_string(),
                location: self.location.to_string(),
                ..PostForm::default()
            }
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: "photo.png".into(),
            content_type: "image/png".into(),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_parse_pub_date() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_pub_date("2024-05-01T10:30"), Some(expected));
        assert_eq!(parse_pub_date(" 2024-05-01 10:30:00 "), Some(expected));
        assert_eq!(parse_pub_date("yesterday"), None);
        assert_eq!(parse_pub_date(""), None);
    }

    #[tokio::test]
    async fn test_create_forces_author() {
        let fx = setup().await;
        let post = fx.service.create_post(&fx.alice, &fx.form("Hello"), None).await.unwrap();

        assert_eq!(post.author_id, fx.alice.id);
        assert_eq!(post.category_id, Some(fx.category));
        assert_eq!(post.pub_date, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
        assert!(fx.posts.get_by_id(post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_publication_flag_is_left_to_moderators() {
        let fx = setup().await;
        let post = fx.service.create_post(&fx.alice, &fx.form("Hidden later"), None).await.unwrap();
        assert!(post.is_published);

        fx.posts.set_published(post.id, false).await.unwrap();
        let UpdateOutcome::Allowed(updated) = fx
            .service
            .update_post(post.id, &fx.alice, &fx.form("Renamed"), None)
            .await
            .unwrap()
        else {
            panic!("author should be allowed");
        };
        assert_eq!(updated.title, "Renamed");
        assert!(!updated.is_published);
        assert!(!fx.posts.get_by_id(post.id).await.unwrap().unwrap().is_published);
    }

    #[tokio::test]
    async fn test_create_validation_writes_nothing() {
        let fx = setup().await;
        let form = PostForm {
            title: "   ".into(),
            text: String::new(),
            pub_date: "not a date".into(),
            category: "999".into(),
            location: "abc".into(),
            ..PostForm::default()
        };

        let Err(ServiceError::Validation(errors)) =
            fx.service.create_post(&fx.alice, &form, Some(png())).await
        else {
            panic!("expected validation error");
        };
        for field in ["title", "text", "pub_date", "category", "location"] {
            assert!(errors.contains(field), "missing error for {}", field);
        }

        let all = fx
            .posts
            .count(&crate::db::repositories::PostFilter::default())
            .await
            .unwrap();
        assert_eq!(all, 0);
        assert!(!fx.media.path().join(POST_IMAGE_DIR).exists());
    }

    #[tokio::test]
    async fn test_location_is_optional() {
        let fx = setup().await;
        let form = PostForm {
            location: String::new(),
            ..fx.form("No place")
        };
        let post = fx.service.create_post(&fx.alice, &form, None).await.unwrap();
        assert_eq!(post.location_id, None);
    }

    #[tokio::test]
    async fn test_rejects_disallowed_image_type() {
        let fx = setup().await;
        let upload = ImageUpload {
            content_type: "application/pdf".into(),
            ..png()
        };
        let result = fx.service.create_post(&fx.alice, &fx.form("Doc"), Some(upload)).await;
        assert!(matches!(result, Err(ServiceError::Validation(e)) if e.contains("image")));
    }

    #[tokio::test]
    async fn test_update_by_non_author_redirects_and_changes_nothing() {
        let fx = setup().await;
        let post = fx.service.create_post(&fx.alice, &fx.form("Original"), None).await.unwrap();

        let outcome = fx
            .service
            .update_post(post.id, &fx.bob, &fx.form("Hijacked"), None)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Redirect { post_id: post.id });
        assert_eq!(
            fx.service.get_post_for_edit(post.id, &fx.bob).await.unwrap(),
            UpdateOutcome::Redirect { post_id: post.id }
        );

        let stored = fx.posts.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Original");
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let fx = setup().await;
        assert!(matches!(
            fx.service.update_post(404, &fx.alice, &fx.form("x"), None).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            fx.service.get_post_for_edit(404, &fx.alice).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_author_created_at_and_image() {
        let fx = setup().await;
        let post = fx
            .service
            .create_post(&fx.alice, &fx.form("Before"), Some(png()))
            .await
            .unwrap();
        let image = post.image.clone().unwrap();
        assert!(image.starts_with("post_images/"));
        assert!(fx.media.path().join(&image).exists());

        let mut form = fx.form("After");
        form.pub_date = (Utc::now() + Duration::days(1)).format(PUB_DATE_FORMAT).to_string();
        let UpdateOutcome::Allowed(updated) =
            fx.service.update_post(post.id, &fx.alice, &form, None).await.unwrap()
        else {
            panic!("author should be allowed");
        };

        assert_eq!(updated.title, "After");
        assert_eq!(updated.author_id, fx.alice.id);
        assert_eq!(updated.image.as_deref(), Some(image.as_str()));
        let stored = fx.posts.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at.timestamp(), post.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_clear_image_removes_file() {
        let fx = setup().await;
        let post = fx
            .service
            .create_post(&fx.alice, &fx.form("Pic"), Some(png()))
            .await
            .unwrap();
        let image = post.image.clone().unwrap();

        let form = PostForm {
            clear_image: true,
            ..fx.form("Pic")
        };
        let UpdateOutcome::Allowed(updated) =
            fx.service.update_post(post.id, &fx.alice, &form, None).await.unwrap()
        else {
            panic!("author should be allowed");
        };
        assert_eq!(updated.image, None);
        assert!(!fx.media.path().join(&image).exists());
    }

    #[tokio::test]
    async fn test_delete_by_non_author_is_not_found() {
        let fx = setup().await;
        let post = fx.service.create_post(&fx.alice, &fx.form("Mine"), None).await.unwrap();

        let foreign = fx.service.delete_post(post.id, &fx.bob).await;
        let missing = fx.service.delete_post(9999, &fx.bob).await;
        assert!(matches!(foreign, Err(ServiceError::NotFound)));
        assert!(matches!(missing, Err(ServiceError::NotFound)));
        assert!(matches!(
            fx.service.get_post_for_delete(post.id, &fx.bob).await,
            Err(ServiceError::NotFound)
        ));
        assert!(fx.posts.get_by_id(post.id).await.unwrap().is_some());

        fx.service.delete_post(post.id, &fx.alice).await.unwrap();
        assert!(fx.posts.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let fx = setup().await;
        let post = fx.service.create_post(&fx.alice, &fx.form("Chatty"), None).await.unwrap();
        insert_comment(&fx.pool, post.id, fx.bob.id, true).await;

        fx.service.delete_post(post.id, &fx.alice).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(fx.pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_form_choices_include_unpublished() {
        let fx = setup().await;
        insert_category(&fx.pool, "draft-cat", false).await;
        let choices = fx.service.form_choices().await.unwrap();
        assert_eq!(choices.categories.len(), 2);
        assert_eq!(choices.locations.len(), 1);
    }
}
