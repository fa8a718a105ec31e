//! Multipart decoding of the post form
//!
//! The post form is `multipart/form-data` because it may carry an image.
//! Text fields land in a [`PostForm`]; the `image` part becomes an
//! [`ImageUpload`] that the post service validates and stores.

use axum::extract::Multipart;

use crate::api::responses::PageError;
use crate::models::PostForm;
use crate::services::ImageUpload;

/// Read the submitted post form.
///
/// An unchecked `clear_image` box is absent from the body, so it starts false.
/// A file input left empty arrives as a part without a file name or data and
/// yields no upload.
pub async fn read_post_form(
    mut multipart: Multipart,
) -> Result<(PostForm, Option<ImageUpload>), PageError> {
    let mut form = PostForm {
        pub_date: String::new(),
        clear_image: false,
        ..PostForm::default()
    };
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PageError::Internal(anyhow::anyhow!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| PageError::Internal(anyhow::anyhow!("Failed to read file: {}", e)))?;
            if !file_name.is_empty() || !data.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| PageError::Internal(anyhow::anyhow!("Failed to read field {}: {}", name, e)))?;
        match name.as_str() {
            "title" => form.title = value,
            "text" => form.text = value,
            "pub_date" => form.pub_date = value,
            "category" => form.category = value,
            "location" => form.location = value,
            "clear_image" => form.clear_image = is_checked(&value),
            _ => {}
        }
    }

    Ok((form, image))
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1")
}
