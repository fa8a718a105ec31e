//! Service-level outcomes shared by the feed and mutation services

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Per-field validation messages, keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Errors returned by the feed, post, comment and moderation services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The object does not exist, or the viewer may not learn that it does
    #[error("Not found")]
    NotFound,

    /// Submitted fields were rejected; nothing was written
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Single-field validation error
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result of an edit lookup or update on a post
///
/// A non-author reaching the edit form is sent back to the post instead of
/// being told the post is off limits.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    Allowed(T),
    Redirect { post_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("title", "This field is required.");
        errors.add("title", "Too long.");
        errors.add("text", "This field is required.");

        assert!(errors.contains("title"));
        assert_eq!(errors.get("title").map(|m| m.len()), Some(2));
        assert_eq!(
            errors.to_string(),
            "text: This field is required.; title: This field is required., Too long."
        );
        assert!(matches!(errors.into_result(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let err = ServiceError::invalid("text", "Required");
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["text"][0], "Required");
    }
}
