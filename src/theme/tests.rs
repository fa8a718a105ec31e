//! Tests for the template engine

use super::*;
use crate::models::{AuthorSummary, PagedResult, Post, PostWithMeta, UserRole};
use chrono::Utc;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn vars() -> StandardTemplateVars {
    StandardTemplateVars::new("Blogicum", "/")
}

fn sample_post(text: &str) -> PostWithMeta {
    PostWithMeta {
        post: Post {
            id: 7,
            title: "Sea trip".into(),
            text: text.into(),
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
        comment_count: 3,
    }
}

#[test]
fn test_embedded_templates_cover_every_view() {
    let engine = ThemeEngine::new(None).expect("Failed to load templates");
    for name in REQUIRED_TEMPLATES {
        assert!(engine.has_template(name), "missing template {}", name);
    }
}

#[test]
fn test_render_index_with_standard_vars() {
    let engine = ThemeEngine::new(None).unwrap();
    let page = PagedResult::new(vec![sample_post("Hello")], 1, &crate::models::ListParams::default());

    let mut context = TeraContext::new();
    context.insert("posts", &page.items);
    context.insert("page", &page.page_info());

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &vars())
        .expect("index should render");
    assert!(html.contains("<title>Blogicum</title>"));
    assert!(html.contains("Sea trip"));
    assert!(html.contains("Comments (3)"));
    assert!(html.contains("Log in"));
}

#[test]
fn test_empty_feed_renders() {
    let engine = ThemeEngine::new(None).unwrap();
    let page: PagedResult<PostWithMeta> =
        PagedResult::new(vec![], 0, &crate::models::ListParams::default());
    let mut context = TeraContext::new();
    context.insert("posts", &page.items);
    context.insert("page", &page.page_info());

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &vars())
        .unwrap();
    assert!(html.contains("No posts yet."));
    assert!(!html.contains("Page 1 of"));
}

#[test]
fn test_post_text_is_escaped() {
    let engine = ThemeEngine::new(None).unwrap();
    let mut context = TeraContext::new();
    context.insert("post", &sample_post("<script>alert(1)</script>\nsecond line"));
    context.insert("comments", &Vec::<crate::models::CommentWithAuthor>::new());
    context.insert("form", &crate::models::CommentForm::default());
    context.insert("errors", &crate::services::FieldErrors::new());

    let html = engine
        .render_with_standard_vars("blog/detail.html", &context, &vars())
        .unwrap();
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("<br>"));
}

#[test]
fn test_logged_in_header() {
    let engine = ThemeEngine::new(None).unwrap();
    let mut user = User::new("bob".into(), String::new(), String::new(), UserRole::Author);
    user.id = 2;

    let html = engine
        .render_with_standard_vars("pages/about.html", &TeraContext::new(), &vars().with_user(Some(&user)))
        .unwrap();
    assert!(html.contains("/profile/bob"));
    assert!(html.contains("Log out"));
}

#[test]
fn test_field_errors_rendered() {
    let engine = ThemeEngine::new(None).unwrap();
    let mut errors = crate::services::FieldErrors::new();
    errors.add("username", "A user with that username already exists.");

    let mut context = TeraContext::new();
    context.insert("form", &crate::models::ProfileInput::default());
    context.insert("errors", &errors);

    let html = engine
        .render_with_standard_vars("blog/user.html", &context, &vars())
        .unwrap();
    assert!(html.contains("A user with that username already exists."));
}

#[test]
fn test_templates_importing_macros_render_from_embedded_set() {
    // blog/comment.html sorts before the includes/ it imports
    let engine = ThemeEngine::new(None).expect("Failed to load templates");
    let mut errors = crate::services::FieldErrors::new();
    errors.add("text", "This field is required.");
    let comment = crate::models::Comment {
        id: 4,
        text: "Nice trip!".into(),
        is_published: true,
        created_at: Utc::now(),
        author_id: 2,
        post_id: 7,
    };

    let mut context = TeraContext::new();
    context.insert("mode", "edit");
    context.insert("post_id", &7);
    context.insert("comment", &comment);
    context.insert("form", &crate::models::CommentForm::default());
    context.insert("errors", &errors);

    let html = engine
        .render_with_standard_vars("blog/comment.html", &context, &vars())
        .unwrap();
    assert!(html.contains("/posts/7/edit_comment/4"));
    assert!(html.contains("This field is required."));
}

#[test]
fn test_override_directory_replaces_embedded_template() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("pages")).unwrap();
    fs::write(
        dir.path().join("pages/about.html"),
        r#"{% extends "base.html" %}{% block content %}Custom about{% endblock content %}"#,
    )
    .unwrap();

    let engine = ThemeEngine::new(Some(dir.path())).unwrap();
    let html = engine
        .render_with_standard_vars("pages/about.html", &TeraContext::new(), &vars())
        .unwrap();
    assert!(html.contains("Custom about"));
    assert!(engine.has_template("pages/rules.html"));
}

#[test]
fn test_broken_override_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("base.html"), "{% block content %}unclosed").unwrap();
    assert!(ThemeEngine::new(Some(dir.path())).is_err());
}

#[test]
fn test_missing_override_directory_is_ignored() {
    let dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(Some(&dir.path().join("nope"))).unwrap();
    assert!(engine.has_template("blog/index.html"));
}

#[test]
fn test_render_with_fallback_uses_error_page() {
    let engine = ThemeEngine::new(None).unwrap();
    let html = engine.render_with_fallback("blog/missing.html", &TeraContext::new(), &vars());
    assert!(html.contains("Server error"));
}

#[test]
fn test_unknown_template_is_not_found() {
    let engine = ThemeEngine::new(None).unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(matches!(err.downcast_ref::<ThemeError>(), Some(ThemeError::NotFound(_))));
}

#[test]
fn test_simple_error_page_escapes_site_name() {
    let html = ThemeEngine::simple_error_page("<b>Site</b>");
    assert!(html.contains("&lt;b&gt;Site&lt;&#x2F;b&gt;"));
}
