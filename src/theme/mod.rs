//! Template engine
//!
//! HTML pages are rendered with Tera. The default templates under
//! `templates/` are embedded in the binary; when `templates.path` is
//! configured, `.html` files found there replace the embedded ones of the same
//! name (or add new ones).
//!
//! Every page receives the standard variables `site_name`, `request_path`,
//! `year` and, for logged-in visitors, `current_user`.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Template rendered when another template fails
pub const ERROR_TEMPLATE: &str = "pages/500.html";

/// Templates every deployment must provide
pub const REQUIRED_TEMPLATES: &[&str] = &[
    "blog/index.html",
    "blog/category.html",
    "blog/profile.html",
    "blog/detail.html",
    "blog/create.html",
    "blog/comment.html",
    "blog/user.html",
    "registration/login.html",
    "registration/registration_form.html",
    "pages/about.html",
    "pages/rules.html",
    "pages/404.html",
    "pages/403csrf.html",
    "pages/500.html",
];

/// Embedded default templates
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Tera wrapper holding the merged template set
pub struct ThemeEngine {
    tera: Tera,
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Build the engine from the embedded templates plus an optional override
    /// directory
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            override_path: override_path.map(Path::to_path_buf),
        };
        engine.reload_templates()?;
        Ok(engine)
    }

    /// Re-read the embedded and override templates
    pub fn reload_templates(&mut self) -> Result<()> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8(file.data.into_owned())
                    .with_context(|| format!("Embedded template {} is not UTF-8", name))?;
                templates.insert(name.to_string(), content);
            }
        }

        if let Some(dir) = &self.override_path {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Template {} overridden from {:?}", name, dir);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!("Template override directory {:?} does not exist", dir);
            }
        }

        // Added in one batch: imports and parents resolve against the full set
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", e)))?;

        self.tera = tera;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Render a template
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()).into());
        }
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }

    /// Render a template with the standard variables added to `context`
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        self.render(template, &standard_vars.extend(context))
    }

    /// Render a page, degrading to the error template and finally to a
    /// built-in page. Never fails.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        let full_context = standard_vars.extend(context);
        match self.render(template, &full_context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {:#}", template, e);
                match self.render(ERROR_TEMPLATE, &standard_vars.extend(&TeraContext::new())) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!(
                            "Failed to render error template: {:#}, returning built-in page",
                            error_template_err
                        );
                        Self::simple_error_page(&standard_vars.site_name)
                    }
                }
            }
        }
    }

    /// Last-resort page when the template set itself is broken
    fn simple_error_page(site_name: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Server error - {}</title>
</head>
<body>
    <h1>Server error</h1>
    <p>Something went wrong on our side. Please try again later.</p>
</body>
</html>"#,
            tera::escape_html(site_name)
        )
    }
}

/// Collect `.html` files below `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path).map_err(ThemeError::from)? {
        let path = entry.map_err(ThemeError::from)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }
    Ok(())
}

/// Variables added to every page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub request_path: String,
    /// Current year (for the footer)
    pub year: i32,
    pub current_user: Option<CurrentUser>,
}

/// Logged-in user as seen by templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            is_admin: user.is_admin(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site_name: impl Into<String>, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
            current_user: None,
        }
    }

    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(CurrentUser::from);
        self
    }

    fn extend(&self, context: &TeraContext) -> TeraContext {
        let mut full_context = context.clone();
        full_context.insert("site_name", &self.site_name);
        full_context.insert("request_path", &self.request_path);
        full_context.insert("year", &self.year);
        if let Some(ref user) = self.current_user {
            full_context.insert("current_user", user);
        }
        full_context
    }
}

#[cfg(test)]
mod tests;
