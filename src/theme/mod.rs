//! Page rendering
//!
//! This module provides template rendering using Tera.
//! Templates are compiled into the binary from `templates/` and loaded once
//! at startup:
//! - `pages/*.html` for the static about/rules pages
//! - `errors/{403,404,500}.html` for error pages

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Utc};
use rust_embed::RustEmbed;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Templates embedded at compile time
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct Templates;

/// Static pages served under `/pages/`
pub const STATIC_PAGES: &[&str] = &["about", "rules"];

/// Tera renderer over the embedded templates
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    /// Load every embedded template
    pub fn new() -> Result<Self> {
        let mut sources = Vec::new();
        for name in Templates::iter() {
            let file = Templates::get(&name)
                .ok_or_else(|| anyhow!("Embedded template disappeared: {}", name))?;
            let source = String::from_utf8(file.data.into_owned())
                .with_context(|| format!("Template is not UTF-8: {}", name))?;
            sources.push((name.to_string(), source));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(sources)
            .context("Failed to compile templates")?;

        tracing::debug!(count = tera.get_template_names().count(), "Templates loaded");
        Ok(Self { tera })
    }

    /// Render a template with the common variables added
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        let mut context = context.clone();
        context.insert("year", &Utc::now().year());

        self.tera.render(template, &context).map_err(|e| {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }
            ThemeError::TemplateError(message)
        })
    }

    /// Render one of the static pages by name
    pub fn render_page(&self, name: &str) -> Result<String, ThemeError> {
        if !STATIC_PAGES.contains(&name) {
            return Err(ThemeError::NotFound(name.to_string()));
        }
        self.render(&format!("pages/{}.html", name), &TeraContext::new())
    }

    /// Render an error page. Falls back to plain text if the template fails.
    pub fn render_error(&self, status: u16, message: Option<&str>) -> String {
        let mut context = TeraContext::new();
        context.insert("message", message.unwrap_or(""));

        match self.render(&format!("errors/{}.html", status), &context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render error page {}: {}", status, e);
                format!("{} {}", status, message.unwrap_or("Error"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pages_render() {
        let renderer = PageRenderer::new().expect("templates should compile");

        let about = renderer.render_page("about").unwrap();
        assert!(about.contains("<h1>About</h1>"));
        assert!(about.contains(&Utc::now().year().to_string()));

        let rules = renderer.render_page("rules").unwrap();
        assert!(rules.contains("<h1>Rules</h1>"));
    }

    #[test]
    fn test_unknown_page() {
        let renderer = PageRenderer::new().unwrap();
        assert!(matches!(
            renderer.render_page("contacts"),
            Err(ThemeError::NotFound(_))
        ));
    }

    #[test]
    fn test_error_pages() {
        let renderer = PageRenderer::new().unwrap();

        for status in [403u16, 404, 500] {
            let html = renderer.render_error(status, None);
            assert!(html.contains(&format!("<h1>{}", status)), "missing heading for {}", status);
        }

        let custom = renderer.render_error(403, Some("Not your comment"));
        assert!(custom.contains("Not your comment"));
    }

    #[test]
    fn test_missing_error_template_falls_back() {
        let renderer = PageRenderer::new().unwrap();
        assert_eq!(renderer.render_error(418, Some("teapot")), "418 teapot");
    }
}
