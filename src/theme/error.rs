//! Rendering error types

use thiserror::Error;

/// Template rendering errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// No such page
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
