//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    /// Place name
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Checked input for creating or replacing a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub is_published: bool,
}

impl LocationInput {
    /// Create a new published location input
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_published: true,
        }
    }

    /// Set the publish flag
    pub fn with_published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }
}
