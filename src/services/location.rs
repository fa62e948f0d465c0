//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::Location;
use crate::services::form::{FormErrors, LocationForm};
use anyhow::Context;
use std::sync::Arc;

/// Error types for location service operations
#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Location service
pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list(false).await.context("Failed to list locations")?)
    }

    pub async fn create(&self, form: LocationForm) -> Result<Location, LocationServiceError> {
        let input = form.clean().map_err(LocationServiceError::ValidationError)?;
        let location = self
            .repo
            .create(&input)
            .await
            .context("Failed to create location")?;

        tracing::info!(location_id = location.id, "Location created");
        Ok(location)
    }

    pub async fn update(&self, id: i64, form: LocationForm) -> Result<Location, LocationServiceError> {
        if self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get location")?
            .is_none()
        {
            return Err(LocationServiceError::NotFound(id.to_string()));
        }
        let input = form.clean().map_err(LocationServiceError::ValidationError)?;

        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update location")?)
    }

    /// Delete a location; its posts lose their location
    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete location")? {
            return Err(LocationServiceError::NotFound(id.to_string()));
        }

        tracing::info!(location_id = id, "Location deleted");
        Ok(())
    }
}
