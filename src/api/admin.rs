//! Admin API endpoints
//!
//! Category and location management, administrators only:
//! - GET|POST /admin/categories/
//! - PUT|DELETE /admin/categories/{id}/
//! - GET|POST /admin/locations/
//! - PUT|DELETE /admin/locations/{id}/

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{AdminUser, ApiError, AppState};
use crate::models::{Category, Location};
use crate::services::{CategoryForm, LocationForm};

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct LocationListResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: Location,
}

/// Build the admin router, mounted at `/admin`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(list_categories).post(create_category))
        .route("/categories/{id}/", put(update_category).delete(delete_category))
        .route("/locations/", get(list_locations).post(create_location))
        .route("/locations/{id}/", put(update_location).delete(delete_location))
}

// ============================================================================
// Categories
// ============================================================================

async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(CategoryListResponse { categories }))
}

async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    body: Result<Json<CategoryForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let category = state.category_service.create(form).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse { category })))
}

async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CategoryForm>, JsonRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let Path(id) = path?;
    let Json(form) = body?;
    let category = state.category_service.update(id, form).await?;
    Ok(Json(CategoryResponse { category }))
}

/// Posts in the category are kept and lose their category
async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Locations
// ============================================================================

async fn list_locations(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<LocationListResponse>, ApiError> {
    let locations = state.location_service.list().await?;
    Ok(Json(LocationListResponse { locations }))
}

async fn create_location(
    State(state): State<AppState>,
    _admin: AdminUser,
    body: Result<Json<LocationForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = body?;
    let location = state.location_service.create(form).await?;
    Ok((StatusCode::CREATED, Json(LocationResponse { location })))
}

async fn update_location(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<LocationForm>, JsonRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Path(id) = path?;
    let Json(form) = body?;
    let location = state.location_service.update(id, form).await?;
    Ok(Json(LocationResponse { location }))
}

async fn delete_location(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.location_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
