//! Category route handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use bazaar_core::CategoryId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Category, NewCategory};
use crate::services::CatalogService;
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(
        CatalogService::new(state.store()).list_categories().await?,
    ))
}

pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<CategoryId>, PathRejection>,
) -> Result<Json<Category>> {
    let Path(id) = id?;
    Ok(Json(CatalogService::new(state.store()).get_category(id).await?))
}

/// Create a category (admin).
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    body: std::result::Result<Json<NewCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>)> {
    let Json(category) = body?;
    let category = CatalogService::new(state.store())
        .create_category(category)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}
