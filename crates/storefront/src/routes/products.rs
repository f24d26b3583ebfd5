//! Product route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::services::CatalogService;
use crate::state::AppState;

/// Product listing.
pub async fn index(
    State(state): State<AppState>,
    filter: std::result::Result<Query<ProductFilter>, QueryRejection>,
) -> Result<Json<Vec<Product>>> {
    let Query(filter) = filter?;
    let products = CatalogService::new(state.store())
        .list_products(&filter)
        .await?;
    Ok(Json(products))
}

/// Product detail.
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;
    Ok(Json(CatalogService::new(state.store()).get_product(id).await?))
}

/// Other products from the same category.
pub async fn related(
    State(state): State<AppState>,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Vec<Product>>> {
    let Path(id) = id?;
    Ok(Json(
        CatalogService::new(state.store()).related_products(id).await?,
    ))
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    body: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(product) = body?;
    let product = CatalogService::new(state.store())
        .create_product(product)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Partially update a product.
#[instrument(skip(state, admin, id, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    id: std::result::Result<Path<ProductId>, PathRejection>,
    body: std::result::Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;
    let Json(update) = body?;
    let product = CatalogService::new(state.store())
        .update_product(id, update)
        .await?;
    Ok(Json(product))
}
