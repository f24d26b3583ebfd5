//! Cart route handlers.
//!
//! Every handler works on the caller's own cart, created on first access.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde::{Deserialize, Serialize};

use bazaar_core::{CartItemId, ProductId, Quantity};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::{Cart, CartLine};
use crate::services::CartService;
use crate::state::AppState;

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Body of `PUT /cart/items/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Quantity,
}

/// Confirmation for deletes.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Cart>> {
    Ok(Json(CartService::new(state.store()).get_cart(user.id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartLine>> {
    let Json(item) = body?;
    add_breadcrumb(
        "cart",
        "Add item",
        Some(&[("product_id", &item.product_id.to_string())]),
    );
    let line = CartService::new(state.store())
        .add_item(user.id, item.product_id, item.quantity)
        .await?;
    Ok(Json(line))
}

pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    id: std::result::Result<Path<CartItemId>, PathRejection>,
    body: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartLine>> {
    let Path(id) = id?;
    let Json(item) = body?;
    let line = CartService::new(state.store())
        .update_item(user.id, id, item.quantity)
        .await?;
    Ok(Json(line))
}

pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    id: std::result::Result<Path<CartItemId>, PathRejection>,
) -> Result<Json<Message>> {
    let Path(id) = id?;
    CartService::new(state.store())
        .remove_item(user.id, id)
        .await?;
    Ok(Json(Message {
        message: "Item removed from cart",
    }))
}

pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Message>> {
    CartService::new(state.store()).clear(user.id).await?;
    Ok(Json(Message {
        message: "Cart cleared",
    }))
}
