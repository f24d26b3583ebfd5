//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use bazaar_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::services::OrderService;
use crate::state::AppState;

/// The caller's orders, or every order for admins. Newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderService::new(state.store()).list_for(&user).await?))
}

pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    Ok(Json(OrderService::new(state.store()).get(id, &user).await?))
}
