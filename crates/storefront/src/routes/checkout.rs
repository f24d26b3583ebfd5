//! Checkout route handler.

use axum::{Json, extract::State};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Turn the caller's cart into an order.
///
/// The order is committed before the invoicing call, so a client that
/// disconnects mid-request still ends up with a placed order.
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Order>> {
    add_breadcrumb("checkout", "Checkout started", None);
    let order = CheckoutService::new(
        state.store(),
        state.invoicing(),
        &state.config().store_name,
    )
    .checkout(&user)
    .await?;
    Ok(Json(order))
}
