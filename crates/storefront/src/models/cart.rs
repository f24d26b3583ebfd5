//! Cart domain types.

use serde::Serialize;

use bazaar_core::{CartId, CartItemId, ProductId, Quantity, UserId};

use super::Product;

/// A user's cart with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
}

/// A raw cart row, without the joined product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A cart line joined with the product it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: Product,
}
