//! Order domain types.
//!
//! Orders are snapshots: `total_amount` and each item's `price` are fixed at
//! checkout and never recomputed from the catalog.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{
    Money, MoneyError, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, UserId,
};

use super::Product;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub status: OrderStatus,
    /// External invoice reference. May be absent even on completed orders.
    pub invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Unit price at the time of purchase.
    pub price: Money,
    /// Current catalog entry, for display only.
    pub product: Product,
}

/// An order about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_amount: Money,
    pub items: Vec<NewOrderItem>,
}

/// An order line about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product: Product,
    pub quantity: Quantity,
    pub price: Money,
}

impl NewOrder {
    /// Build an order from reserved lines, snapshotting each product's price.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if a line or the total does not fit
    /// in [`Money`].
    pub fn from_lines(
        user_id: UserId,
        lines: Vec<(Product, Quantity)>,
    ) -> Result<Self, MoneyError> {
        let items: Vec<NewOrderItem> = lines
            .into_iter()
            .map(|(product, quantity)| NewOrderItem {
                price: product.price,
                product,
                quantity,
            })
            .collect();
        let line_totals = items
            .iter()
            .map(|item| item.price.line_total(item.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = Money::total(line_totals)?;

        Ok(Self {
            user_id,
            total_amount,
            items,
        })
    }
}
