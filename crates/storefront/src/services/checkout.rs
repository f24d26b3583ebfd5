//! Checkout: turn the caller's cart into an order.
//!
//! The cart lock, stock reservations, order insert and cart clear run in one
//! unit of work. The invoice is requested only after that commits, and its
//! outcome never undoes the order: a failed invoice still completes the
//! order, just without an invoice reference.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{MoneyError, OrderStatus, ProductId, UserId};

use crate::db::{CheckoutStore, OrderStore, RepositoryError, StockReservation};
use crate::invoicing::{InvoiceRequest, InvoicingGateway};
use crate::models::{NewOrder, Order, Product, User};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {title}")]
    InsufficientStock { title: String },

    #[error("Order total out of range: {0}")]
    TotalOutOfRange(#[from] MoneyError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a, S, G>
where
    S: CheckoutStore + OrderStore + ?Sized,
    G: InvoicingGateway + ?Sized,
{
    store: &'a S,
    invoicing: &'a G,
    store_name: &'a str,
}

impl<'a, S, G> CheckoutService<'a, S, G>
where
    S: CheckoutStore + OrderStore + ?Sized,
    G: InvoicingGateway + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S, invoicing: &'a G, store_name: &'a str) -> Self {
        Self {
            store,
            invoicing,
            store_name,
        }
    }

    /// Check out the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to buy and
    /// `CheckoutError::InsufficientStock` if any line cannot be covered, and
    /// `CheckoutError::TotalOutOfRange` if the order total does not fit in
    /// `Money`. In all three cases nothing is written.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn checkout(&self, user: &User) -> Result<Order, CheckoutError> {
        let order = self.place_order(user.id).await?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");

        let request = InvoiceRequest::from_order(&order, user, self.store_name);
        let invoice_id = match self.invoicing.create_invoice(&request).await {
            Ok(reference) => {
                tracing::info!(order_id = %order.id, invoice_id = %reference, "Invoice created");
                Some(reference.into_inner())
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %e,
                    "Invoice creation failed, completing order without invoice"
                );
                sentry::capture_error(&e);
                None
            }
        };

        let resolved = self
            .store
            .resolve_order(order.id, OrderStatus::Completed, invoice_id)
            .await?;
        if let Some(resolved) = resolved {
            return Ok(resolved);
        }

        // Someone else moved the order out of pending; report what is stored.
        tracing::warn!(order_id = %order.id, "Order was no longer pending at completion");
        self.store
            .get_order(order.id)
            .await?
            .ok_or(CheckoutError::Repository(RepositoryError::NotFound))
    }

    /// Reserve stock and persist a pending order, all or nothing.
    async fn place_order(&self, user_id: UserId) -> Result<Order, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let Some((cart_id, items)) = uow.lock_cart(user_id).await? else {
            return Err(CheckoutError::EmptyCart);
        };
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Reserve in product id order so concurrent checkouts lock rows in the same order.
        let mut by_product = items.clone();
        by_product.sort_by_key(|item| item.product_id);

        let mut reserved: HashMap<ProductId, Product> = HashMap::with_capacity(items.len());
        for item in &by_product {
            match uow.reserve_stock(item.product_id, item.quantity).await? {
                StockReservation::Reserved(product) => {
                    reserved.insert(product.id, product);
                }
                StockReservation::Insufficient(product) => {
                    tracing::info!(
                        product_id = %product.id,
                        requested = %item.quantity,
                        available = product.stock,
                        "Checkout rejected"
                    );
                    return Err(CheckoutError::InsufficientStock {
                        title: product.title,
                    });
                }
                StockReservation::Missing => {
                    return Err(RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product {}",
                        item.id, item.product_id
                    ))
                    .into());
                }
            }
        }

        let lines = items
            .iter()
            .filter_map(|item| {
                reserved
                    .remove(&item.product_id)
                    .map(|product| (product, item.quantity))
            })
            .collect();
        let order = uow
            .insert_order(&NewOrder::from_lines(user_id, lines)?)
            .await?;
        uow.clear_cart(cart_id).await?;
        uow.commit().await?;

        Ok(order)
    }
}
