//! Cart operations for the authenticated user.
//!
//! Every operation resolves the caller's own cart first, so an item id that
//! belongs to someone else's cart is indistinguishable from a missing one.

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CartItemId, ProductId, Quantity, UserId};

use crate::db::{CartStore, CatalogStore, RepositoryError};
use crate::models::{Cart, CartLine, Product};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart item not found")]
    ItemNotFound,

    #[error("Insufficient stock for {title}")]
    InsufficientStock { title: String },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a, S: CartStore + CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CartStore + CatalogStore + ?Sized> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The user's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        let id = self.store.get_or_create_cart(user_id).await?;
        let items = self.store.cart_lines(id).await?;
        Ok(Cart { id, user_id, items })
    }

    /// Add a product, merging with an existing line for the same product.
    ///
    /// Only the requested quantity is checked against stock here; the
    /// authoritative check happens at checkout.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::InsufficientStock`.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        ensure_stock(&product, quantity)?;

        let cart_id = self.store.get_or_create_cart(user_id).await?;
        self.store
            .add_cart_item(cart_id, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ProductNotFound,
                other => CartError::Repository(other),
            })
    }

    /// Overwrite a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not in the caller's
    /// cart, or `CartError::InsufficientStock`.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        let cart_id = self.store.get_or_create_cart(user_id).await?;
        let line = self
            .store
            .get_cart_line(cart_id, item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        ensure_stock(&line.product, quantity)?;

        self.store
            .set_cart_item_quantity(cart_id, item_id, quantity)
            .await?
            .ok_or(CartError::ItemNotFound)
    }

    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not in the caller's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        let cart_id = self.store.get_or_create_cart(user_id).await?;
        if self.store.remove_cart_item(cart_id, item_id).await? {
            Ok(())
        } else {
            Err(CartError::ItemNotFound)
        }
    }

    /// Remove every line. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        let cart_id = self.store.get_or_create_cart(user_id).await?;
        Ok(self.store.clear_cart(cart_id).await?)
    }
}

fn ensure_stock(product: &Product, quantity: Quantity) -> Result<(), CartError> {
    if product.stock < quantity.get() {
        return Err(CartError::InsufficientStock {
            title: product.title.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::Money;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;

    async fn product(store: &MemoryStore, stock: i32) -> Product {
        store
            .create_product(NewProduct {
                title: "Teapot".to_string(),
                description: None,
                price: Money::parse("12.00").unwrap(),
                stock,
                sku: format!("TEA-{stock}"),
                images: Vec::new(),
                category_id: None,
                invoice_item_ref: None,
            })
            .await
            .unwrap()
    }

    fn qty(n: i32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_get_cart_creates_empty_cart_once() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let first = carts.get_cart(UserId::new(1)).await.unwrap();
        let second = carts.get_cart(UserId::new(1)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.items.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_merge_into_one_line() {
        let store = Arc::new(MemoryStore::new());
        let teapot = product(&store, 10).await.id;
        let user = UserId::new(1);

        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                CartService::new(store.as_ref())
                    .add_item(user, teapot, qty(2))
                    .await
                    .unwrap();
            })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                CartService::new(store.as_ref())
                    .add_item(user, teapot, qty(3))
                    .await
                    .unwrap();
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        let cart = CartService::new(store.as_ref()).get_cart(user).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity.get(), 5);
    }

    #[tokio::test]
    async fn test_add_checks_requested_quantity_against_stock() {
        let store = MemoryStore::new();
        let teapot = product(&store, 2).await;
        let carts = CartService::new(&store);

        let err = carts
            .add_item(UserId::new(1), teapot.id, qty(3))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { ref title } if title == "Teapot"));
        assert!(matches!(
            carts.add_item(UserId::new(1), ProductId::new(404), qty(1)).await,
            Err(CartError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_other_users_items_are_not_found() {
        let store = MemoryStore::new();
        let teapot = product(&store, 10).await;
        let carts = CartService::new(&store);
        let line = carts
            .add_item(UserId::new(1), teapot.id, qty(1))
            .await
            .unwrap();

        let intruder = UserId::new(2);
        assert!(matches!(
            carts.update_item(intruder, line.id, qty(2)).await,
            Err(CartError::ItemNotFound)
        ));
        assert!(matches!(
            carts.remove_item(intruder, line.id).await,
            Err(CartError::ItemNotFound)
        ));
        assert_eq!(
            carts.get_cart(UserId::new(1)).await.unwrap().items[0]
                .quantity
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_and_clear() {
        let store = MemoryStore::new();
        let teapot = product(&store, 4).await;
        let carts = CartService::new(&store);
        let user = UserId::new(1);
        let line = carts.add_item(user, teapot.id, qty(1)).await.unwrap();

        assert!(matches!(
            carts.update_item(user, line.id, qty(5)).await,
            Err(CartError::InsufficientStock { .. })
        ));
        let updated = carts.update_item(user, line.id, qty(4)).await.unwrap();
        assert_eq!(updated.quantity.get(), 4);

        assert_eq!(carts.clear(user).await.unwrap(), 1);
        assert!(carts.get_cart(user).await.unwrap().items.is_empty());
    }
}
