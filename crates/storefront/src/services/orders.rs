//! Order history with ownership checks.

use thiserror::Error;

use bazaar_core::OrderId;

use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, User};

/// Errors from order lookups.
#[derive(Debug, Error)]
pub enum OrderAccessError {
    #[error("Order not found")]
    NotFound,

    /// The order exists but belongs to someone else.
    #[error("Not enough permissions")]
    Forbidden,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order service.
pub struct OrderService<'a, S: OrderStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: OrderStore + ?Sized> OrderService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The caller's orders newest first; every order for admins.
    ///
    /// # Errors
    ///
    /// Returns `OrderAccessError::Repository` if the store fails.
    pub async fn list_for(&self, caller: &User) -> Result<Vec<Order>, OrderAccessError> {
        let owner = (!caller.role.is_admin()).then_some(caller.id);
        Ok(self.store.list_orders(owner).await?)
    }

    /// # Errors
    ///
    /// Returns `OrderAccessError::NotFound` if the order does not exist and
    /// `OrderAccessError::Forbidden` if the caller may not see it.
    pub async fn get(&self, id: OrderId, caller: &User) -> Result<Order, OrderAccessError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderAccessError::NotFound)?;

        if order.user_id != caller.id && !caller.role.is_admin() {
            return Err(OrderAccessError::Forbidden);
        }
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Email, Money, Quantity, UserId, UserRole};
    use chrono::Utc;

    use super::*;
    use crate::db::{CatalogStore, CheckoutStore, MemoryStore};
    use crate::models::{NewOrder, NewProduct};

    fn user(id: i32, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("u{id}@shop.test")).unwrap(),
            name: format!("U{id}"),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    async fn place(store: &MemoryStore, owner: UserId, sku: &str) -> Order {
        let product = store
            .create_product(NewProduct {
                title: "Kettle".to_string(),
                description: None,
                price: Money::parse("30.00").unwrap(),
                stock: 1,
                sku: sku.to_string(),
                images: Vec::new(),
                category_id: None,
                invoice_item_ref: None,
            })
            .await
            .unwrap();
        let mut uow = store.begin().await.unwrap();
        let order = uow
            .insert_order(&NewOrder::from_lines(
                owner,
                vec![(product, Quantity::new(1).unwrap())],
            ).unwrap())
            .await
            .unwrap();
        uow.commit().await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_owner_admin_and_stranger() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let owner = user(1, UserRole::User);
        let stranger = user(2, UserRole::User);
        let admin = user(3, UserRole::Admin);
        let order = place(&store, owner.id, "K-1").await;

        assert_eq!(orders.get(order.id, &owner).await.unwrap().id, order.id);
        assert_eq!(orders.get(order.id, &admin).await.unwrap().id, order.id);
        assert!(matches!(
            orders.get(order.id, &stranger).await,
            Err(OrderAccessError::Forbidden)
        ));
        assert!(matches!(
            orders.get(OrderId::new(9999), &owner).await,
            Err(OrderAccessError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_newest_first() {
        let store = MemoryStore::new();
        let orders = OrderService::new(&store);
        let owner = user(1, UserRole::User);
        let other = user(2, UserRole::User);
        let admin = user(3, UserRole::Admin);

        let first = place(&store, owner.id, "K-1").await;
        let foreign = place(&store, other.id, "K-2").await;
        let second = place(&store, owner.id, "K-3").await;

        let mine: Vec<_> = orders
            .list_for(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, [second.id, first.id]);

        let all = orders.list_for(&admin).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, second.id);
        assert!(all.iter().any(|o| o.id == foreign.id));
    }
}
