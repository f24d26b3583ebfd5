use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use bazaar_core::{CartId, CartItemId, OrderItemId, ProductId, Quantity, UserId};

use super::{OrderRow, PgStore, ProductRow, order_columns, product_columns, quantity};
use crate::db::{CheckoutStore, RepositoryError, StockReservation, UnitOfWork};
use crate::models::{CartItem, NewOrder, Order, OrderItem};

#[async_trait]
impl CheckoutStore for PgStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn UnitOfWork + 'a>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Checkout transaction. Rolled back by sqlx when dropped uncommitted.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<(CartId, Vec<CartItem>)>, RepositoryError> {
        let cart: Option<(CartId,)> =
            sqlx::query_as("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        let Some((cart_id,)) = cart else {
            return Ok(None);
        };

        let rows: Vec<(CartItemId, ProductId, i32)> = sqlx::query_as(
            "SELECT id, product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let items = rows
            .into_iter()
            .map(|(id, product_id, raw)| {
                Ok(CartItem {
                    id,
                    product_id,
                    quantity: quantity(raw)?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some((cart_id, items)))
    }

    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockReservation, RepositoryError> {
        let reserved: Option<ProductRow> = sqlx::query_as(concat!(
            "UPDATE products AS p SET stock = p.stock - $2",
            " WHERE p.id = $1 AND p.stock >= $2 RETURNING ",
            product_columns!()
        ))
        .bind(product_id)
        .bind(quantity.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = reserved {
            return Ok(StockReservation::Reserved(row.into()));
        }

        let current: Option<ProductRow> = sqlx::query_as(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products p WHERE p.id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(current.map_or(StockReservation::Missing, |row| {
            StockReservation::Insufficient(row.into())
        }))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(concat!(
            "INSERT INTO orders AS o (user_id, total_amount, status)",
            " VALUES ($1, $2, 'pending') RETURNING ",
            order_columns!()
        ))
        .bind(order.user_id)
        .bind(order.total_amount)
        .fetch_one(&mut *self.tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let (id,): (OrderItemId,) = sqlx::query_as(
                r"
                INSERT INTO order_items (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                ",
            )
            .bind(row.id)
            .bind(item.product.id)
            .bind(item.quantity.get())
            .bind(item.price)
            .fetch_one(&mut *self.tx)
            .await?;

            items.push(OrderItem {
                id,
                product_id: item.product.id,
                quantity: item.quantity,
                price: item.price,
                product: item.product.clone(),
            });
        }

        Ok(row.into_order(items))
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
