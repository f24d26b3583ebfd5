use async_trait::async_trait;

use bazaar_core::{CartId, CartItemId, ProductId, Quantity, UserId};

use super::{CartLineRow, PgStore, product_columns};
use crate::db::{CartStore, RepositoryError};
use crate::models::CartLine;

const CART_LINE_SELECT: &str = concat!(
    "SELECT ci.id AS item_id, ci.quantity, ",
    product_columns!(),
    " FROM cart_items ci JOIN products p ON p.id = ci.product_id"
);

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let inserted: Option<(CartId,)> = sqlx::query_as(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = inserted {
            return Ok(id);
        }

        // Lost the race (or the cart already existed): the row is committed now.
        let (id,): (CartId,) = sqlx::query_as("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(&format!(
            "{CART_LINE_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"
        ))
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let (item_id,): (CartItemId,) = sqlx::query_as(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        self.get_cart_line(cart_id, item_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_cart_line(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row: Option<CartLineRow> = sqlx::query_as(&format!(
            "{CART_LINE_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2"
        ))
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartLine::try_from).transpose()
    }

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let updated = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(item_id)
            .bind(quantity.get())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_cart_line(cart_id, item_id).await
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected())
    }
}
