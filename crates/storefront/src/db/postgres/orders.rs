use std::collections::HashMap;

use async_trait::async_trait;

use bazaar_core::{OrderId, OrderStatus, UserId};

use super::{OrderItemRow, OrderRow, PgStore, order_columns, product_columns};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, OrderItem};

impl PgStore {
    /// Attach items to order rows, preserving the row order.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(concat!(
            "SELECT oi.id AS item_id, oi.order_id, oi.quantity, oi.price AS item_price, ",
            product_columns!(),
            " FROM order_items oi JOIN products p ON p.id = oi.product_id",
            " WHERE oi.order_id = ANY($1) ORDER BY oi.id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o WHERE ($1::INTEGER IS NULL OR o.user_id = $1)",
            " ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(rows).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_items(vec![row]).await?.pop())
    }

    async fn resolve_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        invoice_id: Option<String>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(concat!(
            "UPDATE orders AS o SET status = $2, invoice_id = $3",
            " WHERE o.id = $1 AND o.status = 'pending' RETURNING ",
            order_columns!()
        ))
        .bind(id)
        .bind(status)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_items(vec![row]).await?.pop())
    }
}
