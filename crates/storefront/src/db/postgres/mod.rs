//! `PostgreSQL` store.
//!
//! Queries are built at runtime with `sqlx::query_as` against `FromRow` row
//! types, so the crate builds without a live database.
//!
//! # Schema
//!
//! The schema lives in `crates/storefront/migrations/` and is applied with
//! [`MIGRATOR`] (`bazaar-cli migrate`). Prices and totals are
//! `NUMERIC(12, 2)`, matching the range of [`Money`].

mod carts;
mod catalog;
mod checkout;
mod orders;
mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{
    CartItemId, CategoryId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Quantity,
    UserId, UserRole,
};

use super::{RepositoryError, Store};
use crate::models::{CartLine, Order, OrderItem, Product, User};

/// Product columns, selected from `products p`.
macro_rules! product_columns {
    () => {
        "p.id, p.title, p.description, p.price, p.stock, p.sku, p.images, \
         p.category_id, p.invoice_item_ref"
    };
}
pub(crate) use product_columns;

/// Order columns, selected from `orders o`.
macro_rules! order_columns {
    () => {
        "o.id, o.user_id, o.total_amount, o.status, o.invoice_id, o.created_at"
    };
}
pub(crate) use order_columns;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
fn unique_violation(what: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(format!("{what} already exists"));
        }
        RepositoryError::Database(e)
    }
}

fn quantity(raw: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid quantity in database: {e}")))
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    name: String,
    role: UserRole,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    description: Option<String>,
    price: Money,
    stock: i32,
    sku: String,
    images: Vec<String>,
    category_id: Option<CategoryId>,
    invoice_item_ref: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            sku: row.sku,
            images: row.images,
            category_id: row.category_id,
            invoice_item_ref: row.invoice_item_ref,
        }
    }
}

/// A cart item joined with its product (`ci.id AS item_id, ci.quantity, p.*`).
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    item_id: CartItemId,
    quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.item_id,
            product_id: row.product.id,
            quantity: quantity(row.quantity)?,
            product: row.product.into(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_amount: Money,
    status: OrderStatus,
    invoice_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            total_amount: self.total_amount,
            status: self.status,
            invoice_id: self.invoice_id,
            created_at: self.created_at,
            items,
        }
    }
}

/// An order item joined with its product.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    item_id: OrderItemId,
    order_id: OrderId,
    quantity: i32,
    item_price: Money,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.item_id,
            product_id: row.product.id,
            quantity: quantity(row.quantity)?,
            price: row.item_price,
            product: row.product.into(),
        })
    }
}
