//! Persistence for the storefront.
//!
//! Handlers and services never touch a connection directly. They receive a
//! [`Store`] (or one of its narrower traits) and, for checkout, an explicit
//! [`UnitOfWork`] obtained from [`CheckoutStore::begin`].
//!
//! Two implementations exist:
//!
//! - [`postgres::PgStore`] - `PostgreSQL` via sqlx, used by the binary and CLI
//! - [`memory::MemoryStore`] - in-process store used by tests and local demos

pub mod memory;
pub mod postgres;
mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    CartStore, CatalogStore, CheckoutStore, OrderStore, StockReservation, Store, UnitOfWork,
    UserStore,
};

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or sku).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
