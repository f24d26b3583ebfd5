//! Database migration command.
//!
//! Applies the storefront schema embedded from `crates/storefront/migrations`.
//! Already-applied migrations are skipped.

use bazaar_storefront::db::postgres::MIGRATOR;

use super::connect;

/// Run pending storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let store = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(store.pool()).await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}
