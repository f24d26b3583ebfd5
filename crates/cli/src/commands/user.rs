//! User account commands.

use bazaar_core::UserRole;
use bazaar_storefront::db::{RepositoryError, UserStore};
use bazaar_storefront::services::auth::new_account;

use super::{CommandError, connect};

/// Create a user with an explicit role.
///
/// # Errors
///
/// Returns an error if the role is unknown, the account fields are invalid,
/// the email is taken, or the database is unreachable.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;

    // Validate before connecting so typos fail fast
    let account = new_account(email, name, password, role)?;

    let store = connect().await?;
    let user = store.create_user(account).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => format!("User already exists with email: {email}").into(),
        other => Box::<dyn std::error::Error>::from(other),
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "User created");
    Ok(())
}
