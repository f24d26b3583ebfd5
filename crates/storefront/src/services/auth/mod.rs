//! Authentication service.
//!
//! Password registration and login with Argon2id hashes, plus bearer token
//! resolution for authenticated requests.

mod error;
mod token;

pub use error::AuthError;
pub use token::{AccessToken, Claims, TokenIssuer};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use bazaar_core::{Email, UserRole};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a, S: UserStore + ?Sized> {
    users: &'a S,
    tokens: &'a TokenIssuer,
}

impl<'a, S: UserStore + ?Sized> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a S, tokens: &'a TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Register a shopper account. Public registration always gets the `user` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<User, AuthError> {
        self.create_user(email, name, password, UserRole::User).await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[instrument(skip(self, password), fields(email = %email, role = %role))]
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let account = new_account(email, name, password, role)?;
        let user = self
            .users
            .create_user(account)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::InactiveUser` if the account is deactivated.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, AccessToken), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        let token = self.tokens.issue(&user.email)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to an active user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is invalid or its user is gone.
    /// Returns `AuthError::InactiveUser` if the account is deactivated.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let email = self.tokens.verify(token)?;
        let user = self
            .users
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }
        Ok(user)
    }
}

/// Validate account fields and hash the password, ready for insertion.
///
/// # Errors
///
/// Returns `AuthError::InvalidEmail`, `AuthError::EmptyName` or
/// `AuthError::WeakPassword` for bad input.
pub fn new_account(
    email: &str,
    name: &str,
    password: &str,
    role: UserRole,
) -> Result<NewUser, AuthError> {
    let email = Email::parse(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::EmptyName);
    }
    validate_password(password)?;

    Ok(NewUser {
        email,
        name: name.to_owned(),
        role,
        password_hash: hash_password(password)?,
    })
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    fn tokens() -> TokenIssuer {
        TokenIssuer::new(
            &SecretString::from("k9$Qz!7vLp2#Xw8@Rt5^Mn3&Yb6*Hc1%"),
            Duration::from_secs(1800),
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_new_account_normalizes_input() {
        let account = new_account(" Ana@Shop.test ", "  Ana ", "hunter2hunter2", UserRole::Admin).unwrap();
        assert_eq!(account.email.as_str(), "ana@shop.test");
        assert_eq!(account.name, "Ana");
        assert_eq!(account.role, UserRole::Admin);
        assert!(verify_password("hunter2hunter2", &account.password_hash).is_ok());

        assert!(matches!(
            new_account("ana@shop.test", "   ", "hunter2hunter2", UserRole::User),
            Err(AuthError::EmptyName)
        ));
        assert!(matches!(
            new_account("not-an-email", "Ana", "hunter2hunter2", UserRole::User),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let user = auth
            .register("Ana@Shop.test", "Ana", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.email.as_str(), "ana@shop.test");

        let (logged_in, token) = auth.login("ana@shop.test", "hunter2hunter2").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = auth.authenticate(&token.access_token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        auth.register("ana@shop.test", "Ana", "hunter2hunter2")
            .await
            .unwrap();
        let err = auth
            .register("ANA@shop.test", "Ana again", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("ana@shop.test", "Ana", "hunter2hunter2")
            .await
            .unwrap();

        assert!(matches!(
            auth.login("ana@shop.test", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("bob@shop.test", "hunter2hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_invalid() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        let ghost = tokens
            .issue(&Email::parse("ghost@shop.test").unwrap())
            .unwrap();

        assert!(matches!(
            auth.authenticate(&ghost.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
