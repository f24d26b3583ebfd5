//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId, UserRole};

/// A storefront user (domain type).
///
/// The password hash is never part of this type; repositories hand it out
/// separately for verification only.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (login identifier and token subject).
    pub email: Email,
    /// Display name, used as the invoice contact name.
    pub name: String,
    /// Role controlling catalog management and order visibility.
    pub role: UserRole,
    /// Inactive users cannot authenticate.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
}
