//! Registration, login and the current user.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::User;
use crate::services::{AccessToken, AuthService};
use crate::state::AppState;

/// Registration form.
///
/// A `role` field, if sent, is ignored: public registration always creates a
/// shopper. Admins are created with `bazaar-cli user create --role admin`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: AccessToken,
    pub user: User,
}

/// Handle registration.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>)> {
    let Json(form) = body?;
    let user = AuthService::new(state.store(), state.tokens())
        .register(&form.email, &form.name, &form.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handle login.
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(form) = body?;
    let (user, token) = AuthService::new(state.store(), state.tokens())
        .login(&form.email, &form.password)
        .await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// The authenticated caller.
pub async fn me(RequireUser(user): RequireUser) -> Json<User> {
    Json(user)
}
