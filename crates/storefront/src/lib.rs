//! Bazaar Storefront library.
//!
//! JSON API for catalog browsing, carts, checkout and order history. The
//! binary in `main.rs` wires it to `PostgreSQL` and the HTTP invoicing
//! client; tests wire it to [`db::MemoryStore`] and a stub gateway.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod invoicing;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Apply the shared middleware stack to `routes` and attach the state.
///
/// Sentry layers and rate limiting are left to the caller.
pub fn app(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
