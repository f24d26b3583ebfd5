//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                              - Service banner
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (store ping)
//!
//! # Auth
//! POST   /auth/register                 - Create a shopper account
//! POST   /auth/login                    - Exchange credentials for a bearer token
//! GET    /auth/me                       - Current user
//!
//! # Catalog
//! GET    /products                      - Listing (?category_id&search&skip&limit)
//! POST   /products                      - Create (admin)
//! GET    /products/{id}                 - Detail
//! PUT    /products/{id}                 - Partial update (admin)
//! GET    /productdetails/{id}           - Detail
//! GET    /productdetails/{id}/related   - Up to 4 products from the same category
//! GET    /categories                    - Listing
//! POST   /categories                    - Create (admin)
//! GET    /categories/{id}               - Detail
//!
//! # Cart (requires auth)
//! GET    /cart                          - Cart with lines
//! DELETE /cart                          - Remove every line
//! POST   /cart/items                    - Add a product
//! PUT    /cart/items/{id}               - Set a line's quantity
//! DELETE /cart/items/{id}               - Remove a line
//!
//! # Checkout and orders (requires auth)
//! POST   /checkout                      - Turn the cart into an order
//! GET    /orders                        - Order history
//! GET    /orders/{id}                   - One order
//! ```

pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show).put(products::update))
}

/// Create the product details routes router.
pub fn product_detail_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/related", get(products::related))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/{id}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", put(cart::update).delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Every route except `/auth`, which the binary nests separately so it can
/// carry its own rate limiter.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::banner))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/productdetails", product_detail_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .nest("/orders", order_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    api_routes().nest("/auth", auth_routes())
}
