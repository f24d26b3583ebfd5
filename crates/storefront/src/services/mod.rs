//! Business logic services for the storefront.
//!
//! Services borrow a store (and, for checkout, an invoicing gateway) for the
//! duration of one request. Route handlers build them from [`crate::state::AppState`].
//!
//! # Services
//!
//! - [`auth`] - Registration, login and bearer token resolution
//! - [`catalog`] - Products, categories and related products
//! - [`cart`] - The caller's cart
//! - [`checkout`] - Cart to order, with invoicing after commit
//! - [`orders`] - Order history with ownership checks

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

pub use auth::{AccessToken, AuthError, AuthService, TokenIssuer};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService};
pub use orders::{OrderAccessError, OrderService};
