//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types.
//! Response bodies serialize them directly.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::{Cart, CartItem, CartLine};
pub use catalog::{Category, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use user::{NewUser, User};
