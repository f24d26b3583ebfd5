//! Store traits.

use async_trait::async_trait;

use bazaar_core::{
    CartId, CartItemId, CategoryId, Email, OrderId, OrderStatus, ProductId, Quantity, UserId,
};

use super::RepositoryError;
use crate::models::{
    CartItem, CartLine, Category, NewCategory, NewOrder, NewProduct, NewUser, Order, Product,
    ProductFilter, ProductUpdate, User,
};

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Returns `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Products and categories.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products sharing `category_id`, excluding `exclude`, in id order.
    async fn products_in_category(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Returns `Conflict` if the sku is taken.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Returns `NotFound` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Returns `Conflict` if the name is taken.
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError>;
}

/// Per-user carts.
///
/// Every item-level operation is scoped by `cart_id`, so an item id from
/// another user's cart behaves exactly like a missing one.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the user's cart id, inserting an empty cart if none exists.
    ///
    /// Must tolerate concurrent first calls for the same user: at most one
    /// cart is ever created and every caller gets its id.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError>;

    /// Lines in insertion order, joined with their products.
    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Add `quantity` of a product, merging into an existing line atomically.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError>;

    async fn get_cart_line(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Overwrite a line's quantity. `None` if the item is not in this cart.
    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Returns `false` if the item is not in this cart.
    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError>;

    /// Remove every line. Returns how many were removed.
    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError>;
}

/// Order history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders newest first. `None` lists every user's orders.
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Move a pending order to `status`, optionally recording an invoice id.
    ///
    /// Orders no longer pending are left untouched and `None` is returned.
    async fn resolve_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        invoice_id: Option<String>,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Outcome of a guarded stock decrement.
#[derive(Debug, Clone)]
pub enum StockReservation {
    /// Stock was decremented. Carries the product as read under the guard.
    Reserved(Product),
    /// Not enough stock. Nothing was changed.
    Insufficient(Product),
    /// The product does not exist.
    Missing,
}

/// Source of checkout units of work.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn begin<'a>(&'a self) -> Result<Box<dyn UnitOfWork + 'a>, RepositoryError>;
}

/// A transaction spanning the checkout writes.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every change made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Lock the user's cart and return its raw lines.
    ///
    /// `None` if the user has no cart. Concurrent checkouts of the same cart
    /// are serialized by this lock.
    async fn lock_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<(CartId, Vec<CartItem>)>, RepositoryError>;

    /// Check and decrement stock as one guarded step.
    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockReservation, RepositoryError>;

    /// Insert a pending order with its items.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Everything the storefront persists.
#[async_trait]
pub trait Store: UserStore + CatalogStore + CartStore + OrderStore + CheckoutStore {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
