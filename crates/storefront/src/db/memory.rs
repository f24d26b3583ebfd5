//! In-process store.
//!
//! All state lives behind one async mutex. A checkout unit of work holds that
//! mutex for its whole lifetime and edits a private copy of the state, which
//! replaces the shared state on commit. Dropping it uncommitted leaves the
//! shared state untouched.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use bazaar_core::{
    CartId, CartItemId, CategoryId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId,
    Quantity, UserId,
};

use super::{
    CartStore, CatalogStore, CheckoutStore, OrderStore, RepositoryError, StockReservation, Store,
    UnitOfWork, UserStore,
};
use crate::models::{
    CartItem, CartLine, Category, NewCategory, NewOrder, NewProduct, NewUser, Order, OrderItem,
    Product, ProductFilter, ProductUpdate, User,
};

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i32,
    users: BTreeMap<i32, (User, String)>,
    categories: BTreeMap<i32, Category>,
    products: BTreeMap<i32, Product>,
    carts: BTreeMap<i32, UserId>,
    cart_items: BTreeMap<i32, StoredCartItem>,
    orders: BTreeMap<i32, StoredOrder>,
}

#[derive(Debug, Clone, Copy)]
struct StoredCartItem {
    cart_id: CartId,
    item: CartItem,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    id: OrderId,
    user_id: UserId,
    total_amount: Money,
    status: OrderStatus,
    invoice_id: Option<String>,
    created_at: DateTime<Utc>,
    items: Vec<StoredOrderItem>,
}

#[derive(Debug, Clone, Copy)]
struct StoredOrderItem {
    id: OrderItemId,
    product_id: ProductId,
    quantity: Quantity,
    price: Money,
}

impl MemoryState {
    /// Ids are unique across all tables, which keeps cross-table mixups visible in tests.
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn product(&self, id: ProductId) -> Result<&Product, RepositoryError> {
        self.products.get(&id.as_i32()).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("dangling product reference {id}"))
        })
    }

    fn cart_for(&self, user_id: UserId) -> Option<CartId> {
        self.carts
            .iter()
            .find(|(_, owner)| **owner == user_id)
            .map(|(id, _)| CartId::new(*id))
    }

    fn cart_items(&self, cart_id: CartId) -> Vec<CartItem> {
        self.cart_items
            .values()
            .filter(|stored| stored.cart_id == cart_id)
            .map(|stored| stored.item)
            .collect()
    }

    fn cart_line(&self, item: CartItem) -> Result<CartLine, RepositoryError> {
        Ok(CartLine {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            product: self.product(item.product_id)?.clone(),
        })
    }

    fn owned_item(&mut self, cart_id: CartId, item_id: CartItemId) -> Option<&mut StoredCartItem> {
        self.cart_items
            .get_mut(&item_id.as_i32())
            .filter(|stored| stored.cart_id == cart_id)
    }

    fn clear_cart(&mut self, cart_id: CartId) -> u64 {
        let before = self.cart_items.len();
        self.cart_items.retain(|_, stored| stored.cart_id != cart_id);
        (before - self.cart_items.len()) as u64
    }

    fn order(&self, stored: &StoredOrder) -> Result<Order, RepositoryError> {
        let items = stored
            .items
            .iter()
            .map(|item| {
                Ok(OrderItem {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                    product: self.product(item.product_id)?.clone(),
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Order {
            id: stored.id,
            user_id: stored.user_id,
            total_amount: stored.total_amount,
            status: stored.status,
            invoice_id: stored.invoice_id.clone(),
            created_at: stored.created_at,
            items,
        })
    }

    fn sku_taken(&self, sku: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let created = User {
            id: UserId::new(state.next_id()),
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: true,
            created_at: Utc::now(),
        };
        state
            .users
            .insert(created.id.as_i32(), (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .get_password_hash(email)
            .await?
            .map(|(user, _)| user))
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id.as_i32()).map(|(user, _)| user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        let skip = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(filter.page_size()).unwrap_or(0);
        Ok(state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id.as_i32()).cloned())
    }

    async fn products_in_category(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.category_id == Some(category_id) && p.id != exclude)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.sku_taken(&product.sku, None) {
            return Err(RepositoryError::Conflict("sku already exists".to_owned()));
        }

        let created = Product {
            id: ProductId::new(state.next_id()),
            title: product.title,
            description: product.description,
            price: product.price,
            stock: product.stock,
            sku: product.sku,
            images: product.images,
            category_id: product.category_id,
            invoice_item_ref: product.invoice_item_ref,
        };
        state.products.insert(created.id.as_i32(), created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(sku) = update.sku.as_deref()
            && state.sku_taken(sku, Some(id))
        {
            return Err(RepositoryError::Conflict("sku already exists".to_owned()));
        }

        let product = state
            .products
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(product);
        Ok(product.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.categories.get(&id.as_i32()).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.categories.values().any(|c| c.name == category.name) {
            return Err(RepositoryError::Conflict(
                "category name already exists".to_owned(),
            ));
        }

        let created = Category {
            id: CategoryId::new(state.next_id()),
            name: category.name,
            description: category.description,
        };
        state.categories.insert(created.id.as_i32(), created.clone());
        Ok(created)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(cart_id) = state.cart_for(user_id) {
            return Ok(cart_id);
        }

        let cart_id = CartId::new(state.next_id());
        state.carts.insert(cart_id.as_i32(), user_id);
        Ok(cart_id)
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .cart_items(cart_id)
            .into_iter()
            .map(|item| state.cart_line(item))
            .collect()
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let mut state = self.state.lock().await;
        state.product(product_id)?;

        let existing = state
            .cart_items
            .values_mut()
            .find(|stored| stored.cart_id == cart_id && stored.item.product_id == product_id);

        let item = if let Some(stored) = existing {
            stored.item.quantity = stored
                .item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| RepositoryError::Conflict("quantity overflow".to_owned()))?;
            stored.item
        } else {
            let item = CartItem {
                id: CartItemId::new(state.next_id()),
                product_id,
                quantity,
            };
            state
                .cart_items
                .insert(item.id.as_i32(), StoredCartItem { cart_id, item });
            item
        };

        state.cart_line(item)
    }

    async fn get_cart_line(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(item) = state.owned_item(cart_id, item_id).map(|stored| stored.item) else {
            return Ok(None);
        };
        state.cart_line(item).map(Some)
    }

    async fn set_cart_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.owned_item(cart_id, item_id) else {
            return Ok(None);
        };
        stored.item.quantity = quantity;
        let item = stored.item;
        state.cart_line(item).map(Some)
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.owned_item(cart_id, item_id).is_none() {
            return Ok(false);
        }
        state.cart_items.remove(&item_id.as_i32());
        Ok(true)
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.clear_cart(cart_id))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        let mut stored: Vec<&StoredOrder> = state
            .orders
            .values()
            .filter(|order| user_id.is_none_or(|id| order.user_id == id))
            .collect();
        stored.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });
        stored.into_iter().map(|order| state.order(order)).collect()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .orders
            .get(&id.as_i32())
            .map(|order| state.order(order))
            .transpose()
    }

    async fn resolve_order(
        &self,
        id: OrderId,
        status: OrderStatus,
        invoice_id: Option<String>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.orders.get_mut(&id.as_i32()) else {
            return Ok(None);
        };
        if !stored.status.can_transition_to(status) {
            return Ok(None);
        }
        stored.status = status;
        stored.invoice_id = invoice_id;

        let snapshot = stored.clone();
        state.order(&snapshot).map(Some)
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn UnitOfWork + 'a>, RepositoryError> {
        let guard = self.state.lock().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Unit of work over [`MemoryStore`].
struct MemoryUnitOfWork<'a> {
    guard: MutexGuard<'a, MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork<'_> {
    async fn lock_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<(CartId, Vec<CartItem>)>, RepositoryError> {
        Ok(self
            .working
            .cart_for(user_id)
            .map(|cart_id| (cart_id, self.working.cart_items(cart_id))))
    }

    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<StockReservation, RepositoryError> {
        let Some(product) = self.working.products.get_mut(&product_id.as_i32()) else {
            return Ok(StockReservation::Missing);
        };
        if product.stock < quantity.get() {
            return Ok(StockReservation::Insufficient(product.clone()));
        }
        product.stock -= quantity.get();
        Ok(StockReservation::Reserved(product.clone()))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let id = OrderId::new(self.working.next_id());
        let items = order
            .items
            .iter()
            .map(|item| StoredOrderItem {
                id: OrderItemId::new(self.working.next_id()),
                product_id: item.product.id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let stored = StoredOrder {
            id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            invoice_id: None,
            created_at: Utc::now(),
            items,
        };
        let created = self.working.order(&stored)?;
        self.working.orders.insert(id.as_i32(), stored);
        Ok(created)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        self.working.clear_cart(cart_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
