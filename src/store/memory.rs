//! In-process store
//!
//! Keeps every table in one mutex-guarded state so multi-record operations
//! such as [`OrderStore::place_order`] are atomic. Used by the test suites and
//! handy for running the API without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{OrderStore, ProductStore, SessionStore, StoreError, StoreResult, UserStore};
use crate::domain::aggregates::{stock_reservations, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderLine, Product, Session, User};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    products: HashMap<Uuid, Product>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Seeds a product as-is, keeping its identity.
    pub fn insert_product(&self, product: Product) { self.state().products.insert(product.id, product); }

    pub fn product(&self, id: Uuid) -> Option<Product> { self.state().products.get(&id).cloned() }
    pub fn orders(&self) -> Vec<Order> { self.state().orders.clone() }
    pub fn order_items(&self) -> Vec<OrderItem> { self.state().order_items.clone() }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.state().users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state();
        if state.users.values().any(|u| u.email == user.email) { return Err(StoreError::Conflict); }
        let user = user.into_user(Uuid::now_v7());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: Session) -> StoreResult<()> {
        let mut state = self.state();
        if state.sessions.contains_key(&session.token) { return Err(StoreError::Conflict); }
        state.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.state().sessions.get(token).cloned())
    }

    async fn delete_expired_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id || !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.state().products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn get_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let state = self.state();
        Ok(state.products.values().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let product = Product::create(product);
        self.state().products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<Product> {
        let mut state = self.state();
        let stored = state.products.get_mut(&product.id).ok_or(StoreError::NotFound)?;
        *stored = Product { created_at: stored.created_at, ..product.clone() };
        Ok(stored.clone())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Uuid> {
        let order = order.into_order(Uuid::now_v7());
        let id = order.id;
        self.state().orders.push(order);
        Ok(id)
    }

    async fn create_order_item(&self, item: NewOrderItem) -> StoreResult<()> {
        let mut state = self.state();
        if !state.orders.iter().any(|o| o.id == item.order_id) { return Err(StoreError::NotFound); }
        state.order_items.push(item.into_item(Uuid::now_v7()));
        Ok(())
    }

    async fn place_order(&self, order: NewOrder, lines: Vec<OrderLine>) -> StoreResult<Uuid> {
        let mut state = self.state();

        let reservations = stock_reservations(&lines);
        for (product_id, wanted) in &reservations {
            let available = state.products.get(product_id).map_or(0, |p| i64::from(p.quantity));
            if *wanted > available { return Err(StoreError::InsufficientStock(*product_id)); }
        }
        for line in &lines {
            if let Some(product) = state.products.get_mut(&line.product_id) { product.quantity -= line.quantity; }
        }

        let order = order.into_order(Uuid::now_v7());
        let order_id = order.id;
        state.orders.push(order);
        state.order_items.extend(lines.into_iter().map(|line| line.for_order(order_id).into_item(Uuid::now_v7())));
        Ok(order_id)
    }
}
