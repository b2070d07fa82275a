//! Persistence capabilities
//!
//! Each store is a narrow async trait so the services can run against
//! PostgreSQL ([`PgStore`]) or the in-process [`MemoryStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{NewOrder, NewOrderItem, NewProduct, NewUser, OrderLine, Product, Session, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> StoreResult<()>;
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;
    /// Removes the sessions of `user_id` that expired at or before `now`.
    async fn delete_expired_sessions(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_products(&self) -> StoreResult<Vec<Product>>;
    /// Results are not guaranteed to follow the order of `ids`.
    async fn get_products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;
    /// Returns the stored row. Fails with [`StoreError::NotFound`] when no
    /// product has `product.id`.
    async fn update_product(&self, product: &Product) -> StoreResult<Product>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> StoreResult<Uuid>;
    async fn create_order_item(&self, item: NewOrderItem) -> StoreResult<()>;

    /// Reserves stock for every line, then writes the order and its items, as
    /// one unit: either everything is persisted or nothing is.
    ///
    /// Stock is decremented only where the current quantity covers every line
    /// for that product, otherwise the unit fails with
    /// [`StoreError::InsufficientStock`]. Products are reserved in the order of
    /// [`stock_reservations`](crate::domain::aggregates::stock_reservations).
    async fn place_order(&self, order: NewOrder, lines: Vec<OrderLine>) -> StoreResult<Uuid>;
}
