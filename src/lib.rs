//! OpenSASE Shop - Storefront API
//!
//! Accounts, product catalog and cart checkout over PostgreSQL.
//!
//! ## Features
//! - Customer registration and login with bearer sessions
//! - Product catalog management
//! - Checkout with atomic stock reservation
//! - Orders with point-in-time line item prices

pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

pub use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(Uuid),

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} not found in store")]
    ProductNotFound(Uuid),

    #[error("product {0} out of stock")]
    OutOfStock(Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("user with email {0} already exists")]
    EmailTaken(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("permission denied")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for EcommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::InsufficientStock(product_id) => Self::OutOfStock(product_id),
            other => Self::Storage(other),
        }
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(format!("invalid payload: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
