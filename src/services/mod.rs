//! Application services
pub mod auth;
pub mod cart;

pub use auth::AuthService;
pub use cart::CartService;
